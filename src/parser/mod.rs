pub mod bank;
pub mod markup;
pub mod opensat;
pub mod page;

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Normalize PDF text: fold the `ffi` ligature and non-breaking spaces,
/// then collapse whitespace.
pub fn clean_text(text: &str) -> String {
    let folded = text.replace('\u{FB03}', "ffi").replace('\u{00A0}', " ");
    collapse_whitespace(&folded)
}
