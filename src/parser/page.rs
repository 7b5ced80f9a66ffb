//! Text-pattern extraction of one question from one page of PDF text.
//!
//! Every field has its own extractor returning `Option`, so a field that
//! fails to match never takes its siblings down with it. Only the id, the
//! `Answer` split and the stem are required; losing any of them drops the page.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::clean_text;
use crate::record::{PageQuestion, UNKNOWN_DIFFICULTY};

static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ID:\s*(\w+)").unwrap());
static STEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?sm)ID:[^\n]*\n(.*?)(?:^|\s)A\.").unwrap());
static OPTION_MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ['A', 'B', 'C', 'D']
        .iter()
        .map(|letter| Regex::new(&format!(r"(?m)(?:^|\s){}\.", letter)).unwrap())
        .collect()
});
static CORRECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Correct Answer:\s*([A-D])").unwrap());
static RATIONALE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Rationale\s*(.*?)(?:Question Difficulty|\z)").unwrap());
static DIFFICULTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Question Difficulty:\s*(\w+)").unwrap());

const ANSWER_TOKEN: &str = "Answer";

/// Why a page produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatch {
    /// Not a question page.
    MissingId,
    MissingAnswer,
    MissingStem,
}

impl fmt::Display for NoMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoMatch::MissingId => write!(f, "no `ID:` marker"),
            NoMatch::MissingAnswer => write!(f, "no `{}` section", ANSWER_TOKEN),
            NoMatch::MissingStem => write!(f, "no stem before the `A.` option"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageExtraction {
    Matched(PageQuestion),
    NoMatch(NoMatch),
}

impl PageExtraction {
    pub fn into_question(self) -> Option<PageQuestion> {
        match self {
            PageExtraction::Matched(q) => Some(q),
            PageExtraction::NoMatch(_) => None,
        }
    }
}

/// The question id on a page, if the page is a question page at all.
pub fn question_id(text: &str) -> Option<&str> {
    ID_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Extract one question record from the raw text of a page.
///
/// `images` are the file names already captured for this page; they are
/// attached to the record untouched.
pub fn extract_question(text: &str, images: Vec<String>) -> PageExtraction {
    let Some(id) = question_id(text) else {
        debug!(reason = %NoMatch::MissingId, "skipping page");
        return PageExtraction::NoMatch(NoMatch::MissingId);
    };

    let Some((question_part, answer_part)) = split_answer(text) else {
        warn!(id, reason = %NoMatch::MissingAnswer, "dropping question page");
        return PageExtraction::NoMatch(NoMatch::MissingAnswer);
    };

    let Some((stem, options_area)) = extract_stem(question_part) else {
        warn!(id, reason = %NoMatch::MissingStem, "dropping question page");
        return PageExtraction::NoMatch(NoMatch::MissingStem);
    };

    PageExtraction::Matched(PageQuestion {
        id: id.to_string(),
        text: Some(stem).filter(|s| !s.is_empty()),
        options: extract_options(options_area),
        images,
        correct_answer: extract_correct_answer(&answer_part),
        rationale: extract_rationale(&answer_part),
        difficulty: extract_difficulty(&answer_part)
            .unwrap_or_else(|| UNKNOWN_DIFFICULTY.to_string()),
    })
}

/// Split at the first `Answer`; the answer segment keeps the token.
fn split_answer(text: &str) -> Option<(&str, String)> {
    let (question, rest) = text.split_once(ANSWER_TOKEN)?;
    Some((question, format!("{}{}", ANSWER_TOKEN, rest)))
}

/// Cleaned stem plus the options area: from the `A.` marker up to the end of
/// the segment, or up to a repeated `ID:` header that precedes the answer.
fn extract_stem(question_part: &str) -> Option<(String, &str)> {
    let caps = STEM_RE.captures(question_part)?;
    let stem = caps.get(1)?;
    let rest = &question_part[stem.end()..];
    let area = rest.find("ID:").map_or(rest, |end| &rest[..end]);
    Some((clean_text(stem.as_str()), area))
}

/// Options `A.` through `D.`, searched in order. A marker only counts at a
/// line start or after whitespace, so `D.C.` inside an option is not one.
/// A missing marker is skipped; each span stops at the next marker found.
fn extract_options(area: &str) -> Vec<String> {
    // (start of the letter, end of the marker)
    let mut markers: Vec<(usize, usize)> = Vec::with_capacity(OPTION_MARKERS.len());
    let mut cursor = 0;
    for re in OPTION_MARKERS.iter() {
        if let Some(m) = re.find_at(area, cursor) {
            cursor = m.end();
            markers.push((m.end() - 2, m.end()));
        }
    }

    markers
        .iter()
        .enumerate()
        .filter_map(|(i, &(_, text_start))| {
            let end = markers.get(i + 1).map_or(area.len(), |&(next, _)| next);
            let option = clean_text(&area[text_start..end]);
            (!option.is_empty()).then_some(option)
        })
        .collect()
}

fn extract_correct_answer(answer_part: &str) -> Option<String> {
    CORRECT_RE
        .captures(answer_part)
        .map(|c| c[1].to_string())
}

fn extract_rationale(answer_part: &str) -> Option<String> {
    RATIONALE_RE
        .captures(answer_part)
        .map(|c| clean_text(&c[1]))
        .filter(|r| !r.is_empty())
}

fn extract_difficulty(answer_part: &str) -> Option<String> {
    DIFFICULTY_RE
        .captures(answer_part)
        .map(|c| c[1].to_string())
}

// ── Tests ──
