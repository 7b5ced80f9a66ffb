//! Cleanup of question-bank HTML that embeds MathML.

use std::sync::LazyLock;

use regex::Regex;

use super::collapse_whitespace;

const PARAGRAPH_OPEN: &str = r#"<p style="text-align: left;">"#;
const PARAGRAPH_CLOSE: &str = "</p>";

// Non-greedy and dot-matches-newline: one block may span many lines, and
// two blocks on the same line stay separate.
static MATH_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<math[^>]*>.*?</math>").unwrap());
static CONTROL_WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\n\t]").unwrap());
static BETWEEN_TAGS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());

/// Strip the paragraph wrapper, compact `<math>` blocks, decode the two
/// entities that show up outside them, and collapse whitespace.
pub fn clean_markup(text: &str) -> String {
    let text = text.replace(PARAGRAPH_OPEN, "").replace(PARAGRAPH_CLOSE, "");

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for block in MATH_BLOCK_RE.find_iter(&text) {
        out.push_str(&decode_entities(&text[last..block.start()]));
        out.push_str(&compact_math(block.as_str()));
        last = block.end();
    }
    out.push_str(&decode_entities(&text[last..]));

    collapse_whitespace(&out)
}

fn compact_math(block: &str) -> String {
    let block = CONTROL_WS_RE.replace_all(block, "");
    BETWEEN_TAGS_RE.replace_all(&block, "><").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&rsquo;", "'").replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MATH: &str = "<math xmlns=\"http://www.w3.org/1998/Math/MathML\">\n\t<mrow>\n\t\t<mn>3</mn>\n\t\t<mi>x</mi>\n\t</mrow>\n</math>";

    #[test]
    fn strips_paragraph_wrapper() {
        assert_eq!(
            clean_markup(r#"<p style="text-align: left;">What is x?</p>"#),
            "What is x?"
        );
    }

    #[test]
    fn compacts_math_blocks() {
        let input = format!("If {} = 12, what is x?", MATH);
        assert_eq!(
            clean_markup(&input),
            "If <math xmlns=\"http://www.w3.org/1998/Math/MathML\"><mrow><mn>3</mn><mi>x</mi></mrow></math> = 12, what is x?"
        );
    }

    #[test]
    fn two_blocks_stay_separate() {
        let input = "<math><mi>a</mi></math> and\n<math>\n<mi>b</mi>\n</math>";
        assert_eq!(
            clean_markup(input),
            "<math><mi>a</mi></math> and <math><mi>b</mi></math>"
        );
    }

    #[test]
    fn decodes_entities_outside_math() {
        assert_eq!(
            clean_markup("the author&rsquo;s&nbsp;claim"),
            "the author's claim"
        );
    }

    #[test]
    fn leaves_entities_inside_math() {
        let input = "<math><mtext>&nbsp;</mtext></math>";
        assert_eq!(clean_markup(input), input);
    }

    #[test]
    fn keeps_every_non_whitespace_char_in_math() {
        let cleaned = clean_markup(MATH);
        let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        assert_eq!(strip(&cleaned), strip(MATH));
    }

    #[test]
    fn clean_markup_is_idempotent() {
        let samples = [
            String::new(),
            format!(r#"<p style="text-align: left;">Solve {}</p>"#, MATH),
            "It&rsquo;s   <math>\n<mn>1</mn> </math>\n\ndone".to_string(),
        ];
        for s in &samples {
            let once = clean_markup(s);
            assert_eq!(clean_markup(&once), once);
        }
    }
}
