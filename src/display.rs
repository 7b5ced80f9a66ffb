//! Plain-text rendering of one processed question, for eyeballing output.

use std::path::Path;

use serde_json::Value;

use crate::lenient::scalar_text;
use crate::output::SubjectFile;
use crate::record::BankQuestion;

pub fn find_question<'a>(file: &'a SubjectFile, id: &str) -> Option<&'a BankQuestion> {
    file.topics.values().flatten().find(|q| q.id == id)
}

/// Display text of an answer choice: a bare string, the `content` of an
/// option object, or the raw JSON when neither applies.
fn option_text(option: &Value) -> String {
    match option {
        Value::Object(fields) => fields
            .get("content")
            .and_then(scalar_text)
            .unwrap_or_else(|| option.to_string()),
        other => scalar_text(other).unwrap_or_else(|| other.to_string()),
    }
}

/// Render `question`; each image is marked with whether it exists under
/// `image_dir`.
pub fn render_question(question: &BankQuestion, image_dir: &Path) -> String {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    let mut lines = vec![
        format!("Question {}", question.id),
        "-".repeat(40),
        format!("Subject:    {}", field(&question.subject)),
        format!("Topic:      {}", field(&question.topic)),
        format!("Skill:      {}", field(&question.skill)),
        format!("Difficulty: {}", field(&question.difficulty)),
        String::new(),
        field(&question.question.text),
    ];

    if !question.question.options.is_empty() {
        lines.push(String::new());
        lines.extend(
            ('A'..='Z')
                .zip(&question.question.options)
                .map(|(letter, option)| format!("  {}. {}", letter, option_text(option))),
        );
    }
    if !question.question.correct_answers.is_empty() {
        lines.push(String::new());
        lines.push(format!("Correct: {}", question.question.correct_answers.join(", ")));
    }

    if !question.images.is_empty() {
        lines.push(String::new());
        lines.push("Images:".to_string());
        for image in &question.images {
            let status = if image_dir.join(image).is_file() { "ok" } else { "missing" };
            lines.push(format!("  [{}] {}", status, image));
        }
    }

    if let Some(explanation) = &question.explanation.text {
        lines.push(String::new());
        lines.push("Explanation:".to_string());
        lines.push(explanation.clone());
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::TopicBuckets;
    use crate::record::{Explanation, QuestionBody};
    use serde_json::json;
    use std::fs;

    fn question() -> BankQuestion {
        BankQuestion {
            id: "7d5ae8e6".into(),
            kind: Some("mcq".into()),
            subject: Some("Math".into()),
            topic: Some("Algebra".into()),
            skill: None,
            difficulty: Some("E".into()),
            question: QuestionBody {
                text: Some("If 2x = 8, what is x?".into()),
                original_math: None,
                options: vec![json!("2"), json!({"id": 7, "content": "4"}), json!({"id": "c"}), json!(8)],
                correct_answers: vec!["B".into()],
            },
            explanation: Explanation {
                text: Some("Divide by 2.".into()),
                original_math: None,
            },
            images: vec!["7d5ae8e6_img_1.png".into(), "7d5ae8e6_full_page.png".into()],
        }
    }

    #[test]
    fn renders_fields_and_image_status() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("7d5ae8e6_img_1.png"), b"png").unwrap();

        let text = render_question(&question(), dir.path());
        assert!(text.starts_with("Question 7d5ae8e6\n"));
        assert!(text.contains("Skill:      -\n"));
        assert!(text.contains("\nIf 2x = 8, what is x?\n"));
        assert!(text.contains("  A. 2\n  B. 4\n  C. {\"id\":\"c\"}\n  D. 8\n"));
        assert!(text.contains("Correct: B\n"));
        assert!(text.contains("  [ok] 7d5ae8e6_img_1.png\n"));
        assert!(text.contains("  [missing] 7d5ae8e6_full_page.png\n"));
        assert!(text.ends_with("Explanation:\nDivide by 2.\n"));
    }

    #[test]
    fn empty_sections_are_left_out() {
        let mut q = question();
        q.question.options.clear();
        q.images.clear();
        q.explanation.text = None;
        let text = render_question(&q, Path::new("tests/fixtures"));
        assert!(!text.contains("Images:"));
        assert!(!text.contains("Explanation:"));
        assert!(text.ends_with("Correct: B\n"));
    }

    #[test]
    fn finds_question_across_topics() {
        let mut topics = TopicBuckets::new();
        topics.insert("Geometry".into(), vec![]);
        topics.insert("Algebra".into(), vec![question()]);
        let file = SubjectFile {
            subject: "Math".into(),
            topics,
        };
        assert!(find_question(&file, "7d5ae8e6").is_some());
        assert!(find_question(&file, "missing").is_none());
    }
}
