//! Canonical question records produced by both pipelines.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Difficulty label used by the page extractor when the page carries none.
pub const UNKNOWN_DIFFICULTY: &str = "Unknown";

/// A question parsed from one PDF page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageQuestion {
    pub id: String,
    pub text: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub correct_answer: Option<String>,
    pub rationale: Option<String>,
    pub difficulty: String,
}

/// A question normalized from a structured question-bank entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub skill: Option<String>,
    /// Passed through verbatim, with no `"Unknown"` fallback.
    pub difficulty: Option<String>,
    pub question: QuestionBody,
    pub explanation: Explanation,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Stem and answers. `text` is the display form, `original_math` keeps the
/// cleaned markup as-is for renderers that want it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionBody {
    pub text: Option<String>,
    pub original_math: Option<String>,
    /// Answer choices exactly as the source bank ships them: bare strings
    /// or `{id, content, ...}` objects.
    #[serde(default)]
    pub options: Vec<Value>,
    #[serde(default)]
    pub correct_answers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub text: Option<String>,
    pub original_math: Option<String>,
}
