//! Normalization of structured question-bank entries.
//!
//! Input is the bank's `{opaque_id: {questionId, module, content: {...}}}`
//! mapping. Missing fields become `None`/empty instead of rejecting the entry.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::markup::clean_markup;
use crate::images;
use crate::lenient;
use crate::record::{BankQuestion, Explanation, QuestionBody};

/// Every field is read leniently: a value of the wrong JSON type is
/// treated as absent rather than failing the entry.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawBankQuestion {
    #[serde(rename = "questionId", deserialize_with = "lenient::opt_string")]
    pub question_id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub module: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub primary_class_cd_desc: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub skill_desc: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub difficulty: Option<String>,
    #[serde(deserialize_with = "lenient::opt_object")]
    pub content: Option<RawContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawContent {
    #[serde(rename = "type", deserialize_with = "lenient::opt_string")]
    pub kind: Option<String>,
    /// Passed through verbatim: plain strings or `{id, content, ...}` objects.
    #[serde(rename = "answerOptions", deserialize_with = "lenient::values")]
    pub answer_options: Vec<Value>,
    /// A list for free-response items, a bare string in older exports.
    #[serde(deserialize_with = "lenient::one_or_many")]
    pub correct_answer: Vec<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub stem: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub rationale: Option<String>,
}

/// Parse a bank file into its entries, keeping file order.
pub fn parse_bank(json: &str) -> serde_json::Result<Map<String, Value>> {
    serde_json::from_str(json)
}

/// Turn one entry into a record. `key` is the entry's key in the bank
/// mapping and stands in for a missing `questionId`. Returns `None` only
/// when no id can be found at all.
pub fn normalize(key: &str, raw: RawBankQuestion, image_dir: &Path) -> Option<BankQuestion> {
    let id = raw
        .question_id
        .filter(|id| !id.trim().is_empty())
        .or_else(|| Some(key.to_string()).filter(|k| !k.trim().is_empty()));
    let Some(id) = id else {
        warn!("dropping bank entry without an id");
        return None;
    };

    if raw.difficulty.is_none() {
        // The page pipeline defaults to "Unknown" here; this one leaves it null.
        warn!(id = %id, "bank entry has no difficulty, leaving it null");
    }

    let content = raw.content.unwrap_or_default();
    let stem = content.stem.as_deref().map(clean_markup);
    let rationale = content.rationale.as_deref().map(clean_markup);
    let images = images::find_images(&id, image_dir);
    debug!(id = %id, images = images.len(), "normalized bank entry");

    Some(BankQuestion {
        kind: content.kind,
        subject: raw.module.as_deref().map(capitalize).filter(|s| !s.is_empty()),
        topic: raw.primary_class_cd_desc,
        skill: raw.skill_desc,
        difficulty: raw.difficulty,
        question: QuestionBody {
            text: stem.clone(),
            original_math: stem,
            options: content.answer_options,
            correct_answers: content.correct_answer,
        },
        explanation: Explanation {
            text: rationale.clone(),
            original_math: rationale,
        },
        images,
        id,
    })
}

/// Normalize a single JSON value; an entry that does not have the expected
/// shape is logged and skipped.
pub fn normalize_entry(key: &str, value: Value, image_dir: &Path) -> Option<BankQuestion> {
    match serde_json::from_value::<RawBankQuestion>(value) {
        Ok(raw) => normalize(key, raw, image_dir),
        Err(e) => {
            warn!(key, error = %e, "skipping malformed bank entry");
            None
        }
    }
}

/// First character upper-cased, the rest lower-cased (`"math"` → `"Math"`).
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
