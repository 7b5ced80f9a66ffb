//! OpenSAT questions → the app's flat quiz shape
//! (`{id, text, options, correctOptionIndex}`).
//!
//! Choices keep their source order (`A`, `B`, ... as listed), and the
//! correct letter becomes an index into them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::lenient::{self, scalar_text};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub text: Option<String>,
    pub options: Vec<String>,
    /// `None` when the correct letter is missing or not among the choices.
    pub correct_option_index: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOpenSat {
    #[serde(deserialize_with = "lenient::opt_string")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_object")]
    question: Option<RawOpenSatBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOpenSatBody {
    #[serde(deserialize_with = "lenient::opt_string")]
    question: Option<String>,
    #[serde(deserialize_with = "lenient::opt_object")]
    choices: Option<Map<String, Value>>,
    #[serde(deserialize_with = "lenient::opt_string")]
    correct_answer: Option<String>,
}

/// Convert one OpenSAT question. Entries that are not objects or have no
/// id are dropped.
pub fn convert(value: Value) -> Option<QuizQuestion> {
    let raw: RawOpenSat = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "skipping malformed OpenSAT entry");
            return None;
        }
    };
    let Some(id) = raw.id.filter(|id| !id.trim().is_empty()) else {
        warn!("dropping OpenSAT entry without an id");
        return None;
    };

    let body = raw.question.unwrap_or_default();
    let choices = body.choices.unwrap_or_default();
    let options = choices
        .values()
        .map(|choice| scalar_text(choice).unwrap_or_else(|| choice.to_string()))
        .collect();

    let correct_option_index = body
        .correct_answer
        .as_deref()
        .and_then(|letter| choices.keys().position(|key| key == letter));
    if correct_option_index.is_none() {
        warn!(id = %id, answer = ?body.correct_answer, "correct answer is not one of the choices");
    }

    Some(QuizQuestion {
        id,
        text: body.question,
        options,
        correct_option_index,
    })
}

/// Convert a whole OpenSAT document: a list of questions, a single
/// question, or sections mapping to lists (`{"math": [...], ...}`).
pub fn convert_document(document: Value) -> Vec<QuizQuestion> {
    let entries: Vec<Value> = match document {
        Value::Array(items) => items,
        Value::Object(map) if map.contains_key("question") => vec![Value::Object(map)],
        Value::Object(sections) => sections
            .into_iter()
            .flat_map(|(section, entries)| match entries {
                Value::Array(items) => items,
                _ => {
                    warn!(section = %section, "OpenSAT section is not a list");
                    Vec::new()
                }
            })
            .collect(),
        _ => Vec::new(),
    };
    entries.into_iter().filter_map(convert).collect()
}
