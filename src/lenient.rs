//! Field deserializers that never fail on an unexpected JSON type.
//!
//! Source exports are loosely typed: a difficulty may be `2` or `"2"`, a
//! list may be `null`. A field of the wrong shape becomes `None`/empty
//! instead of rejecting the whole entry.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Scalar as text: strings as-is, numbers and booleans stringified,
/// anything else `None`.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(&Value::deserialize(deserializer)?))
}

/// Array elements verbatim; a non-array is empty.
pub fn values<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

/// A single scalar or a list of scalars, always as a list of strings.
pub fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(&other).into_iter().collect(),
    })
}

/// A nested object; anything that is not one becomes `None`.
pub fn opt_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Row {
        #[serde(deserialize_with = "opt_string")]
        name: Option<String>,
        #[serde(deserialize_with = "values")]
        items: Vec<Value>,
        #[serde(deserialize_with = "one_or_many")]
        answers: Vec<String>,
    }

    fn row(value: Value) -> Row {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn scalars_are_stringified() {
        assert_eq!(row(json!({"name": 2})).name.as_deref(), Some("2"));
        assert_eq!(row(json!({"name": true})).name.as_deref(), Some("true"));
        assert_eq!(row(json!({"name": "x"})).name.as_deref(), Some("x"));
    }

    #[test]
    fn wrong_shapes_become_empty() {
        let r = row(json!({"name": {"a": 1}, "items": "nope", "answers": {"a": 1}}));
        assert_eq!(r.name, None);
        assert!(r.items.is_empty());
        assert!(r.answers.is_empty());

        let r = row(json!({"name": null, "items": null, "answers": null}));
        assert_eq!(r.name, None);
        assert!(r.items.is_empty());
        assert!(r.answers.is_empty());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let r = row(json!({}));
        assert_eq!(r.name, None);
        assert!(r.items.is_empty());
    }

    #[test]
    fn answers_accept_one_or_many() {
        assert_eq!(row(json!({"answers": "B"})).answers, vec!["B"]);
        assert_eq!(row(json!({"answers": ["3", 3.5, null]})).answers, vec!["3", "3.5"]);
    }

    #[test]
    fn items_pass_through_untouched() {
        let r = row(json!({"items": [{"id": 1, "content": "4", "extra": [1]}, "5"]}));
        assert_eq!(r.items, vec![json!({"id": 1, "content": "4", "extra": [1]}), json!("5")]);
    }
}
