//! Typed field values
//!
//! Stored values are string-serialized in a single TEXT column regardless of
//! logical type; `FieldValue` is the tagged in-memory form. Decoding always
//! goes through the owning field's declared type, so a value never has to be
//! re-interpreted by convention at the call site.

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::models::FieldType;
use crate::{Error, Result};

/// A decoded field value, tagged by logical type
///
/// Serializes untagged: text/choice kinds as JSON strings, numbers as JSON
/// numbers, booleans as JSON booleans, multi-choice as a JSON string array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// short_text, long_text, email, url, phone
    Text(String),
    Number(f64),
    Boolean(bool),
    /// Serializes as "YYYY-MM-DD"
    Date(NaiveDate),
    /// single_choice option token
    Choice(String),
    /// multi_choice option tokens
    Choices(Vec<String>),
}

impl FieldValue {
    /// Decode a stored string according to the field's declared type
    ///
    /// `field_name` is only used to label decode failures (a stored value
    /// that no longer parses indicates an edit to the field's type without
    /// a value migration).
    pub fn decode(field_name: &str, field_type: FieldType, raw: &str) -> Result<FieldValue> {
        match field_type {
            FieldType::ShortText
            | FieldType::LongText
            | FieldType::Email
            | FieldType::Url
            | FieldType::Phone => Ok(FieldValue::Text(raw.to_string())),
            FieldType::Number => raw
                .parse::<f64>()
                .map(FieldValue::Number)
                .map_err(|_| decode_error(field_name, raw, "number")),
            FieldType::Boolean => match raw {
                "true" => Ok(FieldValue::Boolean(true)),
                "false" => Ok(FieldValue::Boolean(false)),
                _ => Err(decode_error(field_name, raw, "boolean")),
            },
            FieldType::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(FieldValue::Date)
                .map_err(|_| decode_error(field_name, raw, "date")),
            FieldType::SingleChoice => Ok(FieldValue::Choice(raw.to_string())),
            FieldType::MultiChoice => serde_json::from_str::<Vec<String>>(raw)
                .map(FieldValue::Choices)
                .map_err(|_| decode_error(field_name, raw, "multi_choice token array")),
        }
    }

    /// Canonical storage string for this value
    pub fn encode(&self) -> String {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => s.clone(),
            FieldValue::Number(n) => {
                // Integral numbers store without a trailing ".0"
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FieldValue::Choices(tokens) => {
                serde_json::to_string(tokens).unwrap_or_else(|_| "[]".to_string())
            }
        }
    }

    /// Build a typed value from a submitted JSON value
    ///
    /// Form submissions arrive as JSON; strings are accepted for every type
    /// (HTML forms post strings), native JSON numbers/booleans/arrays are
    /// accepted where they match the declared type.
    pub fn from_submission(
        field_name: &str,
        field_type: FieldType,
        submitted: &serde_json::Value,
    ) -> Result<FieldValue> {
        use serde_json::Value;

        match field_type {
            FieldType::ShortText
            | FieldType::LongText
            | FieldType::Email
            | FieldType::Url
            | FieldType::Phone => match submitted {
                Value::String(s) => Ok(FieldValue::Text(s.clone())),
                _ => Err(submit_error(field_name, "expected a string")),
            },
            FieldType::Number => match submitted {
                Value::Number(n) => n
                    .as_f64()
                    .map(FieldValue::Number)
                    .ok_or_else(|| submit_error(field_name, "number out of range")),
                Value::String(s) => s
                    .parse::<f64>()
                    .map(FieldValue::Number)
                    .map_err(|_| submit_error(field_name, "expected a number")),
                _ => Err(submit_error(field_name, "expected a number")),
            },
            FieldType::Boolean => match submitted {
                Value::Bool(b) => Ok(FieldValue::Boolean(*b)),
                Value::String(s) if s == "true" => Ok(FieldValue::Boolean(true)),
                Value::String(s) if s == "false" => Ok(FieldValue::Boolean(false)),
                _ => Err(submit_error(field_name, "expected true or false")),
            },
            FieldType::Date => match submitted {
                Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(FieldValue::Date)
                    .map_err(|_| submit_error(field_name, "expected a YYYY-MM-DD date")),
                _ => Err(submit_error(field_name, "expected a YYYY-MM-DD date")),
            },
            FieldType::SingleChoice => match submitted {
                Value::String(s) => Ok(FieldValue::Choice(s.clone())),
                _ => Err(submit_error(field_name, "expected an option token")),
            },
            FieldType::MultiChoice => match submitted {
                Value::Array(items) => {
                    let mut tokens = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::String(s) => tokens.push(s.clone()),
                            _ => {
                                return Err(submit_error(
                                    field_name,
                                    "expected an array of option tokens",
                                ))
                            }
                        }
                    }
                    Ok(FieldValue::Choices(tokens))
                }
                // A single token is accepted as a one-element selection
                Value::String(s) => Ok(FieldValue::Choices(vec![s.clone()])),
                _ => Err(submit_error(field_name, "expected an array of option tokens")),
            },
        }
    }

    /// Whether this value counts as empty for required-field checks
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => s.trim().is_empty(),
            FieldValue::Choices(tokens) => tokens.is_empty(),
            FieldValue::Number(_) | FieldValue::Boolean(_) | FieldValue::Date(_) => false,
        }
    }

    /// Raw string the text-level validation rules apply to
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

fn decode_error(field_name: &str, raw: &str, expected: &str) -> Error {
    Error::Internal(format!(
        "Stored value for field '{}' is not a valid {}: {:?}",
        field_name, expected, raw
    ))
}

fn submit_error(field_name: &str, message: &str) -> Error {
    Error::validation(field_name, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_kinds() {
        let v = FieldValue::decode("bio", FieldType::LongText, "hello").unwrap();
        assert_eq!(v, FieldValue::Text("hello".into()));
        let v = FieldValue::decode("site", FieldType::Url, "https://example.com").unwrap();
        assert_eq!(v, FieldValue::Text("https://example.com".into()));
    }

    #[test]
    fn test_decode_boolean_strict() {
        assert_eq!(
            FieldValue::decode("union", FieldType::Boolean, "true").unwrap(),
            FieldValue::Boolean(true)
        );
        assert_eq!(
            FieldValue::decode("union", FieldType::Boolean, "false").unwrap(),
            FieldValue::Boolean(false)
        );
        assert!(FieldValue::decode("union", FieldType::Boolean, "1").is_err());
    }

    #[test]
    fn test_decode_number_and_date() {
        assert_eq!(
            FieldValue::decode("height", FieldType::Number, "182.5").unwrap(),
            FieldValue::Number(182.5)
        );
        assert!(FieldValue::decode("height", FieldType::Number, "tall").is_err());

        let d = FieldValue::decode("born", FieldType::Date, "1990-03-14").unwrap();
        assert_eq!(d.encode(), "1990-03-14");
        assert!(FieldValue::decode("born", FieldType::Date, "14/03/1990").is_err());
    }

    #[test]
    fn test_decode_multi_choice_array() {
        let v = FieldValue::decode("skills", FieldType::MultiChoice, r#"["stunts","voice"]"#)
            .unwrap();
        assert_eq!(
            v,
            FieldValue::Choices(vec!["stunts".into(), "voice".into()])
        );
        assert!(FieldValue::decode("skills", FieldType::MultiChoice, "stunts").is_err());
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let cases = [
            (FieldType::ShortText, FieldValue::Text("Jo".into())),
            (FieldType::Number, FieldValue::Number(55.0)),
            (FieldType::Number, FieldValue::Number(1.75)),
            (FieldType::Boolean, FieldValue::Boolean(true)),
            (
                FieldType::Date,
                FieldValue::Date(NaiveDate::from_ymd_opt(2001, 12, 31).unwrap()),
            ),
            (FieldType::SingleChoice, FieldValue::Choice("red".into())),
            (
                FieldType::MultiChoice,
                FieldValue::Choices(vec!["a".into(), "b".into()]),
            ),
        ];
        for (ty, value) in cases {
            let raw = value.encode();
            let back = FieldValue::decode("f", ty, &raw).unwrap();
            assert_eq!(back, value, "round-trip failed for {:?}", ty);
        }
    }

    #[test]
    fn test_integral_number_encodes_without_fraction() {
        assert_eq!(FieldValue::Number(55.0).encode(), "55");
        assert_eq!(FieldValue::Number(55.5).encode(), "55.5");
    }

    #[test]
    fn test_submission_accepts_form_strings() {
        use serde_json::json;
        assert_eq!(
            FieldValue::from_submission("height", FieldType::Number, &json!("182")).unwrap(),
            FieldValue::Number(182.0)
        );
        assert_eq!(
            FieldValue::from_submission("union", FieldType::Boolean, &json!("true")).unwrap(),
            FieldValue::Boolean(true)
        );
        assert_eq!(
            FieldValue::from_submission("skills", FieldType::MultiChoice, &json!("voice"))
                .unwrap(),
            FieldValue::Choices(vec!["voice".into()])
        );
    }

    #[test]
    fn test_submission_type_mismatch_names_field() {
        use serde_json::json;
        let err = FieldValue::from_submission("height", FieldType::Number, &json!(true))
            .unwrap_err();
        match err {
            Error::Validation { field, .. } => assert_eq!(field, "height"),
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_emptiness() {
        assert!(FieldValue::Text("  ".into()).is_empty());
        assert!(FieldValue::Choices(vec![]).is_empty());
        assert!(!FieldValue::Boolean(false).is_empty());
        assert!(!FieldValue::Number(0.0).is_empty());
    }
}
