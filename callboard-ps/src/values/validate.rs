//! Per-field validation of submitted values
//!
//! A submission is checked against its field definition in order: emptiness
//! vs. the required flag, typed parsing, option membership for enumerated
//! kinds, built-in format checks (email/url/phone), then the field's own
//! validation-rule blob (length/bounds/pattern).

use callboard_common::db::models::{Field, FieldOption, FieldType, ValidationRules};
use callboard_common::{Error, FieldValue, Result};

/// Outcome of validating one submitted value
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Store this value (insert or update)
    Set(FieldValue),
    /// Remove any stored value for the field
    Clear,
}

/// Validate one submitted value against its field definition
///
/// `options` must be the field's option set when the field is enumerated;
/// it is ignored otherwise.
pub fn validate_submission(
    field: &Field,
    options: &[FieldOption],
    submitted: &serde_json::Value,
) -> Result<WriteOp> {
    // Explicit null clears, subject to the required flag
    if submitted.is_null() {
        return if field.required {
            Err(required_error(field))
        } else {
            Ok(WriteOp::Clear)
        };
    }

    let value = FieldValue::from_submission(&field.name, field.field_type, submitted)?;

    if value.is_empty() {
        return if field.required {
            Err(required_error(field))
        } else {
            Ok(WriteOp::Clear)
        };
    }

    if field.field_type.is_choice() {
        check_option_membership(field, options, &value)?;
    }

    check_builtin_format(field, &value)?;
    check_rules(field, &field.rules()?, &value)?;

    Ok(WriteOp::Set(value))
}

fn required_error(field: &Field) -> Error {
    Error::validation(
        &field.name,
        format!("Field '{}' is required", field.name),
    )
}

/// Enumerated kinds only accept tokens from the field's option set
fn check_option_membership(
    field: &Field,
    options: &[FieldOption],
    value: &FieldValue,
) -> Result<()> {
    let is_known = |token: &str| options.iter().any(|o| o.value == token);

    match value {
        FieldValue::Choice(token) => {
            if !is_known(token) {
                return Err(Error::validation(
                    &field.name,
                    format!("'{}' is not an option of field '{}'", token, field.name),
                ));
            }
        }
        FieldValue::Choices(tokens) => {
            for token in tokens {
                if !is_known(token) {
                    return Err(Error::validation(
                        &field.name,
                        format!("'{}' is not an option of field '{}'", token, field.name),
                    ));
                }
            }
        }
        _ => {}
    }

    Ok(())
}

/// Format checks implied by the field type itself
fn check_builtin_format(field: &Field, value: &FieldValue) -> Result<()> {
    let Some(text) = value.as_text() else {
        return Ok(());
    };

    match field.field_type {
        FieldType::Email => {
            let valid = text.split_once('@').is_some_and(|(local, domain)| {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            });
            if !valid {
                return Err(Error::validation(
                    &field.name,
                    format!("'{}' is not a valid email address", text),
                ));
            }
        }
        FieldType::Url => {
            if !text.starts_with("http://") && !text.starts_with("https://") {
                return Err(Error::validation(
                    &field.name,
                    "URL must start with http:// or https://",
                ));
            }
        }
        FieldType::Phone => {
            let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
            let charset_ok = text
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '.'));
            if digits < 7 || !charset_ok {
                return Err(Error::validation(
                    &field.name,
                    format!("'{}' is not a valid phone number", text),
                ));
            }
        }
        _ => {}
    }

    Ok(())
}

/// Apply the field's validation-rule blob
fn check_rules(field: &Field, rules: &ValidationRules, value: &FieldValue) -> Result<()> {
    if let Some(text) = value.as_text() {
        if let Some(min) = rules.min_length {
            if text.chars().count() < min {
                return Err(Error::validation(
                    &field.name,
                    format!("Must be at least {} characters", min),
                ));
            }
        }
        if let Some(max) = rules.max_length {
            if text.chars().count() > max {
                return Err(Error::validation(
                    &field.name,
                    format!("Must be at most {} characters", max),
                ));
            }
        }
        if let Some(pattern) = &rules.pattern {
            let re = regex::Regex::new(pattern).map_err(|e| {
                Error::Internal(format!(
                    "Field '{}' has an invalid validation pattern: {}",
                    field.name, e
                ))
            })?;
            if !re.is_match(text) {
                return Err(Error::validation(
                    &field.name,
                    format!("Does not match the required pattern for '{}'", field.name),
                ));
            }
        }
    }

    if let FieldValue::Number(n) = value {
        if let Some(min) = rules.min {
            if *n < min {
                return Err(Error::validation(
                    &field.name,
                    format!("Must be at least {}", min),
                ));
            }
        }
        if let Some(max) = rules.max {
            if *n > max {
                return Err(Error::validation(
                    &field.name,
                    format!("Must be at most {}", max),
                ));
            }
        }
    }

    Ok(())
}
