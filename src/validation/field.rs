//! Single-field validation
//!
//! Given one field definition and one candidate value, decide accept or
//! reject and produce a localized message. Stateless and deterministic:
//! the same `(field, value, language)` triple always yields the same
//! outcome, which is what makes the engine testable without a database.

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;

use super::messages;
use crate::schema::{FieldDefinition, FieldType, Language};

/// Outcome of validating one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    Ok,
    Invalid(String),
}

impl FieldOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, FieldOutcome::Ok)
    }
}

/// A value counts as absent when it is missing from the payload, JSON null,
/// or the empty string.
fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Validate one candidate value against one field definition.
///
/// Rules run in strict order; the first failure wins and no further checks
/// run. File fields never reach this path (the file-confirmation flow
/// validates them) but the match arm stays so the type set is
/// exhaustively handled.
pub fn validate_field(
    field: &FieldDefinition,
    value: Option<&Value>,
    language: Language,
) -> FieldOutcome {
    // Rule 1: required check.
    if field.required && is_absent(value) {
        let label = field.label.in_language(language);
        return FieldOutcome::Invalid(messages::required(label, language));
    }

    // Rule 2: empty optional short-circuits every other rule.
    if !field.required && is_absent(value) {
        return FieldOutcome::Ok;
    }

    // A required field past rule 1 is guaranteed present.
    let value = match value {
        Some(v) => v,
        None => return FieldOutcome::Ok,
    };

    // Rule 3: type-specific rules.
    match field.field_type {
        FieldType::Text | FieldType::Textarea => validate_text(field, value, language),
        FieldType::Date => validate_date(value, language),
        FieldType::Choice => validate_choice(field, value, language),
        // Validated by the confirmation path, skipped by the payload
        // validator.
        FieldType::File => FieldOutcome::Ok,
    }
}

fn validate_text(field: &FieldDefinition, value: &Value, language: Language) -> FieldOutcome {
    let text = match value.as_str() {
        Some(t) => t,
        None => return FieldOutcome::Invalid(messages::invalid_text(language)),
    };

    let Some(rules) = &field.validation else {
        return FieldOutcome::Ok;
    };

    if let Some(pattern) = &rules.regex {
        // Schema validation compiles this up front; a failure here means a
        // definition that bypassed it, which we still refuse to accept.
        let matched = Regex::new(pattern)
            .map(|re| re.is_match(text))
            .unwrap_or(false);
        if !matched {
            let message = rules
                .error
                .as_ref()
                .map(|e| e.in_language(language).to_string())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| messages::invalid_format(language));
            return FieldOutcome::Invalid(message);
        }
    }

    // Length bounds are inclusive and counted in characters, not bytes;
    // Arabic text is multi-byte throughout.
    let length = text.chars().count();
    if let Some(min) = rules.min {
        if length < min as usize {
            return FieldOutcome::Invalid(messages::min_length(min, language));
        }
    }
    if let Some(max) = rules.max {
        if length > max as usize {
            return FieldOutcome::Invalid(messages::max_length(max, language));
        }
    }

    FieldOutcome::Ok
}

/// Dates are opaque calendar-date strings; the only check is parseability.
/// `%Y-%m-%d` and RFC 3339 are both accepted. No timezone normalization.
fn validate_date(value: &Value, language: Language) -> FieldOutcome {
    let parseable = value.as_str().is_some_and(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(s).is_ok()
    });
    if parseable {
        FieldOutcome::Ok
    } else {
        FieldOutcome::Invalid(messages::invalid_date(language))
    }
}

fn validate_choice(field: &FieldDefinition, value: &Value, language: Language) -> FieldOutcome {
    if field.options.is_empty() {
        // Schema validation rejects optionless choice fields; an empty list
        // here accepts anything, matching the permissive original.
        return FieldOutcome::Ok;
    }
    if field.options.iter().any(|opt| values_equal(&opt.value, value)) {
        FieldOutcome::Ok
    } else {
        FieldOutcome::Invalid(messages::invalid_choice(language))
    }
}

/// Equality policy for choice values: numbers compare numerically
/// (`3 == 3.0`), strings and booleans compare exactly, and there is no
/// cross-type coercion: the string `"3"` never matches the number `3`.
fn values_equal(option: &Value, submitted: &Value) -> bool {
    match (option, submitted) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        _ => option == submitted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BilingualText, ChoiceOption, FieldValidation};
    use serde_json::json;

    fn text_field(required: bool) -> FieldDefinition {
        FieldDefinition {
            key: "name".into(),
            field_type: FieldType::Text,
            required,
            label: BilingualText::new("الاسم", "Name"),
            placeholder: None,
            help: None,
            validation: None,
            file: None,
            options: vec![],
        }
    }

    fn choice_field() -> FieldDefinition {
        FieldDefinition {
            key: "gender".into(),
            field_type: FieldType::Choice,
            required: true,
            label: BilingualText::new("الجنس", "Gender"),
            placeholder: None,
            help: None,
            validation: None,
            file: None,
            options: vec![
                ChoiceOption {
                    value: json!("m"),
                    label: BilingualText::new("ذكر", "Male"),
                },
                ChoiceOption {
                    value: json!("f"),
                    label: BilingualText::new("أنثى", "Female"),
                },
            ],
        }
    }

    #[test]
    fn required_missing_fails_with_arabic_label() {
        let outcome = validate_field(&text_field(true), None, Language::Ar);
        assert_eq!(outcome, FieldOutcome::Invalid("الاسم مطلوب".into()));
    }

    #[test]
    fn required_empty_string_fails() {
        let outcome = validate_field(&text_field(true), Some(&json!("")), Language::Ar);
        assert!(!outcome.is_ok());
    }

    #[test]
    fn required_null_fails() {
        let outcome = validate_field(&text_field(true), Some(&Value::Null), Language::En);
        assert_eq!(outcome, FieldOutcome::Invalid("Name is required".into()));
    }

    #[test]
    fn required_label_falls_back_to_arabic_when_english_blank() {
        let mut field = text_field(true);
        field.label = BilingualText::new("الاسم", "");
        let outcome = validate_field(&field, None, Language::En);
        assert_eq!(outcome, FieldOutcome::Invalid("الاسم is required".into()));
    }

    #[test]
    fn optional_absent_short_circuits_all_other_rules() {
        let mut field = text_field(false);
        field.validation = Some(FieldValidation {
            regex: Some("^[0-9]+$".into()),
            min: Some(5),
            max: Some(10),
            error: None,
        });
        for value in [None, Some(&Value::Null), Some(&json!(""))] {
            assert!(validate_field(&field, value, Language::Ar).is_ok());
        }
    }

    #[test]
    fn non_string_text_value_rejected() {
        let outcome = validate_field(&text_field(true), Some(&json!(42)), Language::En);
        assert_eq!(outcome, FieldOutcome::Invalid("Invalid text value".into()));
    }

    #[test]
    fn regex_mismatch_uses_configured_message_with_fallbacks() {
        let mut field = text_field(true);
        field.validation = Some(FieldValidation {
            regex: Some("^[A-Za-z]+$".into()),
            min: None,
            max: None,
            error: Some(BilingualText::new("أحرف إنجليزية فقط", "English letters only")),
        });

        let outcome = validate_field(&field, Some(&json!("abc123")), Language::En);
        assert_eq!(outcome, FieldOutcome::Invalid("English letters only".into()));

        // Blank English message falls back to Arabic.
        field.validation.as_mut().unwrap().error =
            Some(BilingualText::new("أحرف إنجليزية فقط", ""));
        let outcome = validate_field(&field, Some(&json!("abc123")), Language::En);
        assert_eq!(outcome, FieldOutcome::Invalid("أحرف إنجليزية فقط".into()));

        // No configured message at all falls back to the generic one.
        field.validation.as_mut().unwrap().error = None;
        let outcome = validate_field(&field, Some(&json!("abc123")), Language::En);
        assert_eq!(outcome, FieldOutcome::Invalid("Invalid format".into()));
    }

    #[test]
    fn regex_match_then_length_bounds() {
        let mut field = text_field(true);
        field.validation = Some(FieldValidation {
            regex: Some("^[A-Za-z]+$".into()),
            min: Some(2),
            max: Some(5),
            error: None,
        });

        assert!(validate_field(&field, Some(&json!("Ali")), Language::En).is_ok());
        assert_eq!(
            validate_field(&field, Some(&json!("A")), Language::En),
            FieldOutcome::Invalid("Minimum length is 2".into())
        );
        assert_eq!(
            validate_field(&field, Some(&json!("Abdullah")), Language::En),
            FieldOutcome::Invalid("Maximum length is 5".into())
        );
    }

    #[test]
    fn length_bounds_are_inclusive_and_counted_in_chars() {
        let mut field = text_field(true);
        field.validation = Some(FieldValidation {
            regex: None,
            min: Some(3),
            max: Some(3),
            error: None,
        });
        // Three Arabic characters, far more than three bytes.
        assert!(validate_field(&field, Some(&json!("علي")), Language::Ar).is_ok());
    }

    #[test]
    fn date_parseability() {
        let mut field = text_field(true);
        field.field_type = FieldType::Date;

        assert!(validate_field(&field, Some(&json!("2026-03-15")), Language::En).is_ok());
        assert!(
            validate_field(&field, Some(&json!("2026-03-15T10:00:00Z")), Language::En).is_ok()
        );
        assert_eq!(
            validate_field(&field, Some(&json!("not-a-date")), Language::En),
            FieldOutcome::Invalid("Invalid date".into())
        );
        assert_eq!(
            validate_field(&field, Some(&json!(20260315)), Language::En),
            FieldOutcome::Invalid("Invalid date".into())
        );
    }

    #[test]
    fn choice_accepts_declared_value_and_rejects_others() {
        let field = choice_field();
        assert!(validate_field(&field, Some(&json!("m")), Language::En).is_ok());
        assert_eq!(
            validate_field(&field, Some(&json!("x")), Language::En),
            FieldOutcome::Invalid("Invalid choice".into())
        );
    }

    #[test]
    fn choice_numbers_compare_numerically_but_never_coerce_strings() {
        let mut field = choice_field();
        field.options = vec![ChoiceOption {
            value: json!(3),
            label: BilingualText::new("٣", "3"),
        }];

        assert!(validate_field(&field, Some(&json!(3)), Language::En).is_ok());
        assert!(validate_field(&field, Some(&json!(3.0)), Language::En).is_ok());
        assert!(!validate_field(&field, Some(&json!("3")), Language::En).is_ok());
    }

    #[test]
    fn validation_is_idempotent() {
        let field = choice_field();
        let first = validate_field(&field, Some(&json!("x")), Language::Ar);
        for _ in 0..10 {
            assert_eq!(validate_field(&field, Some(&json!("x")), Language::Ar), first);
        }
    }
}
