//! Whole-payload validation
//!
//! Applies the field validator across every declared field of a template
//! and aggregates the failures. It never stops at the first bad field, so
//! a form round-trip surfaces everything the respondent has to fix at once.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::field::{validate_field, FieldOutcome};
use crate::schema::{FieldType, Language, TemplateDefinition};

/// The end-user-submitted key/value data for one submission. Never mutated
/// by validation; the engine either accepts it as-is or returns a parallel
/// error map.
pub type SubmissionPayload = Map<String, Value>;

/// Aggregated validation outcome. Invariant: `valid == errors.is_empty()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    /// Field key to localized message, in field-list order.
    pub errors: BTreeMap<String, String>,
}

impl ValidationReport {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: BTreeMap::new(),
        }
    }

    /// A report rejecting a single field.
    pub fn single(key: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(key.into(), message.into());
        Self {
            valid: false,
            errors,
        }
    }

    fn from_errors(errors: BTreeMap<String, String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate a submitted payload against a template definition.
///
/// Every declared field except `file`-typed ones runs through the field
/// validator; file fields are checked by the confirmation flow. Payload
/// keys the schema does not declare are ignored rather than rejected,
/// matching the platform's permissive submission contract.
pub fn validate_payload(
    template: &TemplateDefinition,
    payload: &SubmissionPayload,
    language: Language,
) -> ValidationReport {
    let mut errors = BTreeMap::new();

    for field in &template.fields {
        if field.field_type == FieldType::File {
            continue;
        }
        match validate_field(field, payload.get(&field.key), language) {
            FieldOutcome::Ok => {}
            FieldOutcome::Invalid(message) => {
                errors.insert(field.key.clone(), message);
            }
        }
    }

    ValidationReport::from_errors(errors)
}
