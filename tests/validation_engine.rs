//! End-to-end tests of the pure validation core: template parsing through
//! payload validation, no database involved.

use istimara::schema::{Language, TemplateDefinition};
use istimara::validation::{validate_field, validate_payload, FieldOutcome};
use proptest::prelude::*;
use serde_json::json;

fn registration_template() -> TemplateDefinition {
    TemplateDefinition::parse(
        &json!({
            "templateKey": "delegation-registration",
            "title": {"ar": "تسجيل الوفد", "en": "Delegation registration"},
            "description": {"ar": "نموذج تسجيل أعضاء الوفد", "en": ""},
            "defaultLanguage": "ar",
            "settings": {"personSlotsEnabled": false, "retentionDays": 90},
            "fields": [
                {
                    "key": "name",
                    "type": "text",
                    "required": true,
                    "label": {"ar": "الاسم", "en": "Name"},
                    "validation": {"max": 50}
                },
                {
                    "key": "gender",
                    "type": "choice",
                    "required": true,
                    "label": {"ar": "الجنس", "en": "Gender"},
                    "options": [
                        {"value": "m", "label": {"ar": "ذكر", "en": "Male"}},
                        {"value": "f", "label": {"ar": "أنثى", "en": "Female"}}
                    ]
                },
                {
                    "key": "arrival_date",
                    "type": "date",
                    "required": false,
                    "label": {"ar": "تاريخ الوصول", "en": "Arrival date"}
                },
                {
                    "key": "notes",
                    "type": "textarea",
                    "required": false,
                    "label": {"ar": "ملاحظات", "en": "Notes"},
                    "validation": {"min": 10, "max": 500}
                }
            ]
        })
        .to_string(),
    )
    .expect("template parses")
}

fn payload(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().unwrap().clone()
}

#[test]
fn complete_payload_is_accepted() {
    let report = validate_payload(
        &registration_template(),
        &payload(json!({"name": "Ali", "gender": "m"})),
        Language::Ar,
    );
    assert!(report.valid);
    assert!(report.errors.is_empty());
}

#[test]
fn empty_payload_reports_the_required_field_in_arabic() {
    let report = validate_payload(&registration_template(), &payload(json!({})), Language::Ar);
    assert!(!report.valid);
    assert_eq!(report.errors["name"], "الاسم مطلوب");
}

#[test]
fn choice_outside_options_is_rejected_and_inside_accepted() {
    let template = registration_template();

    let report = validate_payload(
        &template,
        &payload(json!({"name": "Ali", "gender": "x"})),
        Language::En,
    );
    assert!(!report.valid);
    assert!(report.errors.contains_key("gender"));

    let report = validate_payload(
        &template,
        &payload(json!({"name": "Ali", "gender": "m"})),
        Language::En,
    );
    assert!(report.valid);
}

#[test]
fn all_failures_are_aggregated_not_short_circuited() {
    let report = validate_payload(
        &registration_template(),
        &payload(json!({"gender": "x", "arrival_date": "soon", "notes": "short"})),
        Language::En,
    );
    assert_eq!(report.errors.len(), 4);
    assert_eq!(report.errors["name"], "Name is required");
    assert_eq!(report.errors["arrival_date"], "Invalid date");
    assert_eq!(report.errors["notes"], "Minimum length is 10");
}

#[test]
fn optional_fields_may_be_omitted_entirely() {
    let report = validate_payload(
        &registration_template(),
        &payload(json!({"name": "Ali", "gender": "f"})),
        Language::En,
    );
    assert!(report.valid);
}

#[test]
fn name_at_the_length_bound_is_accepted() {
    let name = "a".repeat(50);
    let report = validate_payload(
        &registration_template(),
        &payload(json!({"name": name, "gender": "m"})),
        Language::En,
    );
    assert!(report.valid);

    let name = "a".repeat(51);
    let report = validate_payload(
        &registration_template(),
        &payload(json!({"name": name, "gender": "m"})),
        Language::En,
    );
    assert_eq!(report.errors["name"], "Maximum length is 50");
}

proptest! {
    /// Validating the same (field, value, language) triple any number of
    /// times yields the same result.
    #[test]
    fn field_validation_is_idempotent(value in ".{0,64}") {
        let template = registration_template();
        let field = template.field("notes").unwrap();
        let candidate = json!(value);

        let first = validate_field(field, Some(&candidate), Language::Ar);
        for _ in 0..3 {
            prop_assert_eq!(
                validate_field(field, Some(&candidate), Language::Ar),
                first.clone()
            );
        }
    }

    /// Optional fields accept absence no matter what value constraints are
    /// configured, and required fields never accept absence.
    #[test]
    fn absence_depends_only_on_requiredness(min in proptest::option::of(0u32..20),
                                            max in proptest::option::of(20u32..100)) {
        let mut template = registration_template();
        {
            let field = template.fields.iter_mut().find(|f| f.key == "notes").unwrap();
            let rules = field.validation.as_mut().unwrap();
            rules.min = min;
            rules.max = max;
        }

        let optional = template.field("notes").unwrap();
        prop_assert!(validate_field(optional, None, Language::Ar).is_ok());

        let mut required = optional.clone();
        required.required = true;
        prop_assert!(matches!(
            validate_field(&required, None, Language::Ar),
            FieldOutcome::Invalid(_)
        ));
    }
}
