//! Template schema model
//!
//! In-memory representation of a form template: fields, types, bilingual
//! text, validation rules, file constraints, and settings. Templates are
//! authored as JSON documents, stored opaquely, and immutable once
//! published: every submission is validated against the exact definition
//! snapshot pinned to it, never the current draft.
//!
//! The wire format keeps the original camelCase document keys so stored
//! definitions round-trip unchanged.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// The two languages every user-facing string must cover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ar,
    En,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Ar => write!(f, "ar"),
            Language::En => write!(f, "en"),
        }
    }
}

/// A string in both languages. `ar` is always present; `en` may be empty
/// but never structurally absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualText {
    pub ar: String,
    #[serde(default)]
    pub en: String,
}

impl BilingualText {
    pub fn new(ar: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            ar: ar.into(),
            en: en.into(),
        }
    }

    /// Text in the requested language, falling back to Arabic when the
    /// requested language's entry is blank.
    pub fn in_language(&self, language: Language) -> &str {
        let text = match language {
            Language::Ar => &self.ar,
            Language::En => &self.en,
        };
        if text.is_empty() {
            &self.ar
        } else {
            text
        }
    }
}

/// Closed set of field types. Deserializing an unknown type is a schema
/// error, not a runtime validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Date,
    Choice,
    File,
}

/// Constraints for text-like fields. Ignored for other types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Inclusive minimum length, counted in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    /// Inclusive maximum length, counted in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    /// Message shown on regex mismatch, in both languages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BilingualText>,
}

/// Upload constraints for `file` fields, enforced at confirmation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFieldConfig {
    pub max_files: u32,
    #[serde(rename = "maxSizeMB")]
    pub max_size_mb: u64,
    /// Accepted mime types or filename extensions. `image/*` wildcards and
    /// bare extensions like `.pdf` are both honored.
    pub accept: Vec<String>,
}

/// One legal value for a `choice` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// String or number; the only legal submission values for the field.
    pub value: serde_json::Value,
    pub label: BilingualText,
}

/// One input declared by a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Unique within the template's field list.
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    pub label: BilingualText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<BilingualText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<BilingualText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileFieldConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceOption>,
}

/// Template-level behavior switches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSettings {
    /// When true, every submission must carry a `person_slot` value and the
    /// slot coordinator enforces per-instance uniqueness.
    #[serde(default)]
    pub person_slots_enabled: bool,
    /// Legal slot numbers. Empty means any slot number is legal.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub person_slots: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_submissions_per_slot: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,
}

/// Default retention applied when a template's settings omit it.
pub const DEFAULT_RETENTION_DAYS: u32 = 180;

/// A complete form template definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDefinition {
    pub template_key: String,
    pub title: BilingualText,
    #[serde(default)]
    pub description: BilingualText,
    #[serde(default)]
    pub default_language: Language,
    #[serde(default)]
    pub settings: TemplateSettings,
    pub fields: Vec<FieldDefinition>,
}

impl TemplateDefinition {
    /// Parse a raw template document.
    ///
    /// Fails `Malformed` when the document is not well-formed JSON and
    /// `InvalidShape` when required top-level keys are absent or a field
    /// declaration does not fit the closed type set. A parsed definition
    /// has already passed [`TemplateDefinition::validate`].
    pub fn parse(raw: &str) -> Result<Self, SchemaError> {
        let document: serde_json::Value = serde_json::from_str(raw)?;

        let object = document.as_object().ok_or_else(|| SchemaError::InvalidShape {
            reason: "template document must be a JSON object".to_string(),
        })?;
        for key in ["title", "fields"] {
            if !object.contains_key(key) {
                return Err(SchemaError::InvalidShape {
                    reason: format!("missing required top-level key '{key}'"),
                });
            }
        }

        let definition: TemplateDefinition =
            serde_json::from_value(document).map_err(|e| SchemaError::InvalidShape {
                reason: e.to_string(),
            })?;
        definition.validate()?;
        Ok(definition)
    }

    /// Structural checks beyond what serde can express: unique field keys,
    /// `choice` fields carry options, `file` fields carry a file config,
    /// regexes compile. Run at load time so payload validation never has
    /// to cope with a half-formed schema.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.key.as_str()) {
                return Err(SchemaError::DuplicateFieldKey {
                    key: field.key.clone(),
                });
            }

            match field.field_type {
                FieldType::Choice if field.options.is_empty() => {
                    return Err(SchemaError::MissingOptions {
                        key: field.key.clone(),
                    });
                }
                FieldType::File if field.file.is_none() => {
                    return Err(SchemaError::MissingFileConfig {
                        key: field.key.clone(),
                    });
                }
                _ => {}
            }

            if let Some(pattern) = field.validation.as_ref().and_then(|v| v.regex.as_deref()) {
                if let Err(e) = regex::Regex::new(pattern) {
                    return Err(SchemaError::InvalidRegex {
                        key: field.key.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Look up a field by key.
    pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Retention days with the platform default applied.
    pub fn retention_days(&self) -> u32 {
        self.settings
            .retention_days
            .unwrap_or(DEFAULT_RETENTION_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_doc() -> serde_json::Value {
        serde_json::json!({
            "templateKey": "hajj-registration",
            "title": {"ar": "تسجيل", "en": "Registration"},
            "description": {"ar": "", "en": ""},
            "defaultLanguage": "ar",
            "fields": [
                {
                    "key": "name",
                    "type": "text",
                    "required": true,
                    "label": {"ar": "الاسم", "en": "Name"}
                }
            ]
        })
    }

    #[test]
    fn parses_minimal_document() {
        let def = TemplateDefinition::parse(&minimal_doc().to_string()).unwrap();
        assert_eq!(def.template_key, "hajj-registration");
        assert_eq!(def.fields.len(), 1);
        assert_eq!(def.fields[0].field_type, FieldType::Text);
        assert!(def.fields[0].required);
    }

    #[test]
    fn malformed_json_is_malformed() {
        let err = TemplateDefinition::parse("{not json").unwrap_err();
        assert!(matches!(err, SchemaError::Malformed(_)));
    }

    #[test]
    fn missing_title_is_invalid_shape() {
        let mut doc = minimal_doc();
        doc.as_object_mut().unwrap().remove("title");
        let err = TemplateDefinition::parse(&doc.to_string()).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidShape { .. }));
    }

    #[test]
    fn missing_fields_is_invalid_shape() {
        let mut doc = minimal_doc();
        doc.as_object_mut().unwrap().remove("fields");
        let err = TemplateDefinition::parse(&doc.to_string()).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidShape { .. }));
    }

    #[test]
    fn unknown_field_type_is_a_schema_error() {
        let mut doc = minimal_doc();
        doc["fields"][0]["type"] = "checkbox".into();
        let err = TemplateDefinition::parse(&doc.to_string()).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidShape { .. }));
    }

    #[test]
    fn duplicate_keys_rejected() {
        let mut doc = minimal_doc();
        let field = doc["fields"][0].clone();
        doc["fields"].as_array_mut().unwrap().push(field);
        let err = TemplateDefinition::parse(&doc.to_string()).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateFieldKey { key } if key == "name"));
    }

    #[test]
    fn choice_without_options_rejected() {
        let mut doc = minimal_doc();
        doc["fields"][0]["type"] = "choice".into();
        let err = TemplateDefinition::parse(&doc.to_string()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingOptions { .. }));
    }

    #[test]
    fn file_without_config_rejected() {
        let mut doc = minimal_doc();
        doc["fields"][0]["type"] = "file".into();
        let err = TemplateDefinition::parse(&doc.to_string()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingFileConfig { .. }));
    }

    #[test]
    fn bad_regex_rejected() {
        let mut doc = minimal_doc();
        doc["fields"][0]["validation"] = serde_json::json!({"regex": "[unclosed"});
        let err = TemplateDefinition::parse(&doc.to_string()).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidRegex { key, .. } if key == "name"));
    }

    #[test]
    fn bilingual_fallback_to_arabic() {
        let text = BilingualText::new("الاسم", "");
        assert_eq!(text.in_language(Language::En), "الاسم");
        let text = BilingualText::new("الاسم", "Name");
        assert_eq!(text.in_language(Language::En), "Name");
        assert_eq!(text.in_language(Language::Ar), "الاسم");
    }

    #[test]
    fn file_config_round_trips_wire_keys() {
        let json = serde_json::json!({"maxFiles": 2, "maxSizeMB": 20, "accept": ["image/*", ".pdf"]});
        let config: FileFieldConfig = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(config.max_size_mb, 20);
        assert_eq!(serde_json::to_value(&config).unwrap(), json);
    }
}
