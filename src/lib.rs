//! Istimara: bilingual form template and submission validation engine
//!
//! Administrators author form templates as structured JSON schemas; end
//! users submit payloads that are validated dynamically against the pinned
//! template version. Every user-facing message carries Arabic and English.
//!
//! The engine's three layers:
//! - a pure validation core (`schema`, `validation`) with no I/O,
//! - a Postgres persistence layer (`database`) whose unique index enforces
//!   the person-slot invariant under concurrent submissions,
//! - assembly services (`submission`, `files`, `slots`) composing the two.
//!
//! ## Quick start
//!
//! ```rust
//! use istimara::schema::{Language, TemplateDefinition};
//! use istimara::validation::validate_payload;
//!
//! let definition = TemplateDefinition::parse(r#"{
//!     "templateKey": "contact",
//!     "title": {"ar": "اتصل بنا", "en": "Contact us"},
//!     "fields": [
//!         {"key": "name", "type": "text", "required": true,
//!          "label": {"ar": "الاسم", "en": "Name"}}
//!     ]
//! }"#).unwrap();
//!
//! let payload = serde_json::json!({"name": "Ali"});
//! let report = validate_payload(&definition, payload.as_object().unwrap(), Language::Ar);
//! assert!(report.valid);
//! ```

pub mod database;
pub mod error;
pub mod files;
pub mod schema;
pub mod slots;
pub mod submission;
pub mod validation;

pub use database::{DatabaseConfig, DatabaseManager, SubmissionRepository, TemplateRepository};
pub use error::{EngineError, EngineResult, SchemaError};
pub use files::{ConfirmOutcome, FileConfirmation, FileRejection, FileService};
pub use schema::{
    BilingualText, FieldDefinition, FieldType, Language, TemplateDefinition, TemplateSettings,
};
pub use slots::{SlotClaim, SlotCoordinator, PERSON_SLOT_KEY};
pub use submission::{hash_origin, NewSubmission, SubmissionService, SubmitOutcome};
pub use validation::{validate_field, validate_payload, FieldOutcome, ValidationReport};
