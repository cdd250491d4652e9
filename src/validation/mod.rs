//! Payload validation engine
//!
//! Pure, deterministic, no I/O: the field validator decides one field, the
//! payload validator aggregates across a template's field list, and the
//! message catalog composes every bilingual rejection the two emit.

pub mod field;
pub mod messages;
pub mod payload;

pub use field::{validate_field, FieldOutcome};
pub use payload::{validate_payload, SubmissionPayload, ValidationReport};
