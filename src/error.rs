//! Error handling for the forms engine
//!
//! Two layers: `SchemaError` for template-document problems (fatal to
//! template operations, never silently defaulted) and `EngineError` for
//! everything the submission path can surface. Per-field payload rejections
//! are *not* errors; they travel as [`ValidationReport`] data so the
//! boundary can map them to a 4xx response without unwinding.
//!
//! [`ValidationReport`]: crate::validation::ValidationReport

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while parsing or validating a template document.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The document is not well-formed JSON.
    #[error("Malformed template document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Required top-level keys (`title`, `fields`) are absent, or a field
    /// carries a shape its declared type forbids.
    #[error("Invalid template shape: {reason}")]
    InvalidShape { reason: String },

    /// Two fields share a key. Field keys address payload values and error
    /// maps, so they must be unique within one template.
    #[error("Duplicate field key '{key}'")]
    DuplicateFieldKey { key: String },

    /// A `choice` field declared no options.
    #[error("Choice field '{key}' has no options")]
    MissingOptions { key: String },

    /// A `file` field declared no file constraints.
    #[error("File field '{key}' has no file configuration")]
    MissingFileConfig { key: String },

    /// A field validation regex does not compile.
    #[error("Invalid regex on field '{key}': {message}")]
    InvalidRegex { key: String, message: String },
}

/// Top-level error type for the submission engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Template {id} not found")]
    TemplateNotFound { id: Uuid },

    /// Submissions are only accepted against published templates; drafts
    /// and archived templates are refused outright.
    #[error("Template {id} is not published (status: {status})")]
    TemplateNotPublished { id: Uuid, status: String },

    #[error("Submission {id} not found")]
    SubmissionNotFound { id: Uuid },

    /// An attempt to mutate a template in a state that forbids it, e.g.
    /// editing or re-publishing a published template.
    #[error("Template {id}: {reason}")]
    InvalidTemplateState { id: Uuid, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(serde_json::Error),
}

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;
