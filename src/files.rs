//! File confirmation
//!
//! The engine never sees file bytes; the blob store does the transfer.
//! What arrives here is a post-hoc confirmation record naming the field,
//! the stored object key, and the size/mime the upload path observed. The
//! declared `file` field constraints are cross-checked at this point, not
//! inside the payload validator.

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::database::submission_repository::FileRow;
use crate::database::{SubmissionRepository, TemplateRepository};
use crate::error::{EngineError, EngineResult};
use crate::schema::{FieldType, FileFieldConfig, TemplateDefinition};

/// A confirmation record from the blob-store collaborator.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfirmation {
    pub field_key: String,
    pub object_key: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

/// Why a confirmation was refused. Returned as data: an invalid
/// confirmation is a caller mistake, not an infrastructure fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileRejection {
    #[error("No field '{key}' is declared by this template")]
    UnknownField { key: String },

    #[error("Field '{key}' is not a file field")]
    NotFileField { key: String },

    #[error("File exceeds the {limit_mb}MB limit for this field")]
    TooLarge { limit_mb: u64 },

    #[error("File type '{mime_type}' is not accepted for this field")]
    TypeNotAccepted { mime_type: String },

    #[error("Field already has its maximum of {limit} file(s)")]
    TooManyFiles { limit: u32 },
}

/// Outcome of a confirmation attempt.
#[derive(Debug)]
pub enum ConfirmOutcome {
    Confirmed(FileRow),
    Rejected(FileRejection),
}

/// Build the blob-store object key for an upload:
/// `forms/<template>/submissions/<submission>/<field>/<uuid>.<ext>`.
pub fn object_key(
    template_id: Uuid,
    submission_id: Uuid,
    field_key: &str,
    filename: &str,
) -> String {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("bin");
    format!(
        "forms/{template_id}/submissions/{submission_id}/{field_key}/{}.{ext}",
        Uuid::new_v4()
    )
}

/// Check one confirmation against the declared config. `existing_files` is
/// the number of records already confirmed for this field.
pub fn check_confirmation(
    config: &FileFieldConfig,
    confirmation: &FileConfirmation,
    existing_files: i64,
) -> Result<(), FileRejection> {
    if existing_files >= config.max_files as i64 {
        return Err(FileRejection::TooManyFiles {
            limit: config.max_files,
        });
    }

    let limit_bytes = config.max_size_mb as i64 * 1024 * 1024;
    if confirmation.size_bytes > limit_bytes {
        return Err(FileRejection::TooLarge {
            limit_mb: config.max_size_mb,
        });
    }

    if !config.accept.is_empty()
        && !config
            .accept
            .iter()
            .any(|pattern| pattern_matches(pattern, confirmation))
    {
        return Err(FileRejection::TypeNotAccepted {
            mime_type: confirmation.mime_type.clone(),
        });
    }

    Ok(())
}

/// Accept patterns are mime types (`application/pdf`), mime wildcards
/// (`image/*`), or filename extensions (`.pdf`), checked case-insensitively.
fn pattern_matches(pattern: &str, confirmation: &FileConfirmation) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let mime = confirmation.mime_type.to_ascii_lowercase();

    if let Some(ext) = pattern.strip_prefix('.') {
        return confirmation
            .object_key
            .to_ascii_lowercase()
            .ends_with(&format!(".{ext}"));
    }
    if let Some(prefix) = pattern.strip_suffix("/*") {
        return mime.starts_with(&format!("{prefix}/"));
    }
    mime == pattern
}

fn declared_config<'a>(
    definition: &'a TemplateDefinition,
    field_key: &str,
) -> Result<&'a FileFieldConfig, FileRejection> {
    let field = definition.field(field_key).ok_or(FileRejection::UnknownField {
        key: field_key.to_string(),
    })?;
    if field.field_type != FieldType::File {
        return Err(FileRejection::NotFileField {
            key: field_key.to_string(),
        });
    }
    // Schema validation guarantees file fields carry a config.
    field.file.as_ref().ok_or(FileRejection::NotFileField {
        key: field_key.to_string(),
    })
}

/// Attaches confirmed uploads to submissions.
#[derive(Clone)]
pub struct FileService {
    templates: TemplateRepository,
    submissions: SubmissionRepository,
}

impl FileService {
    pub fn new(templates: TemplateRepository, submissions: SubmissionRepository) -> Self {
        Self {
            templates,
            submissions,
        }
    }

    /// Cross-check a confirmation against the submission's pinned template
    /// version and, if it passes, append the file record.
    pub async fn confirm_file(
        &self,
        submission_id: Uuid,
        confirmation: FileConfirmation,
    ) -> EngineResult<ConfirmOutcome> {
        let submission = self
            .submissions
            .get(submission_id)
            .await?
            .ok_or(EngineError::SubmissionNotFound { id: submission_id })?;

        let snapshot = self
            .templates
            .definition_at(submission.template_id, submission.template_version)
            .await?
            .ok_or(EngineError::InvalidTemplateState {
                id: submission.template_id,
                reason: format!(
                    "version snapshot {} is missing",
                    submission.template_version
                ),
            })?;

        let config = match declared_config(&snapshot.definition.0, &confirmation.field_key) {
            Ok(config) => config,
            Err(rejection) => return Ok(ConfirmOutcome::Rejected(rejection)),
        };

        let existing = self
            .submissions
            .count_files(submission_id, &confirmation.field_key)
            .await?;

        if let Err(rejection) = check_confirmation(config, &confirmation, existing) {
            return Ok(ConfirmOutcome::Rejected(rejection));
        }

        let row = self
            .submissions
            .insert_file(
                submission_id,
                &confirmation.field_key,
                &confirmation.object_key,
                &confirmation.mime_type,
                confirmation.size_bytes,
            )
            .await?;
        info!(%submission_id, field_key = %row.field_key, "Confirmed file upload");
        Ok(ConfirmOutcome::Confirmed(row))
    }
}
