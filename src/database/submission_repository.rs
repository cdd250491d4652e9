//! Submission persistence
//!
//! Conflict-aware insert for submission rows plus the slot existence check
//! and file-confirmation records. The insert reports a unique violation on
//! the slot index as data (`InsertOutcome::SlotConflict`) rather than an
//! error, because under concurrency it is an expected outcome, not a fault.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::schema::Language;
use crate::validation::SubmissionPayload;

/// A durably accepted submission.
#[derive(Debug, Clone, FromRow)]
pub struct SubmissionRow {
    pub id: Uuid,
    pub template_id: Uuid,
    pub template_version: i32,
    pub form_instance_token: Option<String>,
    pub person_slot: Option<i64>,
    pub submitted_at: DateTime<Utc>,
    pub language: Language,
    pub respondent_ref: Option<String>,
    pub payload: Json<SubmissionPayload>,
    pub origin_hash: Option<String>,
}

/// A confirmed file attachment.
#[derive(Debug, Clone, FromRow)]
pub struct FileRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub field_key: String,
    pub object_key: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub uploaded_at: DateTime<Utc>,
}

/// Everything needed to persist one submission.
#[derive(Debug, Clone)]
pub struct InsertSubmission {
    pub id: Uuid,
    pub template_id: Uuid,
    pub template_version: i32,
    pub form_instance_token: Option<String>,
    pub person_slot: Option<i64>,
    pub language: Language,
    pub respondent_ref: Option<String>,
    pub payload: SubmissionPayload,
    pub origin_hash: Option<String>,
}

/// Result of attempting a durable insert.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(SubmissionRow),
    /// The slot uniqueness index rejected the row: another submission
    /// already claims this (template, form instance, slot) triple.
    SlotConflict,
}

const SUBMISSION_COLUMNS: &str = "id, template_id, template_version, form_instance_token, \
     person_slot, submitted_at, language, respondent_ref, payload, origin_hash";

/// Name of the partial unique index enforcing slot uniqueness; see the
/// migrations.
const SLOT_CLAIM_INDEX: &str = "submissions_slot_claim";

/// Repository for submissions and their file records.
#[derive(Clone)]
pub struct SubmissionRepository {
    pool: PgPool,
}

impl SubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a submission, translating a unique violation on the slot
    /// index into [`InsertOutcome::SlotConflict`]. Any other database
    /// failure propagates.
    pub async fn insert(&self, record: InsertSubmission) -> EngineResult<InsertOutcome> {
        let result = sqlx::query_as::<_, SubmissionRow>(&format!(
            r#"
            INSERT INTO submissions (
                id, template_id, template_version, form_instance_token,
                person_slot, language, respondent_ref, payload, origin_hash
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(record.id)
        .bind(record.template_id)
        .bind(record.template_version)
        .bind(&record.form_instance_token)
        .bind(record.person_slot)
        .bind(record.language)
        .bind(&record.respondent_ref)
        .bind(Json(&record.payload))
        .bind(&record.origin_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => {
                info!(submission_id = %row.id, template_id = %row.template_id,
                      slot = ?row.person_slot, "Stored submission");
                Ok(InsertOutcome::Inserted(row))
            }
            Err(sqlx::Error::Database(db_err))
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some(SLOT_CLAIM_INDEX) =>
            {
                debug!(template_id = %record.template_id, slot = ?record.person_slot,
                       "Slot claim lost to a concurrent submission");
                Ok(InsertOutcome::SlotConflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Does any submission already claim this slot? An early-exit
    /// optimization only; the unique index is the correctness mechanism.
    pub async fn exists_slot_claim(
        &self,
        template_id: Uuid,
        form_instance_token: &str,
        slot: i64,
    ) -> EngineResult<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM submissions
            WHERE template_id = $1 AND form_instance_token = $2 AND person_slot = $3
            "#,
        )
        .bind(template_id)
        .bind(form_instance_token)
        .bind(slot)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn get(&self, id: Uuid) -> EngineResult<Option<SubmissionRow>> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_by_template(&self, template_id: Uuid) -> EngineResult<Vec<SubmissionRow>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions \
             WHERE template_id = $1 ORDER BY submitted_at DESC"
        ))
        .bind(template_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Append a confirmed file record to a submission's file-set.
    pub async fn insert_file(
        &self,
        submission_id: Uuid,
        field_key: &str,
        object_key: &str,
        mime_type: &str,
        size_bytes: i64,
    ) -> EngineResult<FileRow> {
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            INSERT INTO submission_files (id, submission_id, field_key, object_key, mime_type, size_bytes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, submission_id, field_key, object_key, mime_type, size_bytes, uploaded_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(submission_id)
        .bind(field_key)
        .bind(object_key)
        .bind(mime_type)
        .bind(size_bytes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn files_for(&self, submission_id: Uuid) -> EngineResult<Vec<FileRow>> {
        let rows = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT id, submission_id, field_key, object_key, mime_type, size_bytes, uploaded_at
            FROM submission_files
            WHERE submission_id = $1
            ORDER BY uploaded_at
            "#,
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// How many files are already confirmed for one field of a submission.
    pub async fn count_files(&self, submission_id: Uuid, field_key: &str) -> EngineResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM submission_files WHERE submission_id = $1 AND field_key = $2",
        )
        .bind(submission_id)
        .bind(field_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
