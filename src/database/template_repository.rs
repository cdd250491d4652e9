//! Template persistence
//!
//! Stores template definitions as opaque JSONB documents with the bilingual
//! title/description denormalized alongside for listing. Publishing writes
//! an immutable snapshot into `template_versions`; the submission path
//! always validates against a pinned snapshot, never the editable draft.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::schema::TemplateDefinition;

/// Template lifecycle status matching the DB constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl std::fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateStatus::Draft => write!(f, "draft"),
            TemplateStatus::Published => write!(f, "published"),
            TemplateStatus::Archived => write!(f, "archived"),
        }
    }
}

/// A stored template row.
#[derive(Debug, Clone, FromRow)]
pub struct TemplateRow {
    pub id: Uuid,
    pub status: TemplateStatus,
    pub title_ar: String,
    pub title_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_en: Option<String>,
    pub definition: Json<TemplateDefinition>,
    pub retention_days: i32,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable published snapshot of a template definition.
#[derive(Debug, Clone, FromRow)]
pub struct TemplateVersionRow {
    pub id: Uuid,
    pub template_id: Uuid,
    pub version: i32,
    pub definition: Json<TemplateDefinition>,
    pub created_at: DateTime<Utc>,
}

const TEMPLATE_COLUMNS: &str = "id, status, title_ar, title_en, description_ar, description_en, \
     definition, retention_days, created_by, created_at, updated_at";

/// Repository for template rows and their published snapshots.
#[derive(Clone)]
pub struct TemplateRepository {
    pool: PgPool,
}

impl TemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a new draft template. The definition must already have passed
    /// [`TemplateDefinition::validate`]; `parse` guarantees that for
    /// documents arriving as raw JSON.
    pub async fn create(
        &self,
        definition: &TemplateDefinition,
        created_by: Option<&str>,
    ) -> EngineResult<TemplateRow> {
        definition.validate()?;
        let id = Uuid::new_v4();

        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            r#"
            INSERT INTO templates (
                id, status, title_ar, title_en, description_ar, description_en,
                definition, retention_days, created_by
            ) VALUES ($1, 'draft', $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&definition.title.ar)
        .bind(&definition.title.en)
        .bind(&definition.description.ar)
        .bind(&definition.description.en)
        .bind(Json(definition))
        .bind(definition.retention_days() as i32)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        info!(template_id = %id, key = %definition.template_key, "Created draft template");
        Ok(row)
    }

    pub async fn get(&self, id: Uuid) -> EngineResult<Option<TemplateRow>> {
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_by_status(&self, status: TemplateStatus) -> EngineResult<Vec<TemplateRow>> {
        let rows = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE status = $1 ORDER BY updated_at DESC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Replace a draft's definition. Published templates are immutable.
    pub async fn update_definition(
        &self,
        id: Uuid,
        definition: &TemplateDefinition,
    ) -> EngineResult<()> {
        definition.validate()?;

        let current = self
            .get(id)
            .await?
            .ok_or(EngineError::TemplateNotFound { id })?;
        if current.status != TemplateStatus::Draft {
            return Err(EngineError::InvalidTemplateState {
                id,
                reason: format!("cannot edit a {} template", current.status),
            });
        }

        sqlx::query(
            r#"
            UPDATE templates
            SET title_ar = $2, title_en = $3, description_ar = $4, description_en = $5,
                definition = $6, retention_days = $7, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&definition.title.ar)
        .bind(&definition.title.en)
        .bind(&definition.description.ar)
        .bind(&definition.description.en)
        .bind(Json(definition))
        .bind(definition.retention_days() as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Publish a template: snapshot its definition as the next version and
    /// flip status. Refuses an already-published template. Returns the new
    /// version number.
    pub async fn publish(&self, id: Uuid) -> EngineResult<i32> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(EngineError::TemplateNotFound { id })?;

        if row.status == TemplateStatus::Published {
            return Err(EngineError::InvalidTemplateState {
                id,
                reason: "template is already published".to_string(),
            });
        }

        let version: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM template_versions WHERE template_id = $1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO template_versions (id, template_id, version, definition)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(version)
        .bind(&row.definition)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE templates SET status = 'published', updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(template_id = %id, version, "Published template");
        Ok(version)
    }

    /// Latest published version number, if any.
    pub async fn latest_version(&self, template_id: Uuid) -> EngineResult<Option<i32>> {
        let version: Option<i32> =
            sqlx::query_scalar("SELECT MAX(version) FROM template_versions WHERE template_id = $1")
                .bind(template_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    /// The definition snapshot pinned at a given version.
    pub async fn definition_at(
        &self,
        template_id: Uuid,
        version: i32,
    ) -> EngineResult<Option<TemplateVersionRow>> {
        let row = sqlx::query_as::<_, TemplateVersionRow>(
            r#"
            SELECT id, template_id, version, definition, created_at
            FROM template_versions
            WHERE template_id = $1 AND version = $2
            "#,
        )
        .bind(template_id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
