//! Submission assembly
//!
//! The single entry point callers use: resolve the template, validate the
//! payload, reserve the slot when the template asks for one, and persist
//! an immutable record pinned to the published definition version. No
//! partial success: either an accepted record comes back or a structured
//! rejection does, and validation failures are data, never errors.

use sha2::{Digest, Sha256};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::database::submission_repository::{InsertOutcome, SubmissionRow};
use crate::database::template_repository::TemplateStatus;
use crate::database::{InsertSubmission, SubmissionRepository, TemplateRepository};
use crate::error::{EngineError, EngineResult};
use crate::schema::{Language, TemplateDefinition};
use crate::slots::{extract_slot, SlotClaim, SlotCoordinator};
use crate::validation::{validate_payload, SubmissionPayload, ValidationReport};

/// Truncated length of the origin hash. One-way and fixed-length; used for
/// abuse-rate observation only, never reversible to the original value.
pub const ORIGIN_HASH_LEN: usize = 32;

/// Hex SHA-256 of a client origin identifier, truncated to
/// [`ORIGIN_HASH_LEN`] characters.
pub fn hash_origin(origin: &str) -> String {
    let digest = Sha256::digest(origin.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(ORIGIN_HASH_LEN);
    hash
}

/// An inbound submission request. The client origin is an explicit
/// parameter; assembly never reads ambient request state.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub template_id: Uuid,
    pub language: Language,
    pub payload: SubmissionPayload,
    pub form_instance_token: Option<String>,
    pub respondent_ref: Option<String>,
    pub client_origin: Option<String>,
}

/// Result of a submission attempt. Infrastructure failures travel as
/// `EngineError`; a rejection is a normal outcome.
#[derive(Debug)]
pub enum SubmitOutcome {
    Accepted(SubmissionRow),
    Rejected(ValidationReport),
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted(_))
    }
}

/// Validates and assembles submissions against published templates.
#[derive(Clone)]
pub struct SubmissionService {
    templates: TemplateRepository,
    submissions: SubmissionRepository,
    slots: SlotCoordinator,
}

impl SubmissionService {
    pub fn new(templates: TemplateRepository, submissions: SubmissionRepository) -> Self {
        let slots = SlotCoordinator::new(submissions.clone());
        Self {
            templates,
            submissions,
            slots,
        }
    }

    /// Validate and persist one submission.
    #[instrument(skip(self, request), fields(template_id = %request.template_id))]
    pub async fn submit(&self, request: NewSubmission) -> EngineResult<SubmitOutcome> {
        let template = self
            .templates
            .get(request.template_id)
            .await?
            .ok_or(EngineError::TemplateNotFound {
                id: request.template_id,
            })?;

        if template.status != TemplateStatus::Published {
            return Err(EngineError::TemplateNotPublished {
                id: template.id,
                status: template.status.to_string(),
            });
        }

        // Validate against the pinned snapshot, not the editable draft row.
        // A published template always has at least one snapshot.
        let version = self
            .templates
            .latest_version(template.id)
            .await?
            .ok_or(EngineError::InvalidTemplateState {
                id: template.id,
                reason: "published template has no version snapshot".to_string(),
            })?;
        let snapshot = self
            .templates
            .definition_at(template.id, version)
            .await?
            .ok_or(EngineError::InvalidTemplateState {
                id: template.id,
                reason: format!("version snapshot {version} is missing"),
            })?;
        let definition: &TemplateDefinition = &snapshot.definition.0;

        let report = validate_payload(definition, &request.payload, request.language);
        if !report.valid {
            return Ok(SubmitOutcome::Rejected(report));
        }

        let slot = match extract_slot(&definition.settings, &request.payload, request.language) {
            Ok(slot) => slot,
            Err(report) => return Ok(SubmitOutcome::Rejected(report)),
        };

        // Slot-scoped submissions without an explicit token fall back to
        // the template id as the instance scope, matching the deployed
        // token contract.
        let form_instance_token = match (&request.form_instance_token, slot) {
            (Some(token), _) => Some(token.clone()),
            (None, Some(_)) => Some(template.id.to_string()),
            (None, None) => None,
        };

        if let (Some(slot), Some(token)) = (slot, form_instance_token.as_deref()) {
            // Early exit only; the unique index settles concurrent claims.
            if self.slots.try_reserve(template.id, token, slot).await? == SlotClaim::AlreadyTaken {
                return Ok(SubmitOutcome::Rejected(SlotCoordinator::conflict_report(
                    request.language,
                )));
            }
        }

        let record = InsertSubmission {
            id: Uuid::new_v4(),
            template_id: template.id,
            template_version: version,
            form_instance_token,
            person_slot: slot,
            language: request.language,
            respondent_ref: request.respondent_ref,
            payload: request.payload,
            origin_hash: request.client_origin.as_deref().map(hash_origin),
        };

        match self.submissions.insert(record).await? {
            InsertOutcome::Inserted(row) => {
                info!(submission_id = %row.id, version, "Submission accepted");
                Ok(SubmitOutcome::Accepted(row))
            }
            InsertOutcome::SlotConflict => Ok(SubmitOutcome::Rejected(
                SlotCoordinator::conflict_report(request.language),
            )),
        }
    }
}
