//! Slot reservation coordination
//!
//! Guarantees at most one accepted submission per
//! `(template, form instance token, slot)` triple when a template enables
//! person slots. The check-then-insert sequence is a classic race window,
//! so the pre-check here is only a cheap early exit; the partial unique
//! index on `submissions` is what actually serializes concurrent claims,
//! and the repository surfaces its conflict as `InsertOutcome::SlotConflict`.

use tracing::debug;
use uuid::Uuid;

use crate::database::SubmissionRepository;
use crate::error::EngineResult;
use crate::schema::{Language, TemplateSettings};
use crate::validation::{messages, SubmissionPayload, ValidationReport};

/// Payload key carrying the slot number when a template enables slots.
pub const PERSON_SLOT_KEY: &str = "person_slot";

/// Outcome of a reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotClaim {
    Reserved,
    AlreadyTaken,
}

/// Coordinates slot claims against the durable store.
#[derive(Clone)]
pub struct SlotCoordinator {
    submissions: SubmissionRepository,
}

impl SlotCoordinator {
    pub fn new(submissions: SubmissionRepository) -> Self {
        Self { submissions }
    }

    /// Check whether a slot still looks free. `Reserved` here is
    /// provisional: two concurrent callers can both see it, and the unique
    /// index decides the loser at insert time.
    pub async fn try_reserve(
        &self,
        template_id: Uuid,
        form_instance_token: &str,
        slot: i64,
    ) -> EngineResult<SlotClaim> {
        let taken = self
            .submissions
            .exists_slot_claim(template_id, form_instance_token, slot)
            .await?;
        if taken {
            debug!(%template_id, form_instance_token, slot, "Slot already claimed");
            Ok(SlotClaim::AlreadyTaken)
        } else {
            Ok(SlotClaim::Reserved)
        }
    }

    /// The rejection returned when a claim loses, whether to the pre-check
    /// or to the unique index. Identical in user-visible effect either way.
    pub fn conflict_report(language: Language) -> ValidationReport {
        ValidationReport::single(PERSON_SLOT_KEY, messages::slot_taken(language))
    }
}

/// Extract and vet the slot number a payload carries, given the template's
/// settings. Returns the slot to reserve, or a rejection report.
///
/// Numbers are accepted as JSON integers or as strings of digits (HTML
/// forms post numbers as strings); nothing else parses.
pub fn extract_slot(
    settings: &TemplateSettings,
    payload: &SubmissionPayload,
    language: Language,
) -> Result<Option<i64>, ValidationReport> {
    if !settings.person_slots_enabled {
        return Ok(None);
    }

    let slot = payload.get(PERSON_SLOT_KEY).and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    });

    let Some(slot) = slot else {
        return Err(ValidationReport::single(
            PERSON_SLOT_KEY,
            messages::slot_required(language),
        ));
    };

    if !settings.person_slots.is_empty() && !settings.person_slots.contains(&slot) {
        return Err(ValidationReport::single(
            PERSON_SLOT_KEY,
            messages::slot_not_offered(language),
        ));
    }

    Ok(Some(slot))
}
