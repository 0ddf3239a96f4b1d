//! Record updater
//!
//! The single place that mutates stage, history and next steps together,
//! so the history log and the step list stay consistent with each other.
//! The updater only computes the payload; submitting it to persistence and
//! reporting activity is the caller's job.
//!
//! # Workflow
//! 1. Resolve the effective stage (unchanged unless a new one is given)
//! 2. Validate stage membership, stage detail, owner and note text; nothing
//!    is encoded if validation fails
//! 3. Append a history entry dated with the request's reference date,
//!    carrying the stage transition when the stage changed
//! 4. Add the requested next step
//! 5. Return a payload holding only the fields that changed
//!
//! Fields left out of the payload are never rewritten, so a `next_steps`
//! value that only partly decodes survives any update that adds no step.

use crate::error::ValidationError;
use crate::history::{self, HistoryEntry, StageTransition};
use crate::next_steps::StepId;
use crate::types::{Record, RecordPatch};
use chrono::{DateTime, NaiveDate, Utc};

/// Requested change to one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Target stage; `None` keeps the current one
    pub new_stage: Option<String>,
    /// Stage detail; `None` keeps the current detail unless the stage changes
    pub stage_detail: Option<String>,
    /// Free-text note for the history entry
    pub note: String,
    /// Next step to add
    pub new_step: Option<String>,
    /// New owner
    pub new_owner: Option<String>,
    /// Date the interaction happened (may be in the past)
    pub reference_date: NaiveDate,
}

impl UpdateRequest {
    /// Empty request dated `reference_date`
    #[inline]
    #[must_use]
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            new_stage: None,
            stage_detail: None,
            note: String::new(),
            new_step: None,
            new_owner: None,
            reference_date,
        }
    }

    /// With target stage
    #[inline]
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.new_stage = Some(stage.into());
        self
    }

    /// With stage detail
    #[inline]
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.stage_detail = Some(detail.into());
        self
    }

    /// With history note
    #[inline]
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// With next step
    #[inline]
    #[must_use]
    pub fn with_step(mut self, task: impl Into<String>) -> Self {
        self.new_step = Some(task.into());
        self
    }

    /// With new owner
    #[inline]
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.new_owner = Some(owner.into());
        self
    }
}

/// Payload plus the facts the caller reports as activity
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// Fields to submit to persistence
    pub patch: RecordPatch,
    /// Stage change, if any
    pub stage_change: Option<StageTransition>,
    /// Previous and new owner, if ownership moved
    pub owner_change: Option<(String, String)>,
    /// Whether a history entry was appended
    pub history_appended: bool,
    /// Step added by this update
    pub added_step: Option<StepId>,
    /// Step completed by this update
    pub completed_step: Option<StepId>,
}

impl UpdateOutcome {
    fn new(patch: RecordPatch) -> Self {
        Self {
            patch,
            stage_change: None,
            owner_change: None,
            history_appended: false,
            added_step: None,
            completed_step: None,
        }
    }
}

/// Computes record payloads for stage/notes/next-step mutations
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordUpdater;

impl RecordUpdater {
    /// Create new updater
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Stage change, note, next step and owner in one update
    ///
    /// # Errors
    /// Any [`ValidationError`]; the record is left untouched.
    pub fn apply_update(
        &self,
        record: &Record,
        request: &UpdateRequest,
        now: DateTime<Utc>,
    ) -> Result<UpdateOutcome, ValidationError> {
        let model = record.kind.stage_model();
        let current_stage = record.effective_stage();

        let target_stage = request
            .new_stage
            .as_deref()
            .map(str::trim)
            .filter(|stage| !stage.is_empty());
        if let Some(stage) = target_stage {
            if !model.is_member(stage) {
                return Err(ValidationError::UnknownStage {
                    kind: record.kind,
                    stage: stage.to_string(),
                });
            }
        }
        let stage = target_stage.unwrap_or(current_stage);
        let stage_changed = stage != current_stage;

        let detail = match request.stage_detail.as_deref() {
            Some(detail) => detail.trim(),
            None if stage_changed => "",
            None => record.stage_detail.as_str(),
        };
        if stage_changed || request.stage_detail.is_some() {
            model.validate_detail(stage, detail)?;
        }

        let owner_change = match request.new_owner.as_deref().map(str::trim) {
            Some("") => return Err(ValidationError::MissingField { field: "owner" }),
            Some(owner) if owner != record.owner => Some((record.owner.clone(), owner.to_string())),
            _ => None,
        };

        let note = request.note.trim();
        let step_task = request
            .new_step
            .as_deref()
            .map(str::trim)
            .filter(|task| !task.is_empty());
        let detail_changed = detail != record.stage_detail;

        if !stage_changed
            && !detail_changed
            && note.is_empty()
            && step_task.is_none()
            && owner_change.is_none()
        {
            return Err(ValidationError::NothingToApply);
        }
        if !note.is_empty() {
            history::check_content(note, stage_changed)?;
        }

        // everything below is infallible
        let transition =
            stage_changed.then(|| StageTransition::new(current_stage, stage));

        let history_appended = stage_changed || !note.is_empty();
        let notes = history_appended.then(|| {
            let mut entry = HistoryEntry::new(request.reference_date, note);
            entry.stage_transition = transition.clone();
            let fallback = record.origin().unwrap_or(request.reference_date);
            history::append(&record.notes, entry, fallback)
        });

        let mut steps = record.next_steps.clone();
        let added_step = step_task.and_then(|task| steps.add(task, now));

        let patch = RecordPatch {
            stage: stage_changed.then(|| stage.to_string()),
            stage_detail: (stage_changed || detail_changed).then(|| detail.to_string()),
            owner: owner_change.as_ref().map(|(_, to)| to.clone()),
            notes,
            next_steps: added_step.is_some().then_some(steps),
            ..RecordPatch::default()
        };

        tracing::debug!(
            record = %record.id,
            stage_changed,
            history_appended,
            step_added = added_step.is_some(),
            "computed record update"
        );

        Ok(UpdateOutcome {
            stage_change: transition,
            owner_change,
            history_appended,
            added_step,
            ..UpdateOutcome::new(patch)
        })
    }

    /// Complete one next step
    ///
    /// Completing an already-completed step succeeds without changing it.
    ///
    /// # Errors
    /// [`ValidationError::UnknownStep`] when the id is not on the record.
    pub fn complete_step(
        &self,
        record: &Record,
        step_id: &StepId,
        now: DateTime<Utc>,
    ) -> Result<UpdateOutcome, ValidationError> {
        if record.next_steps.get(step_id).is_none() {
            return Err(ValidationError::UnknownStep(step_id.clone()));
        }

        let mut steps = record.next_steps.clone();
        let transitioned = steps.complete(step_id, now);

        let patch = RecordPatch {
            next_steps: Some(steps),
            ..RecordPatch::default()
        };
        Ok(UpdateOutcome {
            completed_step: transitioned.then(|| step_id.clone()),
            ..UpdateOutcome::new(patch)
        })
    }
}
