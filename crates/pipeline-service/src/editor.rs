//! Record editing orchestration
//!
//! Each mutation is one read-modify-write:
//! 1. `get` the current record from the store
//! 2. compute the payload locally with [`RecordUpdater`]
//! 3. a single `update` call
//! 4. fire-and-forget activity events
//!
//! Nothing is written before step 3, so dropping the future earlier leaves
//! the stored record as it was. A failed `update` returns the error and the
//! caller's last known-good copy stays valid.

use crate::collaborators::{ActionType, ActivityEvent, ActivityLog, RecordFilter, RecordStore};
use crate::config::PipelineConfig;
use crate::error::Result;
use pipeline_core::{
    Clock, HistoryEditSession, Record, RecordDraft, RecordId, RecordPatch, RecordUpdater,
    StepId, UpdateOutcome, UpdateRequest, ViewCalculator,
};
use pipeline_search::{RecordSnapshot, SearchIndex, Suggestion};
use std::sync::Arc;
use tracing::{info, warn};

/// History edit session bound to the record it was opened for
#[derive(Debug, Clone)]
pub struct RecordHistoryEdit {
    record_id: RecordId,
    session: HistoryEditSession,
}

impl RecordHistoryEdit {
    /// Record the session belongs to
    #[inline]
    #[must_use]
    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    #[inline]
    #[must_use]
    pub fn session(&self) -> &HistoryEditSession {
        &self.session
    }

    /// Stage edits through the underlying session
    #[inline]
    pub fn session_mut(&mut self) -> &mut HistoryEditSession {
        &mut self.session
    }
}

/// Applies record mutations against the store and reports activity
pub struct RecordEditor {
    store: Arc<dyn RecordStore>,
    activity: Arc<dyn ActivityLog>,
    clock: Arc<dyn Clock>,
    config: PipelineConfig,
    updater: RecordUpdater,
    views: ViewCalculator,
}

impl std::fmt::Debug for RecordEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordEditor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RecordEditor {
    /// Editor over the given collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        activity: Arc<dyn ActivityLog>,
        clock: Arc<dyn Clock>,
        config: PipelineConfig,
    ) -> Self {
        let views = config.view_calculator();
        Self {
            store,
            activity,
            clock,
            config,
            updater: RecordUpdater::new(),
            views,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// View calculator configured from [`PipelineConfig`]
    #[inline]
    #[must_use]
    pub fn views(&self) -> &ViewCalculator {
        &self.views
    }

    #[inline]
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Validate and persist a new record
    ///
    /// # Errors
    /// Validation failures, or the store's failure.
    pub async fn create(&self, draft: RecordDraft, actor: &str) -> Result<Record> {
        let actor = self.actor(actor);
        let fields = pipeline_core::NewRecord::from_draft(draft, actor)?;
        let record = self.store.create(fields).await?;

        info!(record = %record.id, kind = %record.kind, "record created");
        self.report(ActivityEvent::new(
            actor,
            ActionType::Created,
            record.label(),
            format!("{} created in {}", record.kind.label(), record.effective_stage()),
        ))
        .await;
        Ok(record)
    }

    /// Stage change, note, next step and owner change in one write
    ///
    /// # Errors
    /// `NotFound` if the record is gone, validation failures, or the store's
    /// failure on `update`.
    pub async fn apply_update(
        &self,
        id: &RecordId,
        request: &UpdateRequest,
        actor: &str,
    ) -> Result<Record> {
        let actor = self.actor(actor);
        let current = self.store.get(id).await?;
        let outcome = self
            .updater
            .apply_update(&current, request, self.clock.now())?;
        let updated = self.store.update(id, &outcome.patch).await?;

        info!(
            record = %id,
            stage = %updated.effective_stage(),
            history_appended = outcome.history_appended,
            "record updated"
        );
        for event in update_events(actor, &updated, &outcome) {
            self.report(event).await;
        }
        Ok(updated)
    }

    /// Mark one next step completed
    ///
    /// Completing an already-completed step returns the record unchanged
    /// without writing.
    ///
    /// # Errors
    /// `NotFound`, an unknown step id, or the store's failure.
    pub async fn complete_step(
        &self,
        id: &RecordId,
        step_id: &StepId,
        actor: &str,
    ) -> Result<Record> {
        let actor = self.actor(actor);
        let current = self.store.get(id).await?;
        let outcome = self
            .updater
            .complete_step(&current, step_id, self.clock.now())?;
        if outcome.completed_step.is_none() {
            return Ok(current);
        }

        let updated = self.store.update(id, &outcome.patch).await?;
        info!(record = %id, step = %step_id, "next step completed");
        let task = updated
            .next_steps
            .get(step_id)
            .map_or_else(|| step_id.to_string(), |step| step.task.clone());
        self.report(ActivityEvent::new(
            actor,
            ActionType::StepCompleted,
            updated.label(),
            task,
        ))
        .await;
        Ok(updated)
    }

    /// Start editing a record's history in place
    ///
    /// # Errors
    /// `NotFound`, or the store's failure.
    pub async fn open_history_edit(&self, id: &RecordId) -> Result<RecordHistoryEdit> {
        let record = self.store.get(id).await?;
        let fallback = record
            .origin()
            .unwrap_or_else(|| self.clock.now().date_naive());
        Ok(RecordHistoryEdit {
            record_id: record.id.clone(),
            session: HistoryEditSession::open(&record.notes, fallback),
        })
    }

    /// Write an edit session back if the history has not moved meanwhile
    ///
    /// # Errors
    /// `HistoryEdit(Stale)` when the notes changed since the session was
    /// opened, `NotFound`, or the store's failure.
    pub async fn commit_history_edit(&self, edit: RecordHistoryEdit, actor: &str) -> Result<Record> {
        let actor = self.actor(actor);
        let current = self.store.get(&edit.record_id).await?;
        if !edit.session.has_changes() {
            return Ok(current);
        }

        let entries = edit.session.entries().len();
        let notes = edit.session.commit(&current.notes)?;
        let patch = RecordPatch {
            notes: Some(notes),
            ..RecordPatch::default()
        };
        let updated = self.store.update(&edit.record_id, &patch).await?;

        info!(record = %edit.record_id, entries, "history edited");
        self.report(ActivityEvent::new(
            actor,
            ActionType::HistoryEdited,
            updated.label(),
            format!("{entries} history entries after edit"),
        ))
        .await;
        Ok(updated)
    }

    /// Delete a record
    ///
    /// # Errors
    /// `NotFound`, or the store's failure.
    pub async fn delete(&self, id: &RecordId, actor: &str) -> Result<()> {
        let actor = self.actor(actor);
        let record = self.store.get(id).await?;
        self.store.delete(id).await?;

        info!(record = %id, "record deleted");
        self.report(ActivityEvent::new(
            actor,
            ActionType::Deleted,
            record.label(),
            format!("{} deleted", record.kind.label()),
        ))
        .await;
        Ok(())
    }

    /// Read-only snapshot for search and drill-down
    ///
    /// # Errors
    /// The store's failure.
    pub async fn snapshot(&self, filter: &RecordFilter) -> Result<RecordSnapshot> {
        let records = self.store.list(filter).await?;
        Ok(RecordSnapshot::new(records))
    }

    /// Suggestions for a partial term, honoring the configured limits
    #[must_use]
    pub fn suggest(&self, index: &SearchIndex, term: &str) -> Vec<Suggestion> {
        if term.trim().chars().count() < self.config.min_suggestion_chars {
            return Vec::new();
        }
        index.suggest(term, self.config.suggestion_limit)
    }

    fn actor<'a>(&'a self, actor: &'a str) -> &'a str {
        let actor = actor.trim();
        if actor.is_empty() {
            &self.config.default_actor
        } else {
            actor
        }
    }

    async fn report(&self, event: ActivityEvent) {
        let action = event.action_type;
        if let Err(err) = self.activity.record(event).await {
            warn!(%action, error = %err, "activity log write failed");
        }
    }
}

fn update_events(actor: &str, updated: &Record, outcome: &UpdateOutcome) -> Vec<ActivityEvent> {
    let label = updated.label();
    let mut events = Vec::new();

    match &outcome.stage_change {
        Some(transition) => {
            let details = if updated.stage_detail.is_empty() {
                transition.to_string()
            } else {
                format!("{transition} ({})", updated.stage_detail)
            };
            events.push(ActivityEvent::new(actor, ActionType::StageChanged, label, details));
        }
        None if outcome.history_appended => {
            events.push(ActivityEvent::new(actor, ActionType::Updated, label, "note added"));
        }
        None if outcome.owner_change.is_none() && outcome.added_step.is_none() => {
            events.push(ActivityEvent::new(
                actor,
                ActionType::Updated,
                label,
                format!("stage detail set to '{}'", updated.stage_detail),
            ));
        }
        None => {}
    }

    if let Some((from, to)) = &outcome.owner_change {
        events.push(ActivityEvent::new(
            actor,
            ActionType::OwnerChanged,
            label,
            format!("owner: {from} → {to}"),
        ));
    }

    if let Some(step) = outcome
        .added_step
        .as_ref()
        .and_then(|id| updated.next_steps.get(id))
    {
        events.push(ActivityEvent::new(
            actor,
            ActionType::StepAdded,
            label,
            step.task.clone(),
        ));
    }

    events
}
