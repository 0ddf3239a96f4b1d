//! External collaborator seams
//!
//! Persistence and the activity log live outside this workspace. They are
//! reached through the two traits here so the editor can run against the
//! in-memory implementations in tests and against a real backend elsewhere.

use async_trait::async_trait;
use pipeline_core::{NewRecord, Record, RecordId, RecordKind, RecordPatch};
use serde::{Deserialize, Serialize};

/// Failure reported by a [`RecordStore`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Record does not exist (or no longer exists)
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Backend could not be reached or timed out
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the write
    #[error("store rejected the write: {0}")]
    Rejected(String),
}

/// Narrowing for [`RecordStore::list`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub kind: Option<RecordKind>,
    pub owner: Option<String>,
}

impl RecordFilter {
    /// Filter matching every record
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Whether `record` passes the filter
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.kind.map_or(true, |kind| record.kind == kind)
            && self.owner.as_deref().map_or(true, |owner| record.owner == owner)
    }
}

/// Persistence collaborator
///
/// `update` merges: patch fields left `None` keep their stored values.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch one record
    async fn get(&self, id: &RecordId) -> Result<Record, StoreError>;

    /// Records passing `filter`, in store order
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<Record>, StoreError>;

    /// Persist a new record; the store assigns id and timestamps
    async fn create(&self, fields: NewRecord) -> Result<Record, StoreError>;

    /// Merge `patch` into a record and return the stored result
    async fn update(&self, id: &RecordId, patch: &RecordPatch) -> Result<Record, StoreError>;

    /// Remove a record
    async fn delete(&self, id: &RecordId) -> Result<(), StoreError>;
}

/// Kind of activity reported to the activity log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Created,
    Updated,
    StageChanged,
    OwnerChanged,
    StepAdded,
    StepCompleted,
    HistoryEdited,
    Deleted,
}

impl ActionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::StageChanged => "stage_changed",
            Self::OwnerChanged => "owner_changed",
            Self::StepAdded => "step_added",
            Self::StepCompleted => "step_completed",
            Self::HistoryEdited => "history_edited",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One activity-feed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub actor: String,
    pub action_type: ActionType,
    /// Human label of the record acted on
    pub entity_label: String,
    pub details: String,
}

impl ActivityEvent {
    #[must_use]
    pub fn new(
        actor: impl Into<String>,
        action_type: ActionType,
        entity_label: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            action_type,
            entity_label: entity_label.into(),
            details: details.into(),
        }
    }
}

/// Activity log write failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("activity log write failed: {0}")]
pub struct ActivityLogError(pub String);

/// Activity-log collaborator; callers treat it as fire-and-forget
#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Record one event
    async fn record(&self, event: ActivityEvent) -> Result<(), ActivityLogError>;
}
