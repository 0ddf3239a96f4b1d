//! Error types for Pipeline Core
//!
//! Two families live here:
//! - Validation failures raised before anything is encoded
//! - History edit refusals raised when an edit session can no longer be
//!   applied safely
//!
//! Decode problems (malformed `next_steps` or tag JSON) are not errors at
//! all: they are recovered locally with an empty sequence.

use crate::next_steps::StepId;
use crate::types::RecordKind;

/// Validation failure for a requested mutation
///
/// Raised before any encoding happens, so the record is never touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Stage is not part of the pipeline's stage set
    #[error("unknown stage '{stage}' for {kind}")]
    UnknownStage { kind: RecordKind, stage: String },

    /// Stage declares detail options but none was given
    #[error("stage '{stage}' requires a detail (one of: {options})")]
    MissingStageDetail { stage: String, options: String },

    /// Detail is not one of the stage's options
    #[error("'{detail}' is not a valid detail for stage '{stage}'")]
    InvalidStageDetail { stage: String, detail: String },

    /// Stage has no detail options but a detail was given
    #[error("stage '{stage}' does not take a detail (got '{detail}')")]
    UnexpectedStageDetail { stage: String, detail: String },

    /// Required field missing or blank
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// Request would not change the record
    #[error("no changes requested")]
    NothingToApply,

    /// Next step id not present on the record
    #[error("next step not found: {0}")]
    UnknownStep(StepId),

    /// Note text holds a date marker that would split the entry on decode
    #[error("note contains a history date marker '{marker}'")]
    NoteContainsMarker { marker: String },

    /// Note's first line would decode as a stage change that never happened
    #[error("note starts with a stage change line: '{line}'")]
    NoteStartsWithStageLine { line: String },
}

impl ValidationError {
    /// Name of the field the error should be displayed next to
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::UnknownStage { .. } => "stage",
            Self::MissingStageDetail { .. }
            | Self::InvalidStageDetail { .. }
            | Self::UnexpectedStageDetail { .. } => "stage_detail",
            Self::MissingField { field } => field,
            Self::NothingToApply
            | Self::NoteContainsMarker { .. }
            | Self::NoteStartsWithStageLine { .. } => "notes",
            Self::UnknownStep(_) => "next_steps",
        }
    }
}

/// Refusal to apply a history edit session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryEditError {
    /// Notes changed since the session was opened
    #[error("history changed since edit began (expected {expected}, found {actual})")]
    Stale { expected: String, actual: String },

    /// Synthetic index outside the decoded sequence
    #[error("no history entry at position {index} (entries: {len})")]
    NoSuchEntry { index: usize, len: usize },

    /// Edit would leave an entry with nothing in it
    #[error("history entry at position {index} would be empty")]
    EmptyContent { index: usize },

    /// Edited content would not decode back as the same entry
    #[error("history entry at position {index}: {source}")]
    InvalidContent {
        index: usize,
        source: ValidationError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display() {
        let err = ValidationError::MissingStageDetail {
            stage: "Close Loss".to_string(),
            options: "Budget Cut, Other".to_string(),
        };
        assert!(err.to_string().contains("requires a detail"));
        assert_eq!(err.field(), "stage_detail");
    }

    #[test]
    fn missing_field_points_at_field() {
        let err = ValidationError::MissingField { field: "owner" };
        assert_eq!(err.field(), "owner");
        assert_eq!(err.to_string(), "owner is required");
    }

    #[test]
    fn note_syntax_errors_point_at_notes() {
        let err = ValidationError::NoteContainsMarker {
            marker: "[1/15/2024]".to_string(),
        };
        assert_eq!(err.field(), "notes");
        assert!(err.to_string().contains("[1/15/2024]"));
    }

    #[test]
    fn stale_edit_display() {
        let err = HistoryEditError::Stale {
            expected: "abc".to_string(),
            actual: "def".to_string(),
        };
        assert!(err.to_string().contains("history changed"));
    }
}
