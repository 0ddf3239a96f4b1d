//! Error types for the record editing service
//!
//! Maps collaborator failures onto the four outcomes a caller has to handle:
//! - Validation: shown next to the offending field, record untouched
//! - NotFound: terminal for the editing session
//! - Persistence: transient and dismissible; the caller keeps its last
//!   known-good state
//! - HistoryEdit: the edit session went stale or was malformed

use crate::collaborators::StoreError;
use crate::config::ConfigError;
use pipeline_core::{HistoryEditError, RecordId, ValidationError};

/// Result alias for service operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main service error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Request failed validation
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Record no longer exists
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Persistence call failed
    #[error("persistence failed: {0}")]
    Persistence(StoreError),

    /// History edit session refused
    #[error("history edit refused: {0}")]
    HistoryEdit(#[from] HistoryEditError),

    /// Bad configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Persistence(other),
        }
    }
}

impl PipelineError {
    /// Worth re-triggering by the user (nothing retries automatically)
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Persistence(StoreError::Unavailable(_))
                | Self::HistoryEdit(HistoryEditError::Stale { .. })
        )
    }

    /// Ends the editing session for this record
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Meant to be shown to the person editing rather than an operator
    #[inline]
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Config(_))
    }

    /// Field a validation failure belongs to
    #[must_use]
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation(err)
            | Self::HistoryEdit(HistoryEditError::InvalidContent { source: err, .. }) => {
                Some(err.field())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_is_terminal() {
        let err = PipelineError::from(StoreError::NotFound(RecordId::new("r1")));
        assert!(err.is_terminal());
        assert!(!err.is_transient());
    }

    #[test]
    fn unavailable_store_is_transient() {
        let err = PipelineError::from(StoreError::Unavailable("timeout".to_string()));
        assert!(err.is_transient());
        assert!(err.is_user_facing());
        assert!(err.field().is_none());
    }

    #[test]
    fn rejected_write_is_neither() {
        let err = PipelineError::from(StoreError::Rejected("schema".to_string()));
        assert!(!err.is_transient());
        assert!(!err.is_terminal());
    }

    #[test]
    fn validation_points_at_field() {
        let err = PipelineError::from(ValidationError::MissingField { field: "name" });
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn rejected_history_content_points_at_notes() {
        let err = PipelineError::from(HistoryEditError::InvalidContent {
            index: 0,
            source: ValidationError::NoteStartsWithStageLine {
                line: "Stage: A → B".to_string(),
            },
        });
        assert_eq!(err.field(), Some("notes"));
        assert!(!err.is_transient());
    }
}
