//! Pipeline Core
//!
//! Timeline and stage tracking for leads and job postings.
//!
//! # Core Concepts
//!
//! - [`Record`]: a lead or job posting moving through a stage pipeline
//! - [`StageModel`]: the closed stage set of a pipeline and its detail options
//! - [`history`]: the dated update log kept inside a record's `notes` text
//! - [`NextSteps`]: completable action items kept in `next_steps`
//! - [`RecordUpdater`]: computes the persisted payload for one mutation
//! - [`ViewCalculator`]: read-only presentation facts (badges, time-ago, timeline)
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use pipeline_core::history::{self, HistoryEntry};
//!
//! let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
//! let notes = history::append("", HistoryEntry::new(day, "Called, no answer"), day);
//! assert_eq!(notes, "[01/05/2024] Called, no answer");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod clock;
pub mod error;
pub mod history;
pub mod next_steps;
pub mod stage;
pub mod types;
pub mod updater;
pub mod views;

// Re-exports
pub use clock::{Clock, SystemClock};
pub use error::{HistoryEditError, ValidationError};
pub use history::{HistoryEditSession, HistoryEntry, StageTransition};
pub use next_steps::{AgeThresholds, NextStep, NextSteps, SeverityBand, StepId};
pub use stage::{StageDef, StageModel};
pub use types::{NewRecord, Record, RecordDraft, RecordId, RecordKind, RecordPatch, TagSet};
pub use updater::{RecordUpdater, UpdateOutcome, UpdateRequest};
pub use views::{AgeBadge, PendingBadge, TimelineEntry, ViewCalculator};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with pipeline records
    pub use crate::{
        Clock, HistoryEntry, NextSteps, Record, RecordId, RecordKind, RecordPatch, RecordUpdater,
        SeverityBand, StageModel, UpdateRequest, ViewCalculator,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
