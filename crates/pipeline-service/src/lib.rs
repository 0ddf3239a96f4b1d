//! Pipeline Service
//!
//! Record editing on top of [`pipeline_core`]: the persistence and
//! activity-log seams, their in-memory implementations, configuration and
//! the [`RecordEditor`] that ties them together.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pipeline_core::{RecordDraft, RecordKind, SystemClock};
//! use pipeline_service::{InMemoryActivityLog, InMemoryRecordStore, PipelineConfig, RecordEditor};
//!
//! # tokio_test_block_on(async {
//! let clock = Arc::new(SystemClock);
//! let editor = RecordEditor::new(
//!     Arc::new(InMemoryRecordStore::new(clock.clone())),
//!     Arc::new(InMemoryActivityLog::new()),
//!     clock,
//!     PipelineConfig::default(),
//! );
//! let record = editor
//!     .create(RecordDraft::new(RecordKind::Lead, "Acme", ""), "dana")
//!     .await
//!     .unwrap();
//! assert_eq!(record.owner, "dana");
//! assert_eq!(record.stage, "Initial Outreach");
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod collaborators;
pub mod config;
pub mod editor;
pub mod error;
pub mod memory;

pub use collaborators::{
    ActionType, ActivityEvent, ActivityLog, ActivityLogError, RecordFilter, RecordStore,
    StoreError,
};
pub use config::{ConfigError, PipelineConfig};
pub use editor::{RecordEditor, RecordHistoryEdit};
pub use error::{PipelineError, Result};
pub use memory::{InMemoryActivityLog, InMemoryRecordStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
