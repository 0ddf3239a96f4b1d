//! Pipeline Search
//!
//! Read-only search over an explicit snapshot of records.
//!
//! # Core Concepts
//!
//! - [`RecordSnapshot`]: immutable, cheaply cloned list of records handed to
//!   search and drill-down views
//! - [`SearchQuery`]: ANDed predicates (term, date range, stage, owner, tags)
//! - [`SearchIndex`]: precomputed lowercase haystacks, search and suggestions
//!
//! # Example
//!
//! ```rust
//! use pipeline_core::{Record, RecordKind};
//! use pipeline_search::{RecordSnapshot, SearchIndex, SearchQuery};
//!
//! let snapshot = RecordSnapshot::new(vec![
//!     Record::new("r1", RecordKind::Lead, "Acme", "dana"),
//!     Record::new("r2", RecordKind::Lead, "Beta", "lee"),
//! ]);
//! let index = SearchIndex::new(snapshot);
//! let hits = index.search(&SearchQuery::new().with_owner("lee"));
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].name, "Beta");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod index;
pub mod query;
pub mod snapshot;

pub use index::{sorted_by_recent, MatchedField, SearchIndex, Suggestion};
pub use query::{DateRange, SearchQuery};
pub use snapshot::RecordSnapshot;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
