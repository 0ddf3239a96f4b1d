//! Explicit read-only record snapshot
//!
//! Screens that drill down from a list into one record receive the same
//! snapshot the list was rendered from instead of reaching for shared state.

use pipeline_core::{Record, RecordId};
use std::sync::Arc;

/// Immutable list of records in the order they were fetched
#[derive(Debug, Clone, Default)]
pub struct RecordSnapshot {
    records: Arc<[Record]>,
}

impl RecordSnapshot {
    /// Freeze a list of records
    #[must_use]
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into(),
        }
    }

    /// All records, input order
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Record by id
    #[must_use]
    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|record| &record.id == id)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }
}

impl From<Vec<Record>> for RecordSnapshot {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

impl FromIterator<Record> for RecordSnapshot {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
