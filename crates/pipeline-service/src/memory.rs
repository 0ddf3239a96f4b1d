//! In-memory collaborators
//!
//! Back the CLI's JSON file and the tests. The store keeps insertion order
//! and applies patches with the same merge semantics a remote backend has.

use crate::collaborators::{
    ActivityEvent, ActivityLog, ActivityLogError, RecordFilter, RecordStore, StoreError,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use pipeline_core::{Clock, NewRecord, Record, RecordId, RecordPatch};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Record store held in process memory
#[derive(Debug)]
pub struct InMemoryRecordStore {
    records: RwLock<IndexMap<RecordId, Record>>,
    clock: Arc<dyn Clock>,
    fail_next_update: AtomicBool,
}

impl InMemoryRecordStore {
    /// Empty store
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_records(Vec::new(), clock)
    }

    /// Store seeded with existing records, order kept
    ///
    /// A later record with a duplicate id replaces the earlier one.
    #[must_use]
    pub fn with_records(records: Vec<Record>, clock: Arc<dyn Clock>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            records: RwLock::new(records),
            clock,
            fail_next_update: AtomicBool::new(false),
        }
    }

    /// Copy of all records in insertion order
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.records.read().values().cloned().collect()
    }

    /// Make the next `update` fail with [`StoreError::Unavailable`]
    pub fn fail_next_update(&self) {
        self.fail_next_update.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, id: &RecordId) -> Result<Record, StoreError> {
        self.records
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn create(&self, fields: NewRecord) -> Result<Record, StoreError> {
        let id = RecordId::new(Uuid::new_v4().to_string());
        let record = fields.into_record(id.clone(), self.clock.now());
        self.records.write().insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: &RecordId, patch: &RecordPatch) -> Result<Record, StoreError> {
        if self.fail_next_update.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected update failure".to_string()));
        }

        let mut records = self.records.write();
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        patch.apply_to(record);
        record.updated_at = Some(self.clock.now());
        Ok(record.clone())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        self.records
            .write()
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

/// Activity log that keeps events in memory
#[derive(Debug, Default)]
pub struct InMemoryActivityLog {
    events: Mutex<Vec<ActivityEvent>>,
    failing: AtomicBool,
}

impl InMemoryActivityLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.lock().clone()
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ActivityLog for InMemoryActivityLog {
    async fn record(&self, event: ActivityEvent) -> Result<(), ActivityLogError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ActivityLogError("activity log offline".to_string()));
        }
        self.events.lock().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::{RecordDraft, RecordKind, SystemClock};
    use pretty_assertions::assert_eq;

    fn store() -> InMemoryRecordStore {
        InMemoryRecordStore::new(Arc::new(SystemClock))
    }

    fn draft(name: &str) -> NewRecord {
        NewRecord::from_draft(RecordDraft::new(RecordKind::Lead, name, "dana"), "dana").unwrap()
    }

    #[tokio::test]
    async fn create_assigns_identity_and_timestamps() {
        let store = store();
        let record = store.create(draft("Acme")).await.unwrap();
        assert!(!record.id.as_str().is_empty());
        assert!(record.created_at.is_some());
        assert_eq!(store.get(&record.id).await.unwrap(), record);
    }

    #[tokio::test]
    async fn update_merges_patch() {
        let store = store();
        let record = store.create(draft("Acme")).await.unwrap();

        let patch = RecordPatch {
            notes: Some("[01/05/2024] Called".to_string()),
            ..RecordPatch::default()
        };
        let updated = store.update(&record.id, &patch).await.unwrap();
        assert_eq!(updated.notes, "[01/05/2024] Called");
        assert_eq!(updated.name, "Acme");
        assert_eq!(updated.creator, "dana");
    }

    #[tokio::test]
    async fn injected_failure_hits_once() {
        let store = store();
        let record = store.create(draft("Acme")).await.unwrap();
        store.fail_next_update();

        let patch = RecordPatch {
            name: Some("Acme Inc".to_string()),
            ..RecordPatch::default()
        };
        assert!(matches!(
            store.update(&record.id, &patch).await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.get(&record.id).await.unwrap().name, "Acme");
        assert!(store.update(&record.id, &patch).await.is_ok());
    }

    #[tokio::test]
    async fn delete_keeps_order_of_the_rest() {
        let store = store();
        let a = store.create(draft("A")).await.unwrap();
        let b = store.create(draft("B")).await.unwrap();
        let c = store.create(draft("C")).await.unwrap();

        store.delete(&b.id).await.unwrap();
        let names: Vec<_> = store.records().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(store.delete(&b.id).await, Err(StoreError::NotFound(b.id.clone())));
        assert!(store.get(&a.id).await.is_ok() && store.get(&c.id).await.is_ok());
    }

    #[tokio::test]
    async fn activity_log_can_fail() {
        let log = InMemoryActivityLog::new();
        let event = ActivityEvent::new("dana", crate::ActionType::Created, "Acme", "");
        log.record(event.clone()).await.unwrap();
        log.set_failing(true);
        assert!(log.record(event).await.is_err());
        assert_eq!(log.events().len(), 1);
    }
}
