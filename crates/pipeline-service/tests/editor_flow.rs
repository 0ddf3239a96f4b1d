//! End-to-end editing flows against the in-memory collaborators

use chrono::Duration;
use pipeline_core::{
    Record, RecordDraft, RecordKind, SeverityBand, StepId, UpdateRequest, ValidationError,
};
use pipeline_service::{
    ActionType, InMemoryActivityLog, InMemoryRecordStore, PipelineConfig, PipelineError,
    RecordEditor, RecordFilter, RecordStore,
};
use pipeline_search::{SearchIndex, SearchQuery};
use pipeline_test_utils::{date, lead, search_sample, FixedClock};
use pretty_assertions::assert_eq;
use std::sync::Arc;

struct Harness {
    clock: Arc<FixedClock>,
    store: Arc<InMemoryRecordStore>,
    log: Arc<InMemoryActivityLog>,
    editor: RecordEditor,
}

fn harness(records: Vec<Record>) -> Harness {
    let clock = Arc::new(FixedClock::at_noon(2024, 1, 10));
    let store = Arc::new(InMemoryRecordStore::with_records(records, clock.clone()));
    let log = Arc::new(InMemoryActivityLog::new());
    let editor = RecordEditor::new(
        store.clone(),
        log.clone(),
        clock.clone(),
        PipelineConfig::default(),
    );
    Harness {
        clock,
        store,
        log,
        editor,
    }
}

fn acme() -> Record {
    let mut record = lead("lead-1", "Acme", "dana", date(2024, 1, 2));
    record.notes = "[01/05/2024] Called, no answer".to_string();
    record
}

fn actions(log: &InMemoryActivityLog) -> Vec<ActionType> {
    log.events().iter().map(|e| e.action_type).collect()
}

#[tokio::test]
async fn stage_change_with_note_and_step() {
    let h = harness(vec![acme()]);
    let id = acme().id;

    let request = UpdateRequest::new(date(2024, 1, 10))
        .with_stage("Active Lead")
        .with_note("She's interested")
        .with_step("Send resources");
    let updated = h.editor.apply_update(&id, &request, "dana").await.unwrap();

    assert_eq!(
        updated.notes,
        "[01/05/2024] Called, no answer\n\n[01/10/2024] Stage: Initial Outreach → Active Lead\nShe's interested"
    );
    assert_eq!(updated.stage, "Active Lead");
    assert_eq!(updated.next_steps.pending_count(), 1);
    assert_eq!(h.store.get(&id).await.unwrap(), updated);
    assert_eq!(
        actions(&h.log),
        vec![ActionType::StageChanged, ActionType::StepAdded]
    );
}

#[tokio::test]
async fn owner_change_is_reported_separately() {
    let h = harness(vec![acme()]);
    let request = UpdateRequest::new(date(2024, 1, 10))
        .with_note("Handing over")
        .with_owner("lee");
    let updated = h.editor.apply_update(&acme().id, &request, "dana").await.unwrap();

    assert_eq!(updated.owner, "lee");
    assert_eq!(updated.creator, "dana");
    assert_eq!(
        actions(&h.log),
        vec![ActionType::Updated, ActionType::OwnerChanged]
    );
}

#[tokio::test]
async fn close_loss_requires_detail() {
    let h = harness(vec![acme()]);
    let request = UpdateRequest::new(date(2024, 1, 10)).with_stage("Close Loss");

    let err = h.editor.apply_update(&acme().id, &request, "dana").await.unwrap_err();
    assert_eq!(err.field(), Some("stage_detail"));
    assert!(matches!(
        err,
        PipelineError::Validation(ValidationError::MissingStageDetail { .. })
    ));
    assert_eq!(h.store.get(&acme().id).await.unwrap(), acme());
    assert!(h.log.events().is_empty());
}

#[tokio::test]
async fn note_with_date_marker_is_refused() {
    let h = harness(vec![acme()]);
    let request = UpdateRequest::new(date(2024, 1, 10))
        .with_note("Agreed to meet on [1/15/2024] at their office");

    let err = h.editor.apply_update(&acme().id, &request, "dana").await.unwrap_err();
    assert_eq!(err.field(), Some("notes"));
    assert!(matches!(
        err,
        PipelineError::Validation(ValidationError::NoteContainsMarker { .. })
    ));
    assert_eq!(h.store.get(&acme().id).await.unwrap(), acme());
    assert!(h.log.events().is_empty());
}

#[tokio::test]
async fn persistence_failure_leaves_record_untouched() {
    let h = harness(vec![acme()]);
    h.store.fail_next_update();

    let request = UpdateRequest::new(date(2024, 1, 10)).with_note("Left voicemail");
    let err = h.editor.apply_update(&acme().id, &request, "dana").await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(h.store.get(&acme().id).await.unwrap().notes, acme().notes);
    assert!(h.log.events().is_empty());
}

#[tokio::test]
async fn missing_record_is_terminal() {
    let h = harness(Vec::new());
    let request = UpdateRequest::new(date(2024, 1, 10)).with_note("hello");
    let err = h.editor.apply_update(&acme().id, &request, "dana").await.unwrap_err();
    assert!(err.is_terminal());
}

#[tokio::test]
async fn activity_log_failure_is_swallowed() {
    let h = harness(vec![acme()]);
    h.log.set_failing(true);

    let request = UpdateRequest::new(date(2024, 1, 10)).with_note("Sent deck");
    let updated = h.editor.apply_update(&acme().id, &request, "dana").await.unwrap();
    assert!(updated.notes.ends_with("[01/10/2024] Sent deck"));
}

#[tokio::test]
async fn complete_step_then_again() {
    let h = harness(vec![acme()]);
    let id = acme().id;
    let request = UpdateRequest::new(date(2024, 1, 10)).with_step("Send resources");
    let updated = h.editor.apply_update(&id, &request, "dana").await.unwrap();
    let step_id = updated.next_steps.iter().next().unwrap().id.clone();

    h.clock.advance(Duration::days(2));
    let completed = h.editor.complete_step(&id, &step_id, "dana").await.unwrap();
    let step = completed.next_steps.get(&step_id).unwrap();
    assert!(step.completed);
    assert_eq!(step.completed_at, Some(h.clock_now()));

    let again = h.editor.complete_step(&id, &step_id, "dana").await.unwrap();
    assert_eq!(again, completed);
    assert_eq!(
        actions(&h.log),
        vec![ActionType::StepAdded, ActionType::StepCompleted]
    );

    let unknown = h
        .editor
        .complete_step(&id, &StepId::new("nope"), "dana")
        .await
        .unwrap_err();
    assert_eq!(unknown.field(), Some("next_steps"));
}

impl Harness {
    fn clock_now(&self) -> chrono::DateTime<chrono::Utc> {
        pipeline_core::Clock::now(self.clock.as_ref())
    }
}

#[tokio::test]
async fn step_age_bands_follow_the_clock() {
    let h = harness(vec![acme()]);
    let request = UpdateRequest::new(date(2024, 1, 10)).with_step("Follow up");
    let updated = h.editor.apply_update(&acme().id, &request, "dana").await.unwrap();
    let step = updated.next_steps.iter().next().unwrap().clone();

    h.clock.advance(Duration::days(8));
    let badge = h.editor.views().age_band(&step, h.clock_now());
    assert_eq!(badge.days, 8);
    assert_eq!(badge.band, SeverityBand::High);
}

#[tokio::test]
async fn history_edit_commits_when_unchanged_underneath() {
    let h = harness(vec![acme()]);
    let mut edit = h.editor.open_history_edit(&acme().id).await.unwrap();
    edit.session_mut()
        .edit(0, "Left voicemail", Some(date(2024, 1, 6)))
        .unwrap();

    let updated = h.editor.commit_history_edit(edit, "dana").await.unwrap();
    assert_eq!(updated.notes, "[01/06/2024] Left voicemail");
    assert_eq!(actions(&h.log), vec![ActionType::HistoryEdited]);
}

#[tokio::test]
async fn history_edit_refused_after_concurrent_append() {
    let h = harness(vec![acme()]);
    let mut edit = h.editor.open_history_edit(&acme().id).await.unwrap();
    edit.session_mut().remove(0).unwrap();

    let request = UpdateRequest::new(date(2024, 1, 10)).with_note("Sent deck");
    h.editor.apply_update(&acme().id, &request, "lee").await.unwrap();

    let err = h.editor.commit_history_edit(edit, "dana").await.unwrap_err();
    assert!(matches!(err, PipelineError::HistoryEdit(_)));
    assert!(h.store.get(&acme().id).await.unwrap().notes.contains("Sent deck"));
}

#[tokio::test]
async fn create_and_delete() {
    let h = harness(Vec::new());
    let record = h
        .editor
        .create(RecordDraft::new(RecordKind::JobPosting, "Data Analyst", ""), "  ")
        .await
        .unwrap();
    assert_eq!(record.owner, "system");
    assert_eq!(record.stage, "Open");
    assert!(record.notes.is_empty());

    let timeline = h.editor.views().timeline(&record, date(2024, 1, 10));
    assert!(timeline[0].is_placeholder());
    assert_eq!(timeline[0].entry.content, "Record created");

    h.editor.delete(&record.id, "dana").await.unwrap();
    assert!(h.editor.delete(&record.id, "dana").await.unwrap_err().is_terminal());
    assert_eq!(actions(&h.log), vec![ActionType::Created, ActionType::Deleted]);
}

#[tokio::test]
async fn snapshot_feeds_search_and_suggestions() {
    let h = harness(search_sample());
    let snapshot = h
        .editor
        .snapshot(&RecordFilter::all().with_owner("dana"))
        .await
        .unwrap();
    assert_eq!(snapshot.len(), 2);

    let index = SearchIndex::new(snapshot);
    let hits = index.search(&SearchQuery::new().with_sector("Healthcare"));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Gamma LLC");

    assert!(h.editor.suggest(&index, "g").is_empty());
    let suggestions = h.editor.suggest(&index, "ga");
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].record_id.as_str(), "r3");
}
