//! Subcommand execution

use crate::store_file;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::ArgMatches;
use pipeline_core::history;
use pipeline_core::views::time_ago;
use pipeline_core::{Clock, Record, RecordId, StepId, SystemClock, UpdateRequest};
use pipeline_search::{sorted_by_recent, RecordSnapshot, SearchIndex, SearchQuery};
use pipeline_service::{
    InMemoryActivityLog, InMemoryRecordStore, PipelineConfig, RecordEditor, RecordFilter,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Run the parsed command line, writing human output to `out`
///
/// Mutating commands write the record file back on success.
///
/// # Errors
/// Unreadable files, bad arguments, or a failed operation.
pub async fn run(matches: &ArgMatches, out: &mut dyn Write) -> Result<()> {
    let store_path = matches
        .get_one::<PathBuf>("store")
        .context("--store is required")?;
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryRecordStore::with_records(
        store_file::load(store_path)?,
        clock.clone(),
    ));
    let activity = Arc::new(InMemoryActivityLog::new());
    let editor = RecordEditor::new(store.clone(), activity.clone(), clock, config);

    let mutated = match matches.subcommand() {
        Some(("list", args)) => {
            list(&editor, args, out).await?;
            false
        }
        Some(("suggest", args)) => {
            suggest(&editor, args, out).await?;
            false
        }
        Some(("timeline", args)) => {
            timeline(&editor, args, out).await?;
            false
        }
        Some(("steps", args)) => {
            steps(&editor, args, out).await?;
            false
        }
        Some(("update", args)) => {
            update(&editor, args, out).await?;
            true
        }
        Some(("complete", args)) => complete(&editor, args, out).await?,
        Some((other, _)) => bail!("unknown command '{other}'"),
        None => bail!("no command given"),
    };

    if mutated {
        store_file::save(store_path, &store.records())?;
        for event in activity.events() {
            tracing::info!(
                actor = %event.actor,
                action = %event.action_type,
                record = %event.entity_label,
                details = %event.details,
                "activity"
            );
        }
    }
    Ok(())
}

fn text<'a>(args: &'a ArgMatches, name: &str) -> Option<&'a str> {
    args.get_one::<String>(name).map(String::as_str)
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    text(args, name).with_context(|| format!("missing <{name}>"))
}

fn date_arg(args: &ArgMatches, name: &str) -> Result<Option<NaiveDate>> {
    text(args, name)
        .map(|value| {
            history::parse_date(value)
                .with_context(|| format!("--{name} expects MM/DD/YYYY, got '{value}'"))
        })
        .transpose()
}

fn stage_label(record: &Record) -> String {
    if record.stage_detail.is_empty() {
        record.effective_stage().to_string()
    } else {
        format!("{} / {}", record.effective_stage(), record.stage_detail)
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

async fn load_snapshot(editor: &RecordEditor) -> Result<RecordSnapshot> {
    Ok(editor.snapshot(&RecordFilter::all()).await?)
}

async fn list(editor: &RecordEditor, args: &ArgMatches, out: &mut dyn Write) -> Result<()> {
    let mut query = SearchQuery::new().with_date_range(date_arg(args, "from")?, date_arg(args, "to")?);
    if let Some(term) = text(args, "term") {
        query = query.with_term(term);
    }
    if let Some(stage) = text(args, "stage") {
        query = query.with_stage(stage);
    }
    if let Some(owner) = text(args, "owner") {
        query = query.with_owner(owner);
    }
    if let Some(source) = text(args, "source") {
        query = query.with_source(source);
    }
    if let Some(sector) = text(args, "sector") {
        query = query.with_sector(sector);
    }

    let index = SearchIndex::new(load_snapshot(editor).await?);
    let hits = sorted_by_recent(index.search(&query));
    if hits.is_empty() {
        writeln!(out, "no matching records")?;
        return Ok(());
    }

    let views = editor.views();
    for record in hits {
        let badge = views.pending_badge(record);
        let latest = views.latest_activity(record).unwrap_or_default();
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{} pending ({})\t{}",
            record.id,
            record.label(),
            stage_label(record),
            record.owner,
            badge.count,
            badge.band,
            match first_line(&latest) {
                "" => "-",
                line => line,
            },
        )?;
    }
    Ok(())
}

async fn suggest(editor: &RecordEditor, args: &ArgMatches, out: &mut dyn Write) -> Result<()> {
    let term = required(args, "term")?;
    let index = SearchIndex::new(load_snapshot(editor).await?);
    for hit in editor.suggest(&index, term) {
        writeln!(
            out,
            "{}\t{}\t{}: {}",
            hit.record_id,
            hit.label,
            hit.field,
            first_line(&hit.value)
        )?;
    }
    Ok(())
}

async fn timeline(editor: &RecordEditor, args: &ArgMatches, out: &mut dyn Write) -> Result<()> {
    let id = RecordId::new(required(args, "id")?);
    let snapshot = load_snapshot(editor).await?;
    let record = snapshot
        .get(&id)
        .with_context(|| format!("record not found: {id}"))?;

    let today = editor.clock().now().date_naive();
    for item in editor.views().timeline(record, today) {
        let date = history::format_date(item.entry.date);
        match item.position {
            Some(position) => writeln!(out, "#{position} [{date}]")?,
            None => writeln!(out, "[{date}]")?,
        }
        if let Some(transition) = &item.entry.stage_transition {
            writeln!(out, "  {transition}")?;
        }
        for line in item.entry.content.lines() {
            writeln!(out, "  {line}")?;
        }
    }
    Ok(())
}

async fn steps(editor: &RecordEditor, args: &ArgMatches, out: &mut dyn Write) -> Result<()> {
    let id = RecordId::new(required(args, "id")?);
    let snapshot = load_snapshot(editor).await?;
    let record = snapshot
        .get(&id)
        .with_context(|| format!("record not found: {id}"))?;
    if record.next_steps.is_empty() {
        writeln!(out, "no next steps")?;
        return Ok(());
    }

    let now = editor.clock().now();
    for step in record.next_steps.iter() {
        match step.completed_at.filter(|_| step.completed) {
            Some(done) => writeln!(
                out,
                "[x] {}\t{}\tdone {}",
                step.id,
                step.task,
                time_ago(done, now)
            )?,
            None if step.completed => writeln!(out, "[x] {}\t{}", step.id, step.task)?,
            None => {
                let age = editor.views().age_band(step, now);
                writeln!(
                    out,
                    "[ ] {}\t{}\t{}d ({})",
                    step.id, step.task, age.days, age.band
                )?;
            }
        }
    }
    Ok(())
}

async fn update(editor: &RecordEditor, args: &ArgMatches, out: &mut dyn Write) -> Result<()> {
    let id = RecordId::new(required(args, "id")?);
    let date = match date_arg(args, "date")? {
        Some(date) => date,
        None => editor.clock().now().date_naive(),
    };

    let mut request = UpdateRequest::new(date);
    if let Some(stage) = text(args, "stage") {
        request = request.with_stage(stage);
    }
    if let Some(detail) = text(args, "detail") {
        request = request.with_detail(detail);
    }
    if let Some(note) = text(args, "note") {
        request = request.with_note(note);
    }
    if let Some(step) = text(args, "step") {
        request = request.with_step(step);
    }
    if let Some(owner) = text(args, "owner") {
        request = request.with_owner(owner);
    }

    let actor = text(args, "actor").unwrap_or_default();
    let record = editor.apply_update(&id, &request, actor).await?;
    writeln!(
        out,
        "updated {}: {} ({} pending)",
        record.label(),
        stage_label(&record),
        record.next_steps.pending_count()
    )?;
    Ok(())
}

/// Returns whether the record was written
async fn complete(editor: &RecordEditor, args: &ArgMatches, out: &mut dyn Write) -> Result<bool> {
    let id = RecordId::new(required(args, "id")?);
    let step_id = StepId::new(required(args, "step-id")?);
    let actor = text(args, "actor").unwrap_or_default();

    let already_done = load_snapshot(editor)
        .await?
        .get(&id)
        .and_then(|record| record.next_steps.get(&step_id))
        .is_some_and(|step| step.completed);

    let record = editor.complete_step(&id, &step_id, actor).await?;
    let verb = if already_done { "already completed" } else { "completed" };
    writeln!(
        out,
        "{verb} {step_id} on {} ({} pending)",
        record.label(),
        record.next_steps.pending_count()
    )?;
    Ok(!already_done)
}
