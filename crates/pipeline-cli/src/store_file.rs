//! JSON record file
//!
//! The whole file is a JSON array of records. It is read into the
//! in-memory store at startup and written back after a mutation.

use anyhow::{Context, Result};
use pipeline_core::Record;
use std::io::Write;
use std::path::Path;

/// Records from `path`; a missing file is an empty store
///
/// # Errors
/// Unreadable file or malformed JSON.
pub fn load(path: &Path) -> Result<Vec<Record>> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "record file not found; starting empty");
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading record file {}", path.display()))?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Vec<Record> = serde_json::from_str(&text)
        .with_context(|| format!("parsing record file {}", path.display()))?;
    tracing::debug!(path = %path.display(), records = records.len(), "loaded records");
    Ok(records)
}

/// Write `records` to `path` as pretty JSON
///
/// The JSON goes to a temporary file next to `path` which then replaces it,
/// so an interrupted write leaves the previous file intact.
///
/// # Errors
/// Serialization or write failure.
pub fn save(path: &Path, records: &[Record]) -> Result<()> {
    let text = serde_json::to_string_pretty(records).context("serializing records")?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::Builder::new()
        .prefix(".records-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    writeln!(file, "{text}")
        .and_then(|()| file.as_file().sync_all())
        .with_context(|| format!("writing temporary file {}", file.path().display()))?;
    file.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("replacing record file {}", path.display()))?;

    tracing::debug!(path = %path.display(), records = records.len(), "saved records");
    Ok(())
}
