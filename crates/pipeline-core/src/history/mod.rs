//! Update history encoded inside a record's `notes` text
//!
//! Layout, chronological:
//!
//! ```text
//! [01/05/2024] Called, no answer
//!
//! [01/10/2024] Stage: Initial Outreach → Active Lead
//! She's interested
//! ```
//!
//! Each entry starts with a bracketed `[M/D/YYYY]` marker. An entry written
//! alongside a stage change carries a first line `Stage: <from> → <to>`,
//! which decodes into [`HistoryEntry::stage_transition`]. Text that carries
//! no marker at all is legacy free text and is kept as a single entry dated
//! with the caller's fallback date. Decoding never fails.

mod edit;

pub use edit::{Fingerprint, HistoryEditSession};

use crate::error::ValidationError;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d{1,2})/(\d{1,2})/(\d{4})\]").expect("valid history marker regex")
});

static TRANSITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Stage:\s*(\S.*?)\s*→\s*(\S.*?)\s*$").expect("valid stage transition regex")
});

const DATE_FORMAT: &str = "%m/%d/%Y";

/// Stage change recorded with an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub from: String,
    pub to: String,
}

impl StageTransition {
    /// Transition between two stages
    #[inline]
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Parse a `Stage: X → Y` line
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let caps = TRANSITION.captures(line.trim())?;
        Some(Self::new(&caps[1], &caps[2]))
    }
}

impl std::fmt::Display for StageTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Stage: {} → {}", self.from, self.to)
    }
}

/// One dated history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Calendar date of the interaction
    pub date: NaiveDate,
    /// Free text
    pub content: String,
    /// Stage change made together with this entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_transition: Option<StageTransition>,
}

impl HistoryEntry {
    /// Plain entry
    #[inline]
    #[must_use]
    pub fn new(date: NaiveDate, content: impl Into<String>) -> Self {
        Self {
            date,
            content: content.into(),
            stage_transition: None,
        }
    }

    /// Attach a stage transition
    #[inline]
    #[must_use]
    pub fn with_transition(mut self, transition: StageTransition) -> Self {
        self.stage_transition = Some(transition);
        self
    }

    /// Text after the date marker
    #[must_use]
    pub fn body(&self) -> String {
        match &self.stage_transition {
            Some(transition) if self.content.is_empty() => transition.to_string(),
            Some(transition) => format!("{transition}\n{}", self.content),
            None => self.content.clone(),
        }
    }

    fn encode_into(&self, out: &mut String) {
        out.push('[');
        out.push_str(&format_date(self.date));
        out.push(']');
        let body = self.body();
        if !body.is_empty() {
            out.push(' ');
            out.push_str(&body);
        }
    }

    fn from_body(date: NaiveDate, body: &str) -> Self {
        let (first, rest) = body.split_once('\n').unwrap_or((body, ""));
        match StageTransition::parse_line(first) {
            Some(transition) => Self::new(date, rest.trim()).with_transition(transition),
            None => Self::new(date, body),
        }
    }
}

/// Format a date the way markers carry it (`MM/DD/YYYY`)
#[inline]
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse `M/D/YYYY` with one or two digit month and day
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let mut parts = text.trim().splitn(3, '/');
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    let year_text = parts.next()?;
    if year_text.len() != 4 {
        return None;
    }
    NaiveDate::from_ymd_opt(year_text.parse().ok()?, month, day)
}

struct Marker {
    start: usize,
    end: usize,
    date: NaiveDate,
}

fn markers(text: &str) -> Vec<Marker> {
    MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let month = caps[1].parse().ok()?;
            let day = caps[2].parse().ok()?;
            let year = caps[3].parse().ok()?;
            // impossible dates like [13/45/2024] stay part of the content
            let date = NaiveDate::from_ymd_opt(year, month, day)?;
            Some(Marker {
                start: whole.start(),
                end: whole.end(),
                date,
            })
        })
        .collect()
}

/// Decode notes into chronological entries
///
/// `fallback_date` dates text that has no marker of its own (legacy free
/// text, or text preceding the first marker).
#[must_use]
pub fn decode(text: &str, fallback_date: NaiveDate) -> Vec<HistoryEntry> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let found = markers(text);
    if found.is_empty() {
        tracing::debug!(len = text.len(), "notes carry no date markers; keeping as one entry");
        return vec![HistoryEntry::new(fallback_date, text)];
    }

    let mut entries = Vec::with_capacity(found.len() + 1);
    let leading = text[..found[0].start].trim();
    if !leading.is_empty() {
        entries.push(HistoryEntry::new(fallback_date, leading));
    }

    for (i, marker) in found.iter().enumerate() {
        let stop = found.get(i + 1).map_or(text.len(), |next| next.start);
        let body = text[marker.end..stop].trim();
        entries.push(HistoryEntry::from_body(marker.date, body));
    }

    entries
}

/// Check that `content` decodes back as the content of a single entry
///
/// Content of an entry without a stage transition must not open with a
/// `Stage: X → Y` line; no content may carry a real date marker.
///
/// # Errors
/// [`ValidationError::NoteContainsMarker`] or
/// [`ValidationError::NoteStartsWithStageLine`].
pub fn check_content(content: &str, with_transition: bool) -> Result<(), ValidationError> {
    if let Some(marker) = markers(content).first() {
        return Err(ValidationError::NoteContainsMarker {
            marker: content[marker.start..marker.end].to_string(),
        });
    }
    if !with_transition {
        let first = content.trim().lines().next().unwrap_or_default();
        if StageTransition::parse_line(first).is_some() {
            return Err(ValidationError::NoteStartsWithStageLine {
                line: first.trim().to_string(),
            });
        }
    }
    Ok(())
}

/// Encode entries in the given order, separated by a blank line
#[must_use]
pub fn encode(entries: &[HistoryEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        entry.encode_into(&mut out);
    }
    out
}

/// Append one entry to existing notes
#[must_use]
pub fn append(text: &str, entry: HistoryEntry, fallback_date: NaiveDate) -> String {
    let mut entries = decode(text, fallback_date);
    entries.push(entry);
    encode(&entries)
}

/// Content with any leading stage line removed
///
/// Works on raw entry content that was not produced by [`decode`], such as
/// legacy text whose first line happens to be a stage line.
#[must_use]
pub fn strip_transition_line(content: &str) -> &str {
    let (first, rest) = content.split_once('\n').unwrap_or((content, ""));
    if StageTransition::parse_line(first).is_some() {
        rest.trim()
    } else {
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(m: u32, d: u32, y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn append_to_empty_notes() {
        let notes = append("", HistoryEntry::new(day(1, 5, 2024), "Called, no answer"), day(1, 1, 2024));
        assert_eq!(notes, "[01/05/2024] Called, no answer");
    }

    #[test]
    fn append_with_stage_change() {
        let entry = HistoryEntry::new(day(1, 10, 2024), "She's interested")
            .with_transition(StageTransition::new("Initial Outreach", "Active Lead"));
        let notes = append("[01/05/2024] Called, no answer", entry, day(1, 1, 2024));
        assert_eq!(
            notes,
            "[01/05/2024] Called, no answer\n\n[01/10/2024] Stage: Initial Outreach → Active Lead\nShe's interested"
        );
    }

    #[test]
    fn decode_splits_on_markers() {
        let text = "[1/5/2024] first\nline two\n\n[01/10/2024]   second  ";
        let entries = decode(text, day(1, 1, 2020));
        assert_eq!(
            entries,
            vec![
                HistoryEntry::new(day(1, 5, 2024), "first\nline two"),
                HistoryEntry::new(day(1, 10, 2024), "second"),
            ]
        );
    }

    #[test]
    fn decode_lifts_stage_line() {
        let text = "[01/10/2024] Stage: Initial Outreach → Active Lead\nShe's interested";
        let entries = decode(text, day(1, 1, 2020));
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].stage_transition,
            Some(StageTransition::new("Initial Outreach", "Active Lead"))
        );
        assert_eq!(entries[0].content, "She's interested");
    }

    #[test]
    fn decode_stage_line_without_content() {
        let text = "[02/01/2024] Stage: Active Lead → Close Won";
        let entries = decode(text, day(1, 1, 2020));
        assert_eq!(entries[0].content, "");
        assert_eq!(encode(&entries), text);
    }

    #[test]
    fn legacy_text_is_one_entry_verbatim() {
        let legacy = "  met at career fair,\nfollow up in spring ";
        let entries = decode(legacy, day(6, 1, 2023));
        assert_eq!(entries, vec![HistoryEntry::new(day(6, 1, 2023), legacy)]);
    }

    #[test]
    fn leading_text_before_first_marker_is_kept() {
        let text = "old context\n[03/02/2024] new note";
        let entries = decode(text, day(1, 1, 2023));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], HistoryEntry::new(day(1, 1, 2023), "old context"));
        assert_eq!(entries[1].content, "new note");
    }

    #[test]
    fn malformed_markers_are_content() {
        let text = "[01/05/2024] see 1/6/2024] and [13/45/2024] and [1/5/24]";
        let entries = decode(text, day(1, 1, 2020));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "see 1/6/2024] and [13/45/2024] and [1/5/24]");
    }

    #[test]
    fn empty_and_blank_text_decode_to_nothing() {
        assert!(decode("", day(1, 1, 2020)).is_empty());
        assert!(decode(" \n ", day(1, 1, 2020)).is_empty());
    }

    #[test]
    fn parse_date_accepts_short_forms() {
        assert_eq!(parse_date("1/5/2024"), Some(day(1, 5, 2024)));
        assert_eq!(parse_date("01/05/2024"), Some(day(1, 5, 2024)));
        assert_eq!(parse_date("1/5/24"), None);
        assert_eq!(parse_date("2/30/2024"), None);
    }

    #[test]
    fn strip_transition_line_only_strips_stage_lines() {
        assert_eq!(strip_transition_line("Stage: A → B\nhello"), "hello");
        assert_eq!(strip_transition_line("hello\nStage: A → B"), "hello\nStage: A → B");
    }

    #[test]
    fn check_content_rejects_embedded_marker() {
        let note = "Agreed to meet on [1/15/2024] at their office";
        assert_eq!(
            check_content(note, false),
            Err(ValidationError::NoteContainsMarker {
                marker: "[1/15/2024]".to_string()
            })
        );
        assert!(check_content("Meet on 1/15/2024, budget [TBD]", false).is_ok());
        assert!(check_content("see [13/45/2024]", false).is_ok());
    }

    #[test]
    fn check_content_rejects_stage_line_without_transition() {
        let note = "Stage: Active Lead → Close Won\nsigned";
        assert!(matches!(
            check_content(note, false),
            Err(ValidationError::NoteStartsWithStageLine { .. })
        ));
        assert!(check_content(note, true).is_ok());
        assert!(check_content("signed\nStage: Active Lead → Close Won", false).is_ok());
    }
}
