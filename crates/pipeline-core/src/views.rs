//! Derived, read-only presentation facts
//!
//! Everything here is pure and cheap enough to recompute on every render.

use crate::history::{self, HistoryEntry};
use crate::next_steps::{AgeThresholds, NextStep, SeverityBand};
use crate::types::Record;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Pending next-step count and its band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingBadge {
    pub count: usize,
    pub band: SeverityBand,
}

/// Age of a next step and its band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgeBadge {
    pub days: i64,
    pub band: SeverityBand,
}

/// History entry prepared for most-recent-first display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    /// Position in the decoded (chronological) sequence; `None` for the
    /// placeholder shown on records without history
    pub position: Option<usize>,
    pub entry: HistoryEntry,
}

impl TimelineEntry {
    /// Whether this is the presentation-only placeholder
    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.position.is_none()
    }
}

/// Computes derived views with configurable thresholds
#[derive(Debug, Clone)]
pub struct ViewCalculator {
    thresholds: AgeThresholds,
    placeholder_label: String,
}

impl Default for ViewCalculator {
    fn default() -> Self {
        Self::new(AgeThresholds::default(), "Record created")
    }
}

impl ViewCalculator {
    /// Calculator with explicit age thresholds and placeholder label
    #[must_use]
    pub fn new(thresholds: AgeThresholds, placeholder_label: impl Into<String>) -> Self {
        Self {
            thresholds,
            placeholder_label: placeholder_label.into(),
        }
    }

    /// Content of the newest history entry, stage line stripped
    #[must_use]
    pub fn latest_activity(&self, record: &Record) -> Option<String> {
        let fallback = record.origin().unwrap_or_default();
        history::decode(&record.notes, fallback)
            .pop()
            .map(|entry| history::strip_transition_line(&entry.content).to_string())
    }

    /// Pending next-step count and band
    #[must_use]
    pub fn pending_badge(&self, record: &Record) -> PendingBadge {
        let count = record.next_steps.pending_count();
        PendingBadge {
            count,
            band: SeverityBand::from_pending_count(count),
        }
    }

    /// Age of a step in whole days and its band
    #[must_use]
    pub fn age_band(&self, step: &NextStep, now: DateTime<Utc>) -> AgeBadge {
        let days = step.age_days(now);
        AgeBadge {
            days,
            band: SeverityBand::from_age_days(days, self.thresholds),
        }
    }

    /// History, most recent first
    ///
    /// Records without history get one placeholder entry dated with the
    /// record's origin (or `today`).
    #[must_use]
    pub fn timeline(&self, record: &Record, today: NaiveDate) -> Vec<TimelineEntry> {
        let origin = record.origin().unwrap_or(today);
        let entries = history::decode(&record.notes, origin);
        if entries.is_empty() {
            return vec![TimelineEntry {
                position: None,
                entry: HistoryEntry::new(origin, self.placeholder_label.clone()),
            }];
        }

        entries
            .into_iter()
            .enumerate()
            .rev()
            .map(|(position, entry)| TimelineEntry {
                position: Some(position),
                entry,
            })
            .collect()
    }
}

/// Relative time like "5m ago", falling back to a date after a year
#[must_use]
pub fn time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - timestamp).num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    let days = hours / 24;
    match days {
        0..=6 => format!("{days}d ago"),
        7..=29 => format!("{}w ago", days / 7),
        30..=364 => format!("{}mo ago", days / 30),
        _ => history::format_date(timestamp.date_naive()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordKind;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn lead_with_notes(notes: &str) -> Record {
        let mut record = Record::new("r1", RecordKind::Lead, "Acme", "dana");
        record.notes = notes.to_string();
        record
    }

    #[test]
    fn latest_activity_strips_stage_line() {
        let record = lead_with_notes(
            "[01/05/2024] Called\n\n[01/10/2024] Stage: Initial Outreach → Active Lead\nShe's interested",
        );
        let views = ViewCalculator::default();
        assert_eq!(views.latest_activity(&record).as_deref(), Some("She's interested"));
        assert_eq!(views.latest_activity(&lead_with_notes("")), None);
    }

    #[test]
    fn latest_activity_of_legacy_notes() {
        let record = lead_with_notes("Stage: A → B\nold free text");
        assert_eq!(
            ViewCalculator::default().latest_activity(&record).as_deref(),
            Some("old free text")
        );
    }

    #[test]
    fn pending_badge_counts_open_steps() {
        let mut record = lead_with_notes("");
        for task in ["a", "b", "c"] {
            record.next_steps.add(task, now());
        }
        let badge = ViewCalculator::default().pending_badge(&record);
        assert_eq!(badge, PendingBadge { count: 3, band: SeverityBand::High });
    }

    #[test]
    fn age_band_uses_thresholds() {
        let mut record = lead_with_notes("");
        let id = record.next_steps.add("a", now() - Duration::days(5)).unwrap();
        let step = record.next_steps.get(&id).unwrap();

        let badge = ViewCalculator::default().age_band(step, now());
        assert_eq!(badge, AgeBadge { days: 5, band: SeverityBand::Medium });

        let strict = ViewCalculator::new(
            AgeThresholds {
                low_max_days: 1,
                medium_max_days: 2,
            },
            "Record created",
        );
        assert_eq!(strict.age_band(step, now()).band, SeverityBand::High);
    }

    #[test]
    fn timeline_is_most_recent_first() {
        let record = lead_with_notes("[01/05/2024] one\n\n[01/10/2024] two");
        let timeline = ViewCalculator::default().timeline(&record, now().date_naive());
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].position, Some(1));
        assert_eq!(timeline[0].entry.content, "two");
        assert_eq!(timeline[1].position, Some(0));
    }

    #[test]
    fn empty_history_gets_placeholder() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();
        let record = lead_with_notes("").with_origin_date(day);
        let timeline = ViewCalculator::default().timeline(&record, now().date_naive());
        assert_eq!(timeline.len(), 1);
        assert!(timeline[0].is_placeholder());
        assert_eq!(timeline[0].entry, HistoryEntry::new(day, "Record created"));
    }

    #[test]
    fn time_ago_buckets() {
        let at = |d: Duration| time_ago(now() - d, now());
        assert_eq!(at(Duration::seconds(5)), "just now");
        assert_eq!(at(Duration::seconds(-30)), "just now");
        assert_eq!(at(Duration::minutes(5)), "5m ago");
        assert_eq!(at(Duration::hours(3)), "3h ago");
        assert_eq!(at(Duration::days(2)), "2d ago");
        assert_eq!(at(Duration::days(15)), "2w ago");
        assert_eq!(at(Duration::days(95)), "3mo ago");
        assert_eq!(at(Duration::days(400)), "04/28/2023");
    }
}
