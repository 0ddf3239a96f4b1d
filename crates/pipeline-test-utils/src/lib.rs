//! Testing utilities for the pipeline workspace
//!
//! Shared fixtures, a controllable clock and date helpers.

#![allow(missing_docs)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;
use pipeline_core::{Clock, Record, RecordKind};

/// Clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock pinned to noon UTC on the given day
    pub fn at_noon(year: i32, month: u32, day: u32) -> Self {
        Self::new(ts(year, month, day, 12, 0))
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn ts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

/// Lead in its default stage, origin date set
pub fn lead(id: &str, name: &str, owner: &str, origin: NaiveDate) -> Record {
    Record::new(id, RecordKind::Lead, name, owner).with_origin_date(origin)
}

/// Job posting in its default stage, origin date set
pub fn job_posting(id: &str, title: &str, owner: &str, origin: NaiveDate) -> Record {
    Record::new(id, RecordKind::JobPosting, title, owner).with_origin_date(origin)
}

/// Lead with history already written in the `notes` encoding
pub fn lead_with_notes(id: &str, name: &str, notes: &str) -> Record {
    let mut record = lead(id, name, "dana", date(2024, 1, 1));
    record.notes = notes.to_string();
    record
}

/// Three leads for search scenarios:
/// - `r1` "Acme Robotics", owner dana, active 2024-01-10
/// - `r2` "Beta Corp", owner lee, active 2024-02-15, notes mention acme
/// - `r3` "Gamma LLC", owner dana, active 2024-03-01
pub fn search_sample() -> Vec<Record> {
    let mut acme = lead("r1", "Acme Robotics", "dana", date(2024, 1, 2));
    acme.updated_at = Some(ts(2024, 1, 10, 9, 0));
    acme.source.insert("Referral");
    acme.aligned_sector.insert("Manufacturing");

    let mut beta = lead("r2", "Beta Corp", "lee", date(2024, 2, 1));
    beta.updated_at = Some(ts(2024, 2, 15, 9, 0));
    beta.stage = "Active Lead".to_string();
    beta.notes = "[02/15/2024] Intro via Acme partner".to_string();
    beta.source.insert("Career Fair");

    let mut gamma = lead("r3", "Gamma LLC", "dana", date(2024, 3, 1));
    gamma.updated_at = Some(ts(2024, 3, 1, 9, 0));
    gamma.aligned_sector.insert("Healthcare");
    gamma.aligned_sector.insert("Manufacturing");
    gamma = gamma.with_attribute("contact_email", "ops@gamma.example");

    vec![acme, beta, gamma]
}

/// The sample records as a JSON array, the way a store file holds them
pub fn search_sample_json() -> String {
    serde_json::to_string_pretty(&search_sample()).unwrap()
}
