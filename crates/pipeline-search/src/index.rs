//! Search index over a record snapshot
//!
//! Lowercased haystacks are computed once per snapshot, so repeated
//! keystrokes against the same list only pay for the comparisons.

use crate::query::SearchQuery;
use crate::snapshot::RecordSnapshot;
use pipeline_core::{Record, RecordId};
use serde::Serialize;
use std::cmp::Reverse;

/// Field a term matched in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedField {
    Name,
    Owner,
    Creator,
    Stage,
    StageDetail,
    Notes,
    /// Open string attribute, by key
    Attribute(String),
    Source,
    AlignedSector,
}

impl std::fmt::Display for MatchedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => f.write_str("name"),
            Self::Owner => f.write_str("owner"),
            Self::Creator => f.write_str("creator"),
            Self::Stage => f.write_str("stage"),
            Self::StageDetail => f.write_str("stage_detail"),
            Self::Notes => f.write_str("notes"),
            Self::Attribute(key) => f.write_str(key),
            Self::Source => f.write_str("source"),
            Self::AlignedSector => f.write_str("aligned_sector"),
        }
    }
}

/// Autocomplete hit with enough identity to open the record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub record_id: RecordId,
    pub label: String,
    pub field: MatchedField,
    /// Original (not lowercased) field value that matched
    pub value: String,
}

#[derive(Debug, Clone)]
struct Haystack {
    field: MatchedField,
    value: String,
    lower: String,
}

impl Haystack {
    fn new(field: MatchedField, value: &str) -> Option<Self> {
        if value.trim().is_empty() {
            return None;
        }
        Some(Self {
            field,
            value: value.to_string(),
            lower: value.to_lowercase(),
        })
    }
}

fn haystacks_for(record: &Record) -> Vec<Haystack> {
    let mut out = Vec::new();
    let mut push = |field: MatchedField, value: &str| out.extend(Haystack::new(field, value));

    push(MatchedField::Name, &record.name);
    push(MatchedField::Owner, &record.owner);
    push(MatchedField::Creator, &record.creator);
    push(MatchedField::Stage, record.effective_stage());
    push(MatchedField::StageDetail, &record.stage_detail);
    push(MatchedField::Notes, &record.notes);
    for (key, value) in record.string_attributes() {
        push(MatchedField::Attribute(key.to_string()), value);
    }
    for tag in record.source.iter() {
        push(MatchedField::Source, tag);
    }
    for tag in record.aligned_sector.iter() {
        push(MatchedField::AlignedSector, tag);
    }
    out
}

/// Search structure over one snapshot
#[derive(Debug, Clone)]
pub struct SearchIndex {
    snapshot: RecordSnapshot,
    /// Parallel to `snapshot.records()`
    haystacks: Vec<Vec<Haystack>>,
}

impl SearchIndex {
    /// Index a snapshot
    #[must_use]
    pub fn new(snapshot: RecordSnapshot) -> Self {
        let haystacks = snapshot.iter().map(haystacks_for).collect();
        tracing::debug!(records = snapshot.len(), "search index built");
        Self {
            snapshot,
            haystacks,
        }
    }

    /// Snapshot the index was built from
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> &RecordSnapshot {
        &self.snapshot
    }

    /// Records satisfying every predicate, input order
    #[must_use]
    pub fn search(&self, query: &SearchQuery) -> Vec<&Record> {
        let term = query.term.as_deref().map(str::to_lowercase);
        self.snapshot
            .iter()
            .zip(&self.haystacks)
            .filter(|(record, hay)| {
                term.as_deref()
                    .map_or(true, |term| hay.iter().any(|h| h.lower.contains(term)))
                    && Self::matches_filters(record, query)
            })
            .map(|(record, _)| record)
            .collect()
    }

    fn matches_filters(record: &Record, query: &SearchQuery) -> bool {
        query.date_range.contains(record.activity_date())
            && query
                .stage
                .as_deref()
                .map_or(true, |stage| record.effective_stage() == stage)
            && query
                .owner
                .as_deref()
                .map_or(true, |owner| record.owner == owner)
            && query
                .source
                .as_deref()
                .map_or(true, |tag| record.source.contains(tag))
            && query
                .sector
                .as_deref()
                .map_or(true, |tag| record.aligned_sector.contains(tag))
    }

    /// Up to `limit` suggestions for a partial term
    ///
    /// One suggestion per record. Records with a field that starts with the
    /// term come before records that only contain it; otherwise input order.
    #[must_use]
    pub fn suggest(&self, term: &str, limit: usize) -> Vec<Suggestion> {
        let term = term.trim().to_lowercase();
        if term.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut ranked: Vec<(u8, &Record, &Haystack)> = self
            .snapshot
            .iter()
            .zip(&self.haystacks)
            .filter_map(|(record, hay)| {
                let prefix = hay.iter().find(|h| h.lower.starts_with(&term));
                let best = match prefix {
                    Some(h) => (0, h),
                    None => (1, hay.iter().find(|h| h.lower.contains(&term))?),
                };
                Some((best.0, record, best.1))
            })
            .collect();
        ranked.sort_by_key(|(rank, _, _)| *rank);

        ranked
            .into_iter()
            .take(limit)
            .map(|(_, record, hay)| Suggestion {
                record_id: record.id.clone(),
                label: record.label().to_string(),
                field: hay.field.clone(),
                value: hay.value.clone(),
            })
            .collect()
    }
}

/// Most recent activity instant first; ties keep input order, undated
/// records last
#[must_use]
pub fn sorted_by_recent<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<&'a Record> {
    let mut records: Vec<&Record> = records.into_iter().collect();
    records.sort_by_key(|record| Reverse(record.activity_instant()));
    records
}
