//! Search predicates

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive date range; an open end is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    #[inline]
    #[must_use]
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Whether either end is set
    #[inline]
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    /// Whether `date` falls inside the range
    ///
    /// An undated record only passes an unbounded range.
    #[must_use]
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        if !self.is_bounded() {
            return true;
        }
        let Some(date) = date else {
            return false;
        };
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// Composite query; every set predicate must hold
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Case-insensitive substring over text fields and tags
    pub term: Option<String>,
    /// Range over the record's activity date
    pub date_range: DateRange,
    /// Exact stage
    pub stage: Option<String>,
    /// Exact owner
    pub owner: Option<String>,
    /// Exact `source` tag
    pub source: Option<String>,
    /// Exact `aligned_sector` tag
    pub sector: Option<String>,
}

impl SearchQuery {
    /// Query matching everything
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = non_blank(term.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_range = DateRange::new(from, to);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = non_blank(stage.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = non_blank(owner.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_source(mut self, tag: impl Into<String>) -> Self {
        self.source = non_blank(tag.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_sector(mut self, tag: impl Into<String>) -> Self {
        self.sector = non_blank(tag.into());
        self
    }

    /// Whether no predicate is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.term.is_none()
            && !self.date_range.is_bounded()
            && self.stage.is_none()
            && self.owner.is_none()
            && self.source.is_none()
            && self.sector.is_none()
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
