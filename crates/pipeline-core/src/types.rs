//! Core types for pipeline records
//!
//! Defines:
//! - Record identity and kind
//! - The record itself, as read from the persistence boundary
//! - Tag sets with tolerant decoding
//! - Creation drafts and merge patches

use crate::error::ValidationError;
use crate::next_steps::NextSteps;
use crate::stage::StageModel;
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Opaque record identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Create from any string-like value
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Which pipeline a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Outreach contact
    #[default]
    Lead,
    /// Job posting
    JobPosting,
}

impl RecordKind {
    /// Stage model for this pipeline
    #[inline]
    #[must_use]
    pub fn stage_model(self) -> &'static StageModel {
        StageModel::for_kind(self)
    }

    /// Human label used in activity entries
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Lead => "lead",
            RecordKind::JobPosting => "job posting",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered set of tag strings
///
/// Arrives on the wire as a JSON array, as JSON text holding an array, or as
/// a legacy comma-separated string. All shapes normalize here so nothing
/// deeper in the crate needs to care which write path produced the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagSet(IndexSet<String>);

impl TagSet {
    /// Empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize any accepted wire shape
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::default(),
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Value::String(text) => Self::from_text(text),
            other => {
                tracing::debug!(shape = %other, "unrecognised tag field; treating as empty");
                Self::default()
            }
        }
    }

    fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::default();
        }
        if trimmed.starts_with('[') {
            return match serde_json::from_str::<Value>(trimmed) {
                Ok(parsed @ Value::Array(_)) => Self::from_value(&parsed),
                _ => {
                    tracing::debug!("malformed tag JSON; treating as empty");
                    Self::default()
                }
            };
        }
        trimmed.split(',').collect()
    }

    /// Insert a tag; returns false when blank or already present
    pub fn insert(&mut self, tag: impl AsRef<str>) -> bool {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            return false;
        }
        self.0.insert(tag.to_string())
    }

    /// Exact membership
    #[inline]
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of tags
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::default();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl<'de> Deserialize<'de> for TagSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A lead or job posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier assigned by persistence
    pub id: RecordId,
    /// Pipeline the record moves through
    #[serde(default)]
    pub kind: RecordKind,
    /// Display label (organisation or posting title)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    /// Current stage; blank means the pipeline default
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stage: String,
    /// Stage sub-detail, empty for stages without options
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stage_detail: String,
    /// Staff member currently responsible
    #[serde(default, deserialize_with = "null_as_empty")]
    pub owner: String,
    /// Staff member who created the record
    #[serde(default, deserialize_with = "null_as_empty")]
    pub creator: String,
    /// Encoded update history
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: String,
    /// Outstanding and completed action items
    #[serde(default)]
    pub next_steps: NextSteps,
    /// Where the relationship came from
    #[serde(default)]
    pub source: TagSet,
    /// Sectors the record is aligned with
    #[serde(default)]
    pub aligned_sector: TagSet,
    /// Date the relationship started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_date: Option<NaiveDate>,
    /// Set by persistence
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Set by persistence
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Remaining attributes (contact name, email, location, ...)
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl Record {
    /// Create a fresh record in the pipeline's default stage
    #[must_use]
    pub fn new(
        id: impl Into<RecordId>,
        kind: RecordKind,
        name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        let owner = owner.into();
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            stage: kind.stage_model().default_stage().to_string(),
            stage_detail: String::new(),
            creator: owner.clone(),
            owner,
            notes: String::new(),
            next_steps: NextSteps::default(),
            source: TagSet::new(),
            aligned_sector: TagSet::new(),
            origin_date: None,
            created_at: None,
            updated_at: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Stage, falling back to the pipeline default when blank
    #[must_use]
    pub fn effective_stage(&self) -> &str {
        if self.stage.trim().is_empty() {
            self.kind.stage_model().default_stage()
        } else {
            &self.stage
        }
    }

    /// Date the record originated: explicit origin date, else creation date
    #[must_use]
    pub fn origin(&self) -> Option<NaiveDate> {
        self.origin_date
            .or_else(|| self.created_at.map(|ts| ts.date_naive()))
    }

    /// Date of last activity: last update, else origin
    #[must_use]
    pub fn activity_date(&self) -> Option<NaiveDate> {
        self.updated_at
            .map(|ts| ts.date_naive())
            .or_else(|| self.origin())
    }

    /// Instant of last activity for ordering: last update, else the start
    /// of the origin date
    #[must_use]
    pub fn activity_instant(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or_else(|| {
            self.origin()
                .and_then(|day| day.and_hms_opt(0, 0, 0))
                .map(|midnight| midnight.and_utc())
        })
    }

    /// Label for lists and activity entries
    #[must_use]
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }

    /// String-valued open attributes
    pub fn string_attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .filter_map(|(key, value)| value.as_str().map(|v| (key.as_str(), v)))
    }

    /// Builder: set origin date
    #[inline]
    #[must_use]
    pub fn with_origin_date(mut self, date: NaiveDate) -> Self {
        self.origin_date = Some(date);
        self
    }

    /// Builder: set a string attribute
    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(key.into(), Value::String(value.into()));
        self
    }
}

/// User input for creating a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDraft {
    #[serde(default)]
    pub kind: RecordKind,
    pub name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub stage_detail: Option<String>,
    #[serde(default)]
    pub origin_date: Option<NaiveDate>,
    #[serde(default)]
    pub source: TagSet,
    #[serde(default)]
    pub aligned_sector: TagSet,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl RecordDraft {
    /// Draft with a name and owner
    #[must_use]
    pub fn new(kind: RecordKind, name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            owner: owner.into(),
            ..Self::default()
        }
    }
}

/// Validated fields handed to persistence `create`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRecord {
    pub kind: RecordKind,
    pub name: String,
    pub stage: String,
    pub stage_detail: String,
    pub owner: String,
    pub creator: String,
    pub notes: String,
    pub next_steps: NextSteps,
    pub source: TagSet,
    pub aligned_sector: TagSet,
    pub origin_date: Option<NaiveDate>,
    pub attributes: BTreeMap<String, Value>,
}

impl NewRecord {
    /// Validate a draft; the creator becomes owner when none is given
    ///
    /// # Errors
    /// Blank name or creator, unknown stage, or a bad stage detail.
    pub fn from_draft(draft: RecordDraft, creator: &str) -> Result<Self, ValidationError> {
        let creator = creator.trim();
        if creator.is_empty() {
            return Err(ValidationError::MissingField { field: "creator" });
        }
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField { field: "name" });
        }

        let model = draft.kind.stage_model();
        let stage = draft
            .stage
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(model.default_stage());
        if !model.is_member(stage) {
            return Err(ValidationError::UnknownStage {
                kind: draft.kind,
                stage: stage.to_string(),
            });
        }
        let stage_detail = draft.stage_detail.as_deref().map_or("", str::trim);
        model.validate_detail(stage, stage_detail)?;

        let owner = match draft.owner.trim() {
            "" => creator,
            owner => owner,
        };

        Ok(Self {
            kind: draft.kind,
            name: name.to_string(),
            stage: stage.to_string(),
            stage_detail: stage_detail.to_string(),
            owner: owner.to_string(),
            creator: creator.to_string(),
            notes: String::new(),
            next_steps: NextSteps::default(),
            source: draft.source,
            aligned_sector: draft.aligned_sector,
            origin_date: draft.origin_date,
            attributes: draft.attributes,
        })
    }

    /// Materialize with persistence-assigned identity and timestamps
    #[must_use]
    pub fn into_record(self, id: RecordId, now: DateTime<Utc>) -> Record {
        Record {
            id,
            kind: self.kind,
            name: self.name,
            stage: self.stage,
            stage_detail: self.stage_detail,
            owner: self.owner,
            creator: self.creator,
            notes: self.notes,
            next_steps: self.next_steps,
            source: self.source,
            aligned_sector: self.aligned_sector,
            origin_date: self.origin_date,
            created_at: Some(now),
            updated_at: Some(now),
            attributes: self.attributes,
        }
    }
}

/// Partial update; `None` fields are left untouched (merge, not replace)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<NextSteps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<TagSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aligned_sector: Option<TagSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl RecordPatch {
    /// Whether applying the patch would change nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.stage.is_none()
            && self.stage_detail.is_none()
            && self.owner.is_none()
            && self.notes.is_none()
            && self.next_steps.is_none()
            && self.source.is_none()
            && self.aligned_sector.is_none()
            && self.origin_date.is_none()
            && self.attributes.is_empty()
    }

    /// Merge into a record. `creator` and timestamps are never patched.
    pub fn apply_to(&self, record: &mut Record) {
        if let Some(name) = &self.name {
            record.name.clone_from(name);
        }
        if let Some(stage) = &self.stage {
            record.stage.clone_from(stage);
        }
        if let Some(detail) = &self.stage_detail {
            record.stage_detail.clone_from(detail);
        }
        if let Some(owner) = &self.owner {
            record.owner.clone_from(owner);
        }
        if let Some(notes) = &self.notes {
            record.notes.clone_from(notes);
        }
        if let Some(steps) = &self.next_steps {
            record.next_steps.clone_from(steps);
        }
        if let Some(source) = &self.source {
            record.source.clone_from(source);
        }
        if let Some(sector) = &self.aligned_sector {
            record.aligned_sector.clone_from(sector);
        }
        if let Some(date) = self.origin_date {
            record.origin_date = Some(date);
        }
        for (key, value) in &self.attributes {
            record.attributes.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn tag_set_accepts_array_and_json_text() {
        let from_array = TagSet::from_value(&json!(["Fintech", "Health"]));
        let from_text = TagSet::from_value(&json!("[\"Fintech\",\"Health\"]"));
        assert_eq!(from_array, from_text);
        assert_eq!(from_array.len(), 2);
    }

    #[test]
    fn tag_set_accepts_legacy_comma_text() {
        let tags = TagSet::from_value(&json!("Referral, Event ,  "));
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["Referral", "Event"]);
    }

    #[test]
    fn tag_set_malformed_json_is_empty() {
        assert!(TagSet::from_value(&json!("[\"unterminated")).is_empty());
        assert!(TagSet::from_value(&json!({"a": 1})).is_empty());
        assert!(TagSet::from_value(&Value::Null).is_empty());
    }

    #[test]
    fn tag_set_dedupes_and_keeps_order() {
        let tags: TagSet = ["b", "a", "b"].into_iter().collect();
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn record_deserializes_both_wire_shapes() {
        let structured: Record = serde_json::from_value(json!({
            "id": "r1",
            "name": "Acme",
            "stage": "Active Lead",
            "owner": "dana",
            "notes": null,
            "next_steps": [{"id": "s1", "task": "Call", "created_at": "2024-01-05T10:00:00Z"}],
            "source": ["Referral"],
            "aligned_sector": "[\"Fintech\"]",
            "contact_email": "ops@acme.test"
        }))
        .unwrap();
        let textual: Record = serde_json::from_value(json!({
            "id": "r1",
            "name": "Acme",
            "stage": "Active Lead",
            "owner": "dana",
            "next_steps": "[{\"id\":\"s1\",\"task\":\"Call\",\"created_at\":\"2024-01-05T10:00:00Z\"}]",
            "source": "[\"Referral\"]",
            "aligned_sector": ["Fintech"],
            "contact_email": "ops@acme.test"
        }))
        .unwrap();

        assert_eq!(structured, textual);
        assert_eq!(structured.next_steps.len(), 1);
        assert!(structured.notes.is_empty());
        assert_eq!(
            structured.string_attributes().collect::<Vec<_>>(),
            vec![("contact_email", "ops@acme.test")]
        );
    }

    #[test]
    fn effective_stage_defaults_when_blank() {
        let mut record = Record::new("r1", RecordKind::JobPosting, "Backend Engineer", "sam");
        assert_eq!(record.effective_stage(), "Open");
        record.stage = String::new();
        assert_eq!(record.effective_stage(), "Open");
    }

    #[test]
    fn activity_date_falls_back_to_origin() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let record = Record::new("r1", RecordKind::Lead, "Acme", "dana").with_origin_date(day);
        assert_eq!(record.activity_date(), Some(day));
        assert_eq!(
            record.activity_instant(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn activity_instant_keeps_time_of_day() {
        let evening = Utc.with_ymd_and_hms(2024, 3, 1, 17, 0, 0).unwrap();
        let mut record = Record::new("r1", RecordKind::Lead, "Acme", "dana")
            .with_origin_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        record.updated_at = Some(evening);
        assert_eq!(record.activity_instant(), Some(evening));
        assert_eq!(Record::new("r2", RecordKind::Lead, "Beta", "lee").activity_instant(), None);
    }

    #[test]
    fn draft_defaults_owner_to_creator() {
        let draft = RecordDraft::new(RecordKind::Lead, "Acme", "  ");
        let new = NewRecord::from_draft(draft, "dana").unwrap();
        assert_eq!(new.owner, "dana");
        assert_eq!(new.creator, "dana");
        assert_eq!(new.stage, "Initial Outreach");
        assert!(new.notes.is_empty());
        assert!(new.next_steps.is_empty());
    }

    #[test]
    fn draft_rejects_blank_name_and_bad_stage() {
        let blank = RecordDraft::new(RecordKind::Lead, " ", "dana");
        assert_eq!(
            NewRecord::from_draft(blank, "dana"),
            Err(ValidationError::MissingField { field: "name" })
        );

        let mut bad = RecordDraft::new(RecordKind::Lead, "Acme", "dana");
        bad.stage = Some("Filled".to_string());
        assert!(matches!(
            NewRecord::from_draft(bad, "dana"),
            Err(ValidationError::UnknownStage { .. })
        ));
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let mut record = Record::new("r1", RecordKind::Lead, "Acme", "dana");
        record.notes = "[01/05/2024] hello".to_string();
        let patch = RecordPatch {
            owner: Some("lee".to_string()),
            ..RecordPatch::default()
        };
        patch.apply_to(&mut record);
        assert_eq!(record.owner, "lee");
        assert_eq!(record.creator, "dana");
        assert_eq!(record.notes, "[01/05/2024] hello");
        assert!(!patch.is_empty());
        assert!(RecordPatch::default().is_empty());
    }
}
