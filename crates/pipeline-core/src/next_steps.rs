//! Next steps: completable action items stored in `next_steps`
//!
//! The field arrives either as a JSON array or as JSON text holding one,
//! depending on which write path stored it. Both decode identically.
//! Anything unreadable decodes to an empty list; the data is best-effort
//! legacy content and never blocks a screen from rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// Step identifier, unique within a record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    /// Wrap an existing id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Time-ordered id (timestamp + randomness)
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        Self(Ulid::from_datetime(now.into()).to_string())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StepId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // older writers stored numeric ids
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Number(number) => Self(number.to_string()),
        })
    }
}

/// One action item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextStep {
    pub id: StepId,
    pub task: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
    /// Present iff `completed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl NextStep {
    /// Whether the step is still open
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.completed
    }

    /// Whole days since creation, never negative
    #[must_use]
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }
}

/// Ordered list of next steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NextSteps(Vec<NextStep>);

impl NextSteps {
    /// Empty list
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode any accepted wire shape; failures yield an empty list
    #[must_use]
    pub fn decode(raw: &Value) -> Self {
        match raw {
            Value::Null => Self::default(),
            Value::String(text) if text.trim().is_empty() => Self::default(),
            Value::String(text) => Self::from_json_str(text),
            Value::Array(_) => match serde_json::from_value::<Vec<NextStep>>(raw.clone()) {
                Ok(steps) => Self(steps),
                Err(err) => {
                    tracing::debug!(error = %err, "malformed next steps array; treating as empty");
                    Self::default()
                }
            },
            other => {
                tracing::debug!(shape = %other, "unrecognised next steps field; treating as empty");
                Self::default()
            }
        }
    }

    /// Decode JSON text
    #[must_use]
    pub fn from_json_str(text: &str) -> Self {
        match serde_json::from_str::<Vec<NextStep>>(text) {
            Ok(steps) => Self(steps),
            Err(err) => {
                tracing::debug!(error = %err, "malformed next steps JSON; treating as empty");
                Self::default()
            }
        }
    }

    /// JSON text for text-column backends
    #[must_use]
    pub fn encode(&self) -> String {
        // a Vec of plain structs with string keys always serializes
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    /// Append a step; blank tasks are ignored
    ///
    /// Returns the new step's id.
    pub fn add(&mut self, task: &str, now: DateTime<Utc>) -> Option<StepId> {
        let task = task.trim();
        if task.is_empty() {
            return None;
        }

        let mut id = StepId::generate(now);
        while self.get(&id).is_some() {
            id = StepId::generate(now);
        }

        self.0.push(NextStep {
            id: id.clone(),
            task: task.to_string(),
            created_at: now,
            completed: false,
            completed_at: None,
        });
        Some(id)
    }

    /// Mark a step completed
    ///
    /// Returns true only when the step went from open to completed; an
    /// already-completed step keeps its original `completed_at`.
    pub fn complete(&mut self, id: &StepId, now: DateTime<Utc>) -> bool {
        match self.0.iter_mut().find(|step| &step.id == id) {
            Some(step) if !step.completed => {
                step.completed = true;
                step.completed_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Lookup by id
    #[must_use]
    pub fn get(&self, id: &StepId) -> Option<&NextStep> {
        self.0.iter().find(|step| &step.id == id)
    }

    /// Open steps, in order
    pub fn pending(&self) -> impl Iterator<Item = &NextStep> {
        self.0.iter().filter(|step| step.is_pending())
    }

    /// Number of open steps
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }

    /// All steps, in order
    pub fn iter(&self) -> impl Iterator<Item = &NextStep> {
        self.0.iter()
    }

    /// Number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no steps
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<NextStep>> for NextSteps {
    fn from(steps: Vec<NextStep>) -> Self {
        Self(steps)
    }
}

impl<'de> Deserialize<'de> for NextSteps {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(Self::decode(&raw))
    }
}

/// Three-tier colour band for counts and ages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityBand {
    Neutral,
    Low,
    Medium,
    High,
}

impl SeverityBand {
    /// Band for a pending-task count
    #[must_use]
    pub fn from_pending_count(count: usize) -> Self {
        match count {
            0 => Self::Neutral,
            1 => Self::Low,
            2 => Self::Medium,
            _ => Self::High,
        }
    }

    /// Band for a task age in days
    #[must_use]
    pub fn from_age_days(days: i64, thresholds: AgeThresholds) -> Self {
        if days <= thresholds.low_max_days {
            Self::Low
        } else if days <= thresholds.medium_max_days {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for SeverityBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day limits for age bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgeThresholds {
    /// Ages up to this many days are low
    pub low_max_days: i64,
    /// Ages up to this many days are medium; older is high
    pub medium_max_days: i64,
}

impl Default for AgeThresholds {
    fn default() -> Self {
        Self {
            low_max_days: 3,
            medium_max_days: 7,
        }
    }
}
