//! Stage model
//!
//! Each pipeline kind has a closed set of stages. Some stages declare
//! sub-detail options (the reason a lead went cold, why a posting closed);
//! all others accept an empty detail only. Lookups for unknown stage names
//! are permissive and report no options.

use crate::error::ValidationError;
use crate::types::RecordKind;

/// One stage and its detail options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDef {
    /// Stage name as stored on the record
    pub name: &'static str,
    /// Valid `stage_detail` values; empty when the stage takes none
    pub details: &'static [&'static str],
}

/// Closed stage set for one pipeline kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageModel {
    kind: RecordKind,
    stages: &'static [StageDef],
}

const NO_DETAILS: &[&str] = &[];

const LEAD_STAGES: &[StageDef] = &[
    StageDef {
        name: "Initial Outreach",
        details: NO_DETAILS,
    },
    StageDef {
        name: "Not Interested",
        details: &[
            "No Hiring Needs",
            "No Budget",
            "Bad Timing",
            "Went With Another Provider",
            "Other",
        ],
    },
    StageDef {
        name: "Active Lead",
        details: NO_DETAILS,
    },
    StageDef {
        name: "Close Won",
        details: NO_DETAILS,
    },
    StageDef {
        name: "Close Loss",
        details: &[
            "Filled Internally",
            "Budget Cut",
            "Went With Another Provider",
            "Unresponsive",
            "Other",
        ],
    },
];

const JOB_POSTING_STAGES: &[StageDef] = &[
    StageDef {
        name: "Open",
        details: NO_DETAILS,
    },
    StageDef {
        name: "Interviewing",
        details: NO_DETAILS,
    },
    StageDef {
        name: "Offer Extended",
        details: NO_DETAILS,
    },
    StageDef {
        name: "Filled",
        details: NO_DETAILS,
    },
    StageDef {
        name: "Closed",
        details: &["Filled Externally", "Position Cancelled", "Expired", "Other"],
    },
];

/// Lead pipeline
pub static LEAD_MODEL: StageModel = StageModel {
    kind: RecordKind::Lead,
    stages: LEAD_STAGES,
};

/// Job posting pipeline
pub static JOB_POSTING_MODEL: StageModel = StageModel {
    kind: RecordKind::JobPosting,
    stages: JOB_POSTING_STAGES,
};

impl StageModel {
    /// Model for a pipeline kind
    #[inline]
    #[must_use]
    pub fn for_kind(kind: RecordKind) -> &'static StageModel {
        match kind {
            RecordKind::Lead => &LEAD_MODEL,
            RecordKind::JobPosting => &JOB_POSTING_MODEL,
        }
    }

    /// Pipeline kind this model describes
    #[inline]
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Stage assigned to new records (first in the set)
    #[inline]
    #[must_use]
    pub fn default_stage(&self) -> &'static str {
        self.stages[0].name
    }

    /// Stage names in pipeline order
    pub fn stages(&self) -> impl Iterator<Item = &'static str> {
        self.stages.iter().map(|def| def.name)
    }

    /// Whether `stage` belongs to the set
    #[inline]
    #[must_use]
    pub fn is_member(&self, stage: &str) -> bool {
        self.find(stage).is_some()
    }

    /// Detail options; unknown stages have none
    #[must_use]
    pub fn detail_options(&self, stage: &str) -> &'static [&'static str] {
        self.find(stage).map_or(NO_DETAILS, |def| def.details)
    }

    /// Whether a stage needs a detail to be chosen
    #[inline]
    #[must_use]
    pub fn requires_detail(&self, stage: &str) -> bool {
        !self.detail_options(stage).is_empty()
    }

    /// Check a `stage_detail` value against the stage's options
    ///
    /// # Errors
    /// Missing detail for a stage with options, a detail outside the
    /// options, or any detail for a stage without options.
    pub fn validate_detail(&self, stage: &str, detail: &str) -> Result<(), ValidationError> {
        let options = self.detail_options(stage);
        let detail = detail.trim();
        match (options.is_empty(), detail.is_empty()) {
            (true, true) => Ok(()),
            (true, false) => Err(ValidationError::UnexpectedStageDetail {
                stage: stage.to_string(),
                detail: detail.to_string(),
            }),
            (false, true) => Err(ValidationError::MissingStageDetail {
                stage: stage.to_string(),
                options: options.join(", "),
            }),
            (false, false) if options.contains(&detail) => Ok(()),
            (false, false) => Err(ValidationError::InvalidStageDetail {
                stage: stage.to_string(),
                detail: detail.to_string(),
            }),
        }
    }

    fn find(&self, stage: &str) -> Option<&'static StageDef> {
        self.stages.iter().find(|def| def.name == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_stage_membership() {
        let model = StageModel::for_kind(RecordKind::Lead);
        for stage in [
            "Initial Outreach",
            "Not Interested",
            "Active Lead",
            "Close Won",
            "Close Loss",
        ] {
            assert!(model.is_member(stage), "{stage} should be a lead stage");
        }
        assert!(!model.is_member("Open"));
        assert!(!model.is_member("active lead"));
        assert_eq!(model.default_stage(), "Initial Outreach");
    }

    #[test]
    fn job_posting_uses_its_own_set() {
        let model = StageModel::for_kind(RecordKind::JobPosting);
        assert_eq!(model.default_stage(), "Open");
        assert!(model.is_member("Filled"));
        assert!(!model.is_member("Active Lead"));
        assert_eq!(model.stages().count(), 5);
    }

    #[test]
    fn unknown_stage_has_no_options() {
        let model = StageModel::for_kind(RecordKind::Lead);
        assert!(model.detail_options("Somewhere Else").is_empty());
        assert!(model.validate_detail("Somewhere Else", "").is_ok());
    }

    #[test]
    fn detail_rules() {
        let model = StageModel::for_kind(RecordKind::Lead);
        assert!(model.requires_detail("Close Loss"));
        assert!(!model.requires_detail("Active Lead"));

        assert!(model.validate_detail("Close Loss", "Budget Cut").is_ok());
        assert!(matches!(
            model.validate_detail("Close Loss", ""),
            Err(ValidationError::MissingStageDetail { .. })
        ));
        assert!(matches!(
            model.validate_detail("Close Loss", "Because"),
            Err(ValidationError::InvalidStageDetail { .. })
        ));
        assert!(matches!(
            model.validate_detail("Active Lead", "Budget Cut"),
            Err(ValidationError::UnexpectedStageDetail { .. })
        ));
    }
}
