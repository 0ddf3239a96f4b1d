//! Service configuration
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! suggestion_limit = 8
//! min_suggestion_chars = 2
//! default_actor = "system"
//! placeholder_label = "Record created"
//!
//! [age_thresholds]
//! low_max_days = 3
//! medium_max_days = 7
//! ```

use pipeline_core::{AgeThresholds, ViewCalculator};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed but inconsistent
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Tunables for suggestions, age bands and activity attribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Maximum autocomplete suggestions
    pub suggestion_limit: usize,
    /// Shortest term that produces suggestions
    pub min_suggestion_chars: usize,
    /// Day limits for next-step age bands
    pub age_thresholds: AgeThresholds,
    /// Actor recorded when a caller gives none
    pub default_actor: String,
    /// Timeline placeholder for records without history
    pub placeholder_label: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            suggestion_limit: 8,
            min_suggestion_chars: 2,
            age_thresholds: AgeThresholds::default(),
            default_actor: "system".to_string(),
            placeholder_label: "Record created".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Malformed TOML, unknown keys, or inconsistent values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Unreadable file, or anything [`Self::from_toml_str`] rejects.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// Check value consistency
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let AgeThresholds {
            low_max_days,
            medium_max_days,
        } = self.age_thresholds;
        if low_max_days < 0 || medium_max_days < low_max_days {
            return Err(ConfigError::Invalid(format!(
                "age thresholds must satisfy 0 <= low ({low_max_days}) <= medium ({medium_max_days})"
            )));
        }
        if self.suggestion_limit == 0 {
            return Err(ConfigError::Invalid("suggestion_limit must be positive".to_string()));
        }
        if self.default_actor.trim().is_empty() {
            return Err(ConfigError::Invalid("default_actor must not be blank".to_string()));
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn with_suggestion_limit(mut self, limit: usize) -> Self {
        self.suggestion_limit = limit;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_min_suggestion_chars(mut self, chars: usize) -> Self {
        self.min_suggestion_chars = chars;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_age_thresholds(mut self, thresholds: AgeThresholds) -> Self {
        self.age_thresholds = thresholds;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_default_actor(mut self, actor: impl Into<String>) -> Self {
        self.default_actor = actor.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_placeholder_label(mut self, label: impl Into<String>) -> Self {
        self.placeholder_label = label.into();
        self
    }

    /// View calculator using these thresholds and label
    #[must_use]
    pub fn view_calculator(&self) -> ViewCalculator {
        ViewCalculator::new(self.age_thresholds, self.placeholder_label.clone())
    }
}
