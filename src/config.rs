//! Pipeline configuration.
//!
//! The column-rename mapping and the excluded-component list are explicit
//! configuration rather than constants baked into the stages. Defaults match
//! the course platform's export format: the anonymized user column is
//! renamed to `User_ID`, and the `System` and `Folder` components are
//! treated as noise. Config can be loaded from a JSON file.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::model::columns;

/// Granularity used to truncate interaction dates into pivot time buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketGranularity {
    /// One bucket per calendar day, keyed `"YYYY-MM-DD"`.
    Day,
    /// One bucket per calendar month, keyed `"YYYY-MM"`.
    #[default]
    Month,
}

impl BucketGranularity {
    /// Truncate a date to its bucket key.
    ///
    /// Keys are ISO-ordered strings, so lexicographic row sorting matches
    /// chronological order.
    pub fn bucket(&self, date: NaiveDate) -> String {
        match self {
            Self::Day => date.format("%Y-%m-%d").to_string(),
            Self::Month => format!("{:04}-{:02}", date.year(), date.month()),
        }
    }
}

/// Explicit configuration for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Source-name to canonical-name column renames, applied consistently
    /// across the three tables so downstream joins use stable keys.
    pub column_renames: BTreeMap<String, String>,
    /// Component codes flagged as system/noise; rows resolving to these are
    /// removed by the cleaner.
    pub excluded_components: BTreeSet<String>,
    /// Time-bucket granularity for the reshape stage.
    pub granularity: BucketGranularity,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut column_renames = BTreeMap::new();
        column_renames.insert(columns::SOURCE_USER.to_string(), columns::USER_ID.to_string());
        Self {
            column_renames,
            excluded_components: ["System", "Folder"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            granularity: BucketGranularity::Month,
        }
    }
}

impl PipelineConfig {
    /// Parse a config from a JSON string.
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_json_str(input: &str) -> PipelineResult<Self> {
        serde_json::from_str(input).map_err(|e| PipelineError::Config {
            message: e.to_string(),
        })
    }

    /// Load a config from a JSON file.
    pub fn from_json_path(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Whether a component code is configured as excluded.
    pub fn is_excluded(&self, code: &str) -> bool {
        self.excluded_components.contains(code)
    }
}
