//! Engine configuration.
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//! [`EngineConfig::validate`] runs before any pipeline stage and is the only
//! place a run can be aborted.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tcov_error::{Result, TcovError};

/// Default folder depth used for module bucketing.
pub const DEFAULT_MODULE_DEPTH: i64 = 2;
/// Default number of tags listed in the report.
pub const DEFAULT_TOP_TAGS_LIMIT: usize = 20;
/// Default number of calendar days listed under recent activity.
pub const DEFAULT_RECENT_ACTIVITY_LIMIT: usize = 10;

/// A tag that classifies a case into a labeled bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagLabel {
    pub tag: String,
    pub label: String,
}

impl TagLabel {
    pub fn new(tag: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Leading folder segments that form a module bucket. Signed so that a
    /// non-positive value in the file is reported instead of failing to parse.
    pub module_depth: i64,
    /// Prefix stripped from entity paths. Falls back to the snapshot's own
    /// `project_root` when unset.
    pub project_root: Option<String>,
    pub top_tags_limit: usize,
    pub recent_activity_limit: usize,
    /// Checked in order; the first tag a case carries decides its priority.
    pub priority_tags: Vec<TagLabel>,
    /// Checked in order; the first tag a case carries decides its type.
    pub test_type_tags: Vec<TagLabel>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            module_depth: DEFAULT_MODULE_DEPTH,
            project_root: None,
            top_tags_limit: DEFAULT_TOP_TAGS_LIMIT,
            recent_activity_limit: DEFAULT_RECENT_ACTIVITY_LIMIT,
            priority_tags: vec![
                TagLabel::new("p1", "P1 (Critical)"),
                TagLabel::new("p2", "P2 (High)"),
                TagLabel::new("p3", "P3 (Medium)"),
            ],
            test_type_tags: vec![
                TagLabel::new("ui", "UI Tests"),
                TagLabel::new("api", "API Tests"),
                TagLabel::new("smoke", "Smoke Tests"),
                TagLabel::new("regression", "Regression Tests"),
                TagLabel::new("integration", "Integration Tests"),
            ],
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|error| TcovError::ConfigDecode {
            detail: error.to_string(),
        })
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check every value the aggregation depends on.
    ///
    /// Returns the module depth as a validated `usize`.
    pub fn validate(&self) -> Result<usize> {
        let depth = module_depth(self.module_depth)?;
        for (list_name, list) in [
            ("priority_tags", &self.priority_tags),
            ("test_type_tags", &self.test_type_tags),
        ] {
            if let Some(entry) = list.iter().find(|entry| entry.tag.trim().is_empty()) {
                return Err(TcovError::config(format!(
                    "{list_name} entry '{}' has an empty tag",
                    entry.label
                )));
            }
        }
        Ok(depth)
    }
}

/// Validate a raw module depth.
pub fn module_depth(depth: i64) -> Result<usize> {
    if depth < 1 {
        return Err(TcovError::InvalidModuleDepth { depth });
    }
    usize::try_from(depth).map_err(|_| TcovError::InvalidModuleDepth { depth })
}
