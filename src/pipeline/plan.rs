//! Pipeline plan data structures.
//!
//! A plan is a versioned JSON document holding the options a batch is processed
//! with: one set of defaults plus optional per-file overrides keyed by upload name.

use crate::error::{Result, ResultExt as _, SweeperError};
use crate::table::FileFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Current plan format version
pub const PLAN_VERSION: &str = "0.1";

/// Everything the user can choose for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionOptions {
    /// Drop repeated rows, keeping the first occurrence
    pub remove_duplicates: bool,

    /// Replace missing numeric cells with the column mean
    pub fill_missing_numeric: bool,

    /// Ordered column selection; `None` keeps every column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,

    /// Render a bar chart of the first numeric columns
    pub show_chart: bool,

    /// Export format
    pub target: FileFormat,

    /// Preview length; falls back to the configured default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_rows: Option<usize>,
}

/// Root plan structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelinePlan {
    /// Format version for future migrations
    pub version: String,

    /// Human-readable plan name
    pub name: String,

    /// Options for files without an entry in `files`
    #[serde(default)]
    pub defaults: SessionOptions,

    /// Per-file options, keyed by upload name. An entry replaces the defaults.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, SessionOptions>,
}

impl PipelinePlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: PLAN_VERSION.to_owned(),
            name: name.into(),
            defaults: SessionOptions::default(),
            files: BTreeMap::new(),
        }
    }

    /// Plan that applies `defaults` to every file.
    pub fn with_defaults(name: impl Into<String>, defaults: SessionOptions) -> Self {
        Self {
            defaults,
            ..Self::new(name)
        }
    }

    /// Options for the file called `name`.
    pub fn session_for(&self, name: &str) -> &SessionOptions {
        self.files.get(name).unwrap_or(&self.defaults)
    }

    /// Load a plan from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or
    /// [`SweeperError::InvalidPlan`] if it is not a valid plan.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan file {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Parse a plan from a JSON string
    ///
    /// # Errors
    ///
    /// Returns [`SweeperError::InvalidPlan`] if the JSON does not describe a plan.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SweeperError::InvalidPlan(format!("Failed to parse plan JSON: {e}")))
    }

    /// Save the plan to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write plan file {}", path.display()))
    }

    /// Serialize the plan to pretty JSON
    ///
    /// # Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize plan")
    }
}

impl Default for PipelinePlan {
    fn default() -> Self {
        Self::new("default")
    }
}
