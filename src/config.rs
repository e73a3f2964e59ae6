use crate::table::{DEFAULT_INFER_SCHEMA_LENGTH, DEFAULT_PREVIEW_ROWS, DecodeOptions, FileFormat};
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Overrides `preview_rows` when set to a valid count
pub const PREVIEW_ROWS_ENV: &str = "SWEEPER_PREVIEW_ROWS";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SweeperSettings {
    /// Rows shown in each file's preview (default: 5)
    pub preview_rows: usize,
    /// Rows the CSV reader scans to infer column types (default: 10000)
    pub infer_schema_length: usize,
    /// Export format when neither the command line nor a plan names one
    pub default_target: FileFormat,
    /// Where artifacts are written; the current directory when unset
    pub output_dir: Option<PathBuf>,
    /// Width of the longest bar in the text chart
    pub chart_width: usize,
    /// Whether logs also go to rotating files in the data directory
    pub log_to_file: bool,
}

impl Default for SweeperSettings {
    fn default() -> Self {
        Self {
            preview_rows: DEFAULT_PREVIEW_ROWS,
            infer_schema_length: DEFAULT_INFER_SCHEMA_LENGTH,
            default_target: FileFormat::Csv,
            output_dir: None,
            chart_width: 40,
            log_to_file: true,
        }
    }
}

impl SweeperSettings {
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            infer_schema_length: self.infer_schema_length,
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(PREVIEW_ROWS_ENV) {
            match raw.trim().parse() {
                Ok(rows) => self.preview_rows = rows,
                Err(_) => tracing::warn!("Ignoring {PREVIEW_ROWS_ENV}={raw:?}: not a row count"),
            }
        }
    }
}

/// `<config dir>/sweeper/config.json`, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sweeper").join("config.json"))
}

/// Load settings from `explicit`, else the default config file if it exists,
/// else built-in defaults. Environment overrides are applied last.
///
/// # Errors
///
/// Fails if a config file that is used cannot be read or parsed. An explicit
/// path that does not exist is an error; a missing default file is not.
pub fn load_settings(explicit: Option<&Path>) -> Result<SweeperSettings> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };

    let mut settings = match path {
        Some(path) => read_settings(&path)?,
        None => SweeperSettings::default(),
    };
    settings.apply_env_overrides();
    Ok(settings)
}

fn read_settings(path: &Path) -> Result<SweeperSettings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn save_settings(settings: &SweeperSettings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}
