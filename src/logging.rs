//! Logging setup for the `sweeper` binary
//!
//! Console output goes to stderr so it never mixes with previews and charts on
//! stdout. When file logging is enabled, two daily-rotating files are written
//! to the platform data directory:
//!
//! - `sweeper.<date>.log`: everything the filter lets through
//! - `error.<date>.log`: warnings and errors only (skipped files end up here)
//!
//! The filter defaults to `info` and can be overridden with `RUST_LOG`.
//!
//! ```no_run
//! sweeper::logging::init(true).expect("Failed to initialize logging");
//! tracing::info!("ready");
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

const MAX_LOG_FILES: usize = 10;

fn log_dir_under(base: &Path) -> PathBuf {
    base.join("sweeper").join("logs")
}

/// Gets the log directory, creating it if needed
///
/// Returns:
/// - Windows: `%APPDATA%/sweeper/logs`
/// - macOS: `~/Library/Application Support/sweeper/logs`
/// - Linux: `~/.local/share/sweeper/logs`
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    let log_dir = log_dir_under(&base_dir);

    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }

    Ok(log_dir)
}

fn rolling_appender(log_dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("Failed to create {prefix} log file appender"))
}

/// Installs the global subscriber. Call once, before any work starts.
///
/// # Errors
///
/// Returns error if the log directory or file appenders cannot be created, or
/// if a global subscriber is already installed.
pub fn init(log_to_file: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let (file_layers, log_dir) = if log_to_file {
        let log_dir = get_log_dir()?;
        let all_logs = fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false)
            .with_writer(rolling_appender(&log_dir, "sweeper")?);
        let error_logs = fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false)
            .with_writer(rolling_appender(&log_dir, "error")?)
            .with_filter(EnvFilter::new("warn"));
        (Some(all_logs.and_then(error_logs)), Some(log_dir))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(dir) = log_dir {
        tracing::debug!("Logging initialized, log directory: {}", dir.display());
    }

    Ok(())
}
