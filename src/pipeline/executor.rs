//! Pipeline execution engine.
//!
//! Runs each file through the stages in a fixed order (decode, inspect, remove
//! duplicates, fill missing numbers, project, chart, encode) and reports what
//! happened. Files are processed one after another and never share state.

use super::plan::{PipelinePlan, SessionOptions};
use super::validation::validate_session;
use crate::config::SweeperSettings;
use crate::error::{Result, SweeperError};
use crate::table::{
    ChartData, DecodeOptions, DedupReport, ExportArtifact, FileFormat, FileInfo, FillReport,
    UploadedFile, all_columns, decode_table, encode_table, fill_missing_numeric, preview_frame,
    project, remove_duplicates,
};
use polars::prelude::DataFrame;
use std::time::{Duration, Instant};

/// One file's working state: its name, size and the current table.
///
/// Every operation replaces the owned table with a new one; the upload itself
/// is never touched.
#[derive(Debug, Clone)]
pub struct FileSession {
    name: String,
    size: u64,
    table: DataFrame,
    options: SessionOptions,
}

impl FileSession {
    /// Decode `upload` and start a session over it.
    ///
    /// # Errors
    ///
    /// Returns the decoder's error for unsupported or malformed uploads.
    pub fn open(
        upload: &UploadedFile,
        decode: &DecodeOptions,
        options: SessionOptions,
    ) -> Result<Self> {
        let table = decode_table(&upload.bytes, &upload.name, decode)?;
        Ok(Self {
            name: upload.name.clone(),
            size: upload.size(),
            table,
            options,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn table(&self) -> &DataFrame {
        &self.table
    }

    /// Metadata for the table as it stands now.
    pub fn info(&self) -> FileInfo {
        FileInfo::for_table(&self.name, self.size, &self.table)
    }

    pub fn preview(&self, rows: usize) -> DataFrame {
        preview_frame(&self.table, rows)
    }

    /// # Errors
    ///
    /// Propagates engine failures; the table is left as it was.
    pub fn remove_duplicates(&mut self) -> Result<DedupReport> {
        let (table, report) = remove_duplicates(&self.table)?;
        self.table = table;
        Ok(report)
    }

    /// # Errors
    ///
    /// Propagates engine failures; the table is left as it was.
    pub fn fill_missing_numeric(&mut self) -> Result<FillReport> {
        let (table, report) = fill_missing_numeric(&self.table)?;
        self.table = table;
        Ok(report)
    }

    /// # Errors
    ///
    /// Returns [`SweeperError::UnknownColumn`] or [`SweeperError::DuplicateColumn`]
    /// for a bad selection; the table is left as it was.
    pub fn select_columns(&mut self, columns: &[String]) -> Result<()> {
        self.table = project(&self.table, columns)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if a numeric column cannot be read as `f64`.
    pub fn chart(&self) -> Result<ChartData> {
        ChartData::from_frame(&self.table)
    }

    /// # Errors
    ///
    /// Returns [`SweeperError::Encode`] if serialization fails.
    pub fn export(&self, format: FileFormat) -> Result<ExportArtifact> {
        encode_table(&self.table, format, &self.name)
    }
}

/// Report generated after one file went through the pipeline
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Metadata of the decoded table
    pub info: FileInfo,

    /// First rows of the decoded table
    pub preview: DataFrame,

    pub dedup: Option<DedupReport>,
    pub fill: Option<FillReport>,
    pub chart: Option<ChartData>,
    pub artifact: ExportArtifact,

    pub rows_before: usize,
    pub columns_before: usize,
    pub rows_after: usize,
    pub columns_after: usize,

    /// Non-fatal issues, e.g. columns the fill stage had to leave alone
    pub warnings: Vec<String>,

    pub duration: Duration,
}

impl RunReport {
    /// Create a summary message
    pub fn summary(&self) -> String {
        format!(
            "{}: {} → {} rows, {} → {} columns, wrote {} ({}), {:.2}s",
            self.info.name,
            self.rows_before,
            self.rows_after,
            self.columns_before,
            self.columns_after,
            self.artifact.file_name,
            self.artifact.format,
            self.duration.as_secs_f64()
        )
    }
}

/// Run one upload through every stage its options enable.
///
/// # Errors
///
/// Any stage failure aborts this file only. Options that name missing or
/// repeated columns are rejected with [`SweeperError::InvalidPlan`] before any
/// cleaning happens.
pub fn run_file(
    upload: &UploadedFile,
    options: &SessionOptions,
    settings: &SweeperSettings,
) -> Result<RunReport> {
    let start = Instant::now();
    let _span = tracing::info_span!("run_file", file = %upload.name).entered();

    let mut session = FileSession::open(upload, &settings.decode_options(), options.clone())?;

    let errors = validate_session(options, &all_columns(session.table()));
    if !errors.is_empty() {
        return Err(SweeperError::InvalidPlan(format!(
            "{}: {}",
            upload.name,
            errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        )));
    }

    let info = session.info();
    let preview = session.preview(options.preview_rows.unwrap_or(settings.preview_rows));
    let (rows_before, columns_before) = (info.row_count, info.column_count);
    tracing::info!(
        "Decoded {}: {rows_before} rows x {columns_before} columns ({} KiB)",
        info.name,
        info.size_kib
    );

    let mut warnings = Vec::new();

    let dedup = if options.remove_duplicates {
        Some(session.remove_duplicates()?)
    } else {
        None
    };

    let fill = if options.fill_missing_numeric {
        let report = session.fill_missing_numeric()?;
        warnings.extend(
            report
                .skipped
                .iter()
                .map(|c| format!("Column '{c}' has no values to average; left unchanged")),
        );
        Some(report)
    } else {
        None
    };

    if let Some(columns) = &options.columns {
        session.select_columns(columns)?;
    }

    let chart = if options.show_chart {
        Some(session.chart()?)
    } else {
        None
    };

    let artifact = session.export(options.target)?;
    let table = session.table();

    Ok(RunReport {
        info,
        preview,
        dedup,
        fill,
        chart,
        rows_before,
        columns_before,
        rows_after: table.height(),
        columns_after: table.width(),
        artifact,
        warnings,
        duration: start.elapsed(),
    })
}

/// A file the batch could not process.
#[derive(Debug)]
pub struct SkippedFile {
    pub name: String,
    pub error: SweeperError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<RunReport>,
    pub skipped: Vec<SkippedFile>,
}

impl BatchReport {
    /// Record a file that failed before or during processing.
    pub fn skip(&mut self, name: impl Into<String>, error: SweeperError) {
        let name = name.into();
        tracing::error!("Skipping {name}: {error}");
        self.skipped.push(SkippedFile { name, error });
    }

    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len()
    }

    /// True when there was something to do and none of it succeeded.
    pub fn all_failed(&self) -> bool {
        self.processed.is_empty() && !self.skipped.is_empty()
    }
}

/// Process uploads in order, each with the options the plan gives it.
///
/// A failing file is recorded in [`BatchReport::skipped`] and the batch moves on.
pub fn run_batch(
    uploads: impl IntoIterator<Item = UploadedFile>,
    plan: &PipelinePlan,
    settings: &SweeperSettings,
) -> BatchReport {
    let mut report = BatchReport::default();
    for upload in uploads {
        match run_file(&upload, plan.session_for(&upload.name), settings) {
            Ok(run) => {
                tracing::info!("{}", run.summary());
                for warning in &run.warnings {
                    tracing::warn!("{}: {warning}", upload.name);
                }
                report.processed.push(run);
            }
            Err(e) => report.skip(upload.name, e),
        }
    }
    report
}
