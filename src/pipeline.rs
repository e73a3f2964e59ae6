//! Per-file sessions and batch execution.
//!
//! A [`PipelinePlan`] is a versioned JSON document with default
//! [`SessionOptions`] and optional per-file overrides. Each file is opened as a
//! [`FileSession`] and run through the stages in a fixed order:
//!
//! ```text
//! decode → inspect → remove duplicates → fill missing numbers → project → chart → encode
//! ```
//!
//! Duplicates go before the fill so repeated rows never weigh on a column mean.
//!
//! # Example
//!
//! ```no_run
//! use sweeper::config::SweeperSettings;
//! use sweeper::pipeline::{PipelinePlan, SessionOptions, run_batch};
//! use sweeper::table::{FileFormat, UploadedFile};
//!
//! let plan = PipelinePlan::with_defaults(
//!     "tidy",
//!     SessionOptions {
//!         remove_duplicates: true,
//!         fill_missing_numeric: true,
//!         target: FileFormat::Spreadsheet,
//!         ..SessionOptions::default()
//!     },
//! );
//!
//! let upload = UploadedFile::from_path("sales.csv".as_ref())?;
//! let report = run_batch([upload], &plan, &SweeperSettings::default());
//! for run in &report.processed {
//!     println!("{}", run.summary());
//! }
//! # Ok::<(), sweeper::error::SweeperError>(())
//! ```

pub mod executor;
pub mod plan;
pub mod validation;

pub use executor::{BatchReport, FileSession, RunReport, SkippedFile, run_batch, run_file};
pub use plan::{PLAN_VERSION, PipelinePlan, SessionOptions};
pub use validation::{ValidationError, validate_plan, validate_session};
