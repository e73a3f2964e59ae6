//! # Sweeper - tabular file cleaning and conversion
//!
//! Sweeper takes CSV and Excel (`.xlsx`) uploads, shows what is in them, applies
//! a couple of simple cleaning steps and re-encodes the result in either format.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sweeper::config::SweeperSettings;
//! use sweeper::pipeline::{SessionOptions, run_file};
//! use sweeper::table::{FileFormat, UploadedFile};
//!
//! let upload = UploadedFile::from_path("scores.csv".as_ref())?;
//! let options = SessionOptions {
//!     remove_duplicates: true,
//!     fill_missing_numeric: true,
//!     columns: Some(vec!["score".to_owned()]),
//!     target: FileFormat::Spreadsheet,
//!     ..SessionOptions::default()
//! };
//!
//! let report = run_file(&upload, &options, &SweeperSettings::default())?;
//! std::fs::write(&report.artifact.file_name, &report.artifact.bytes)?;
//! # Ok::<(), sweeper::error::SweeperError>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`table`]: the stages: decode, inspect, clean, project, chart, encode
//! - [`pipeline`]: per-file sessions, JSON plans and batch execution
//! - [`config`]: user settings
//! - [`error`]: error types and handling utilities
//! - [`logging`]: tracing subscriber setup
//!
//! ## Working on tables
//!
//! Every stage takes a `&DataFrame` and returns a new one, so stages compose
//! without aliasing surprises:
//!
//! ```
//! use polars::prelude::*;
//! use sweeper::table::{fill_missing_numeric, remove_duplicates};
//!
//! let df = df!("score" => &[Some(10i64), Some(10), None])?;
//! let (deduped, dedup) = remove_duplicates(&df)?;
//! let (filled, fill) = fill_missing_numeric(&deduped)?;
//!
//! assert_eq!(dedup.removed(), 1);
//! assert_eq!(fill.cells_filled(), 1);
//! assert_eq!(filled.column("score")?.null_count(), 0);
//! assert_eq!(df.height(), 3);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod table;
