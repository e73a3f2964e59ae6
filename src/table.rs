//! The table pipeline stages.
//!
//! Each stage is a free function over a [`polars::prelude::DataFrame`]:
//!
//! - [`io`]: decode uploads and encode export artifacts
//! - [`inspect`]: metadata and previews
//! - [`cleaning`]: duplicate removal and mean imputation
//! - [`projection`]: ordered column selection
//! - [`chart`]: numeric slice and text bar chart
//!
//! Stages never mutate their input; they return a new frame. The per-file
//! session in [`crate::pipeline`] owns the current frame and swaps it out.

pub mod chart;
pub mod cleaning;
pub mod inspect;
pub mod io;
pub mod projection;
pub mod types;
pub mod xlsx;

pub use chart::{CHART_SERIES_LIMIT, ChartData, ChartSeries, chart_slice, render_bar_chart};
pub use cleaning::{fill_missing_numeric, remove_duplicates};
pub use inspect::{RowPreview, preview_frame, row_preview, size_kib};
pub use io::{decode_table, detect_format, encode_table, file_extension, output_file_name};
pub use projection::{all_columns, project};
pub use types::{
    DEFAULT_INFER_SCHEMA_LENGTH, DEFAULT_PREVIEW_ROWS, DecodeOptions, DedupReport, ExportArtifact, FileFormat, FileInfo, FillReport, FilledColumn,
    UploadedFile,
};
