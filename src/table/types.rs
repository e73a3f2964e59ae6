use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CSV_MIME: &str = "text/csv";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const DEFAULT_PREVIEW_ROWS: usize = 5;
pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 10_000;

// DATA STRUCTURES

/// Tabular encodings understood by the decoder and encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Csv,
    #[serde(alias = "xlsx", alias = "excel")]
    Spreadsheet,
}

impl FileFormat {
    /// Extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => ".csv",
            Self::Spreadsheet => ".xlsx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Csv => CSV_MIME,
            Self::Spreadsheet => XLSX_MIME,
        }
    }

    /// Maps a dotted, lower-cased extension to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            ".csv" => Some(Self::Csv),
            ".xlsx" => Some(Self::Spreadsheet),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Spreadsheet => "Excel",
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single uploaded file: its name and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk; the upload name is the path's file name.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn from_path(path: &Path) -> crate::error::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Encoded table, ready to hand to whoever delivers the download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub format: FileFormat,
    pub file_name: String,
    pub mime_type: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Rows scanned by the CSV reader to infer column types
    pub infer_schema_length: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            infer_schema_length: DEFAULT_INFER_SCHEMA_LENGTH,
        }
    }
}

/// Metadata shown next to a file's preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub size_kib: u64,
    pub row_count: usize,
    pub column_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DedupReport {
    pub rows_before: usize,
    pub rows_after: usize,
}

impl DedupReport {
    pub fn removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilledColumn {
    pub name: String,
    pub mean: f64,
    pub cells_filled: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FillReport {
    pub filled: Vec<FilledColumn>,
    /// Numeric columns left untouched because they hold no values to average
    pub skipped: Vec<String>,
}

impl FillReport {
    pub fn cells_filled(&self) -> usize {
        self.filled.iter().map(|c| c.cells_filled).sum()
    }

    pub fn is_noop(&self) -> bool {
        self.filled.is_empty()
    }
}
