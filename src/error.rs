//! Centralized error handling for the sweeper pipeline.
//!
//! Every stage of the table pipeline returns [`Result`], whose error type
//! [`SweeperError`] names the failure category. The batch runner treats all of
//! them as per-file failures: the offending file is skipped and the rest of the
//! batch keeps going.
//!
//! ```
//! use sweeper::error::SweeperError;
//!
//! fn describe(err: &SweeperError) -> &'static str {
//!     match err {
//!         SweeperError::UnsupportedFormat(_) => "skipped: unsupported file type",
//!         SweeperError::Decode(_) => "skipped: unreadable content",
//!         _ => "skipped",
//!     }
//! }
//! ```
//!
//! The [`ResultExt`] trait prefixes an error message with context while keeping
//! its category, so a decode failure stays a decode failure:
//!
//! ```
//! use sweeper::error::{ResultExt as _, SweeperError};
//!
//! let raw: Result<(), SweeperError> = Err(SweeperError::Decode("bad row".to_owned()));
//! let err = raw.context("sales.csv").unwrap_err();
//! assert!(matches!(err, SweeperError::Decode(_)));
//! assert_eq!(err.to_string(), "Decode error: sales.csv: bad row");
//! ```

use std::fmt;

/// Main error type for sweeper operations.
#[derive(Debug)]
pub enum SweeperError {
    /// File extension is not one of `.csv` / `.xlsx`. Carries the dotted,
    /// lower-cased extension (empty when the name has none).
    UnsupportedFormat(String),

    /// Content could not be parsed for its declared format
    Decode(String),

    /// Table could not be serialized to the target format
    Encode(String),

    /// A selected column does not exist in the table
    UnknownColumn(String),

    /// A column was selected more than once
    DuplicateColumn(String),

    /// Pipeline plan or per-file options are invalid for this table
    InvalidPlan(String),

    /// I/O errors (reading uploads, writing artifacts)
    Io(std::io::Error),

    /// Dataframe engine errors
    DataProcessing(String),

    /// Configuration errors
    Config(String),

    /// Generic error with context
    Other(String),
}

impl SweeperError {
    /// Prefix the message with `context`, keeping the error category.
    #[must_use]
    pub fn with_prefix(self, context: &str) -> Self {
        match self {
            Self::UnsupportedFormat(ext) => Self::UnsupportedFormat(ext),
            Self::Decode(msg) => Self::Decode(format!("{context}: {msg}")),
            Self::Encode(msg) => Self::Encode(format!("{context}: {msg}")),
            Self::UnknownColumn(name) => Self::UnknownColumn(name),
            Self::DuplicateColumn(name) => Self::DuplicateColumn(name),
            Self::InvalidPlan(msg) => Self::InvalidPlan(format!("{context}: {msg}")),
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), format!("{context}: {e}"))),
            Self::DataProcessing(msg) => Self::DataProcessing(format!("{context}: {msg}")),
            Self::Config(msg) => Self::Config(format!("{context}: {msg}")),
            Self::Other(msg) => Self::Other(format!("{context}: {msg}")),
        }
    }
}

impl fmt::Display for SweeperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat(ext) => write!(f, "Unsupported file extension: {ext}"),
            Self::Decode(msg) => write!(f, "Decode error: {msg}"),
            Self::Encode(msg) => write!(f, "Encode error: {msg}"),
            Self::UnknownColumn(name) => write!(f, "Unknown column: '{name}'"),
            Self::DuplicateColumn(name) => write!(f, "Column selected more than once: '{name}'"),
            Self::InvalidPlan(msg) => write!(f, "Invalid pipeline plan: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SweeperError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SweeperError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for SweeperError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for SweeperError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<zip::result::ZipError> for SweeperError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Encode(err.to_string())
    }
}

/// Result type alias for sweeper operations.
pub type Result<T> = std::result::Result<T, SweeperError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Errors
    ///
    /// Returns the original error, converted and prefixed with `msg`.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    ///
    /// # Errors
    ///
    /// Returns the original error, converted and prefixed with the closure's output.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<SweeperError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: SweeperError = e.into();
            err.with_prefix(&msg.into())
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: SweeperError = e.into();
            err.with_prefix(&f())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SweeperError::UnsupportedFormat(".txt".to_owned());
        assert_eq!(err.to_string(), "Unsupported file extension: .txt");
    }

    #[test]
    fn test_engine_errors_are_data_processing() {
        let err: SweeperError =
            polars::error::PolarsError::ColumnNotFound("age".into()).into();
        assert!(matches!(err, SweeperError::DataProcessing(_)));
        assert!(err.to_string().contains("age"));
    }

    #[test]
    fn test_result_context_keeps_category() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file.csv",
        ));

        let result: Result<()> = result.context("Failed to read upload");
        let err = result.unwrap_err();
        assert!(matches!(err, SweeperError::Io(_)));
        assert!(err.to_string().contains("Failed to read upload"));
    }

    #[test]
    fn test_unsupported_format_is_not_prefixed() {
        let err = SweeperError::UnsupportedFormat(".txt".to_owned()).with_prefix("data.txt");
        assert_eq!(err.to_string(), "Unsupported file extension: .txt");
    }
}
