use super::types::{DecodeOptions, ExportArtifact, FileFormat};
use super::xlsx::{read_xlsx, write_xlsx};
use crate::error::{Result, ResultExt as _, SweeperError};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;

/// Dotted, lower-cased final extension of `name`, or an empty string.
pub fn file_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

/// # Errors
///
/// Returns [`SweeperError::UnsupportedFormat`] for anything but `.csv` / `.xlsx`.
pub fn detect_format(name: &str) -> Result<FileFormat> {
    let ext = file_extension(name);
    FileFormat::from_extension(&ext).ok_or(SweeperError::UnsupportedFormat(ext))
}

/// Decodes an uploaded file into a table, picking the reader from the file name.
///
/// # Errors
///
/// Returns [`SweeperError::UnsupportedFormat`] for unknown extensions and
/// [`SweeperError::Decode`] when the content is malformed.
pub fn decode_table(bytes: &[u8], name: &str, options: &DecodeOptions) -> Result<DataFrame> {
    let df = match detect_format(name)? {
        FileFormat::Csv => decode_csv(bytes, options),
        FileFormat::Spreadsheet => read_xlsx(bytes),
    }
    .context(name)?;

    tracing::debug!(
        file = name,
        rows = df.height(),
        columns = df.width(),
        "Decoded table"
    );
    Ok(df)
}

/// Field values read as missing, besides the empty field.
pub const CSV_NULL_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn decode_csv(bytes: &[u8], options: &DecodeOptions) -> Result<DataFrame> {
    let null_values =
        NullValues::AllColumns(CSV_NULL_TOKENS.iter().map(|&t| PlSmallStr::from(t)).collect());
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(options.infer_schema_length))
        .with_parse_options(CsvParseOptions::default().with_null_values(Some(null_values)))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
        .map_err(|e| SweeperError::Decode(format!("Failed to read CSV: {e}")))
}

/// Serializes the table into the target format with a name derived from `original_name`.
///
/// # Errors
///
/// Returns [`SweeperError::Encode`] if the writer fails.
pub fn encode_table(
    df: &DataFrame,
    format: FileFormat,
    original_name: &str,
) -> Result<ExportArtifact> {
    let bytes = match format {
        FileFormat::Csv => encode_csv(df)?,
        FileFormat::Spreadsheet => write_xlsx(df)?,
    };

    let file_name = output_file_name(original_name, format);
    tracing::debug!(
        file = original_name,
        output = file_name.as_str(),
        bytes = bytes.len(),
        "Encoded table"
    );

    Ok(ExportArtifact {
        bytes,
        format,
        file_name,
        mime_type: format.mime_type(),
    })
}

pub fn encode_csv(df: &DataFrame) -> Result<Vec<u8>> {
    let mut df = df.clone();
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)
        .map_err(|e| SweeperError::Encode(format!("Failed to write CSV: {e}")))?;
    Ok(buffer)
}

/// Replaces the trailing extension of `name` with the one for `format`.
///
/// Only the final suffix changes: `q1.csv.backup.csv` becomes
/// `q1.csv.backup.xlsx`. A name without an extension gets one appended.
pub fn output_file_name(name: &str, format: FileFormat) -> String {
    let target = format.extension().trim_start_matches('.');
    Path::new(name)
        .with_extension(target)
        .to_string_lossy()
        .into_owned()
}
