//! Spreadsheet (OOXML `.xlsx`) support.
//!
//! Reading goes through `calamine`. Writing produces a minimal single-sheet
//! workbook: the package parts are XML documents streamed with `quick-xml` into
//! a `zip` archive.

use crate::error::{Result, SweeperError};
use calamine::{Data, DataType as _, Reader as _, Xlsx};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write as _};
use ::zip::ZipWriter;
use ::zip::write::SimpleFileOptions;

pub const SHEET_NAME: &str = "Sheet1";

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_SHARED_STRINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

/// Built-in `m/d/yy h:mm` number format, which readers treat as a date.
const DATETIME_NUM_FMT: &str = "22";
/// Index of the datetime entry in `cellXfs`.
const DATETIME_STYLE: &str = "1";
/// Serial number of 1970-01-01 in the 1900 date system.
const UNIX_EPOCH_SERIAL: f64 = 25_569.0;

// READING

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellColumnType {
    Int64,
    Float64,
    Boolean,
    Datetime,
    Utf8,
}

/// Decodes the first worksheet: header row, then one record per row.
pub fn read_xlsx(bytes: &[u8]) -> Result<DataFrame> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| SweeperError::Decode(format!("Failed to open spreadsheet: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SweeperError::Decode("Spreadsheet has no worksheets".to_owned()))?
        .map_err(|e| SweeperError::Decode(format!("Failed to read worksheet: {e}")))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let records: Vec<&[Data]> = rows.collect();

    let mut columns = Vec::with_capacity(header.len());
    for (idx, name) in header_names(header).iter().enumerate() {
        let cells: Vec<Option<&Data>> = records.iter().map(|row| row.get(idx)).collect();
        let series = column_to_series(name, &cells, infer_column_type(&cells))
            .map_err(|e| SweeperError::Decode(format!("Column '{name}': {e}")))?;
        columns.push(Column::from(series));
    }

    DataFrame::new(columns).map_err(|e| SweeperError::Decode(e.to_string()))
}

/// Column names from the header row.
///
/// A blank header becomes `column_<n>` (one-based). A name already taken gets
/// `_duplicated_<k>` appended, matching what the CSV reader does with repeats.
fn header_names(header: &[Data]) -> Vec<String> {
    let mut taken = HashSet::new();
    let mut repeats: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(header.len());

    for (idx, cell) in header.iter().enumerate() {
        let base = cell_text(cell).unwrap_or_else(|| format!("column_{}", idx + 1));
        let mut name = base.clone();
        while taken.contains(&name) {
            let next = repeats.entry(base.clone()).or_insert(0);
            name = format!("{base}_duplicated_{next}");
            *next += 1;
        }
        taken.insert(name.clone());
        names.push(name);
    }
    names
}

/// Empty strings only appear as placeholders for rows with no values.
fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.is_empty(),
        _ => false,
    }
}

fn is_whole(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15
}

fn cell_datetime(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::DateTime(_) => cell.as_datetime(),
        Data::DateTimeIso(text) => text.parse::<NaiveDateTime>().ok().or_else(|| {
            text.parse::<NaiveDate>()
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }),
        _ => None,
    }
}

/// Text wins over everything else; whole numbers become Int64 and a column
/// of nothing but dates becomes a datetime column.
fn infer_column_type(cells: &[Option<&Data>]) -> CellColumnType {
    let mut has_number = false;
    let mut all_whole = true;
    let mut has_bool = false;
    let mut has_date = false;

    for cell in cells.iter().flatten().filter(|c| !is_blank(c)) {
        match cell {
            Data::Int(_) => has_number = true,
            Data::Float(f) => {
                has_number = true;
                all_whole &= is_whole(*f);
            }
            Data::Bool(_) => has_bool = true,
            Data::DateTime(_) | Data::DateTimeIso(_) if cell_datetime(cell).is_some() => {
                has_date = true;
            }
            _ => return CellColumnType::Utf8,
        }
    }

    match (has_number, has_bool, has_date) {
        (false, false, true) => CellColumnType::Datetime,
        (true, false, false) if all_whole => CellColumnType::Int64,
        (true, false, false) => CellColumnType::Float64,
        (false, true, false) => CellColumnType::Boolean,
        _ => CellColumnType::Utf8,
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) if is_whole(*f) => Some(format!("{}", *f as i64)),
        Data::DateTime(_) | Data::DateTimeIso(_) => Some(match cell_datetime(cell) {
            Some(dt) if dt.time() == NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        }),
        other => Some(other.to_string()),
    }
}

fn column_to_series(
    name: &str,
    cells: &[Option<&Data>],
    kind: CellColumnType,
) -> PolarsResult<Series> {
    let cells = cells.iter().map(|c| c.filter(|cell| !is_blank(cell)));
    let series = match kind {
        CellColumnType::Int64 => {
            let values: Vec<Option<i64>> = cells
                .map(|c| match c {
                    Some(Data::Int(i)) => Some(*i),
                    Some(Data::Float(f)) => Some(*f as i64),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), values)
        }
        CellColumnType::Float64 => {
            let values: Vec<Option<f64>> = cells
                .map(|c| match c {
                    Some(Data::Int(i)) => Some(*i as f64),
                    Some(Data::Float(f)) => Some(*f),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), values)
        }
        CellColumnType::Boolean => {
            let values: Vec<Option<bool>> = cells
                .map(|c| match c {
                    Some(Data::Bool(b)) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), values)
        }
        CellColumnType::Datetime => {
            let millis: Vec<Option<i64>> = cells
                .map(|c| {
                    c.and_then(cell_datetime)
                        .map(|dt| dt.and_utc().timestamp_millis())
                })
                .collect();
            Series::new(name.into(), millis)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        }
        CellColumnType::Utf8 => {
            let values: Vec<Option<String>> = cells.map(|c| c.and_then(cell_text)).collect();
            Series::new(name.into(), values)
        }
    };
    Ok(series)
}

// WRITING

enum CellValue {
    Number(f64),
    /// Day serial, rendered with the datetime style
    Date(f64),
    Bool(bool),
    Text(u32),
}

/// Interns strings in first-seen order for `xl/sharedStrings.xml`.
#[derive(Default)]
struct SharedStrings {
    index: HashMap<String, u32>,
    ordered: Vec<String>,
    references: usize,
}

impl SharedStrings {
    fn intern(&mut self, value: &str) -> u32 {
        self.references += 1;
        if let Some(idx) = self.index.get(value) {
            return *idx;
        }
        let idx = u32::try_from(self.ordered.len()).unwrap_or(u32::MAX);
        self.index.insert(value.to_owned(), idx);
        self.ordered.push(value.to_owned());
        idx
    }
}

/// Encodes the table as a single-sheet workbook, header row first.
pub fn write_xlsx(df: &DataFrame) -> Result<Vec<u8>> {
    let mut strings = SharedStrings::default();

    let header: Vec<Option<CellValue>> = df
        .get_column_names()
        .iter()
        .map(|name| Some(CellValue::Text(strings.intern(name.as_str()))))
        .collect();

    let mut columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        columns.push(column_cells(column, &mut strings)?);
    }

    // A row whose cells are all missing would vanish from the sheet's used
    // range, so it gets an empty-string placeholder in its first cell.
    let placeholder = strings.intern("");
    let sheet = sheet_xml(&header, &columns, df.height(), placeholder)?;
    package(sheet, &strings)
}

/// Zips a worksheet and its shared strings into a workbook.
fn package(sheet: Vec<u8>, strings: &SharedStrings) -> Result<Vec<u8>> {
    let shared = shared_strings_xml(strings)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(::zip::CompressionMethod::Deflated);

    let parts: [(&str, Vec<u8>); 7] = [
        ("[Content_Types].xml", content_types_xml()?),
        ("_rels/.rels", root_rels_xml()?),
        ("xl/workbook.xml", workbook_xml()?),
        ("xl/_rels/workbook.xml.rels", workbook_rels_xml()?),
        ("xl/styles.xml", styles_xml()?),
        ("xl/sharedStrings.xml", shared),
        ("xl/worksheets/sheet1.xml", sheet),
    ];
    for (path, content) in parts {
        zip.start_file(path, options)?;
        zip.write_all(&content)?;
    }

    Ok(zip.finish()?.into_inner())
}

fn column_cells(column: &Column, strings: &mut SharedStrings) -> Result<Vec<Option<CellValue>>> {
    let series = column.as_materialized_series();
    let dtype = series.dtype();

    let cells: Vec<Option<CellValue>> = if let DataType::Datetime(unit, _) = dtype {
        let per_day = match unit {
            TimeUnit::Nanoseconds => 86_400_000_000_000.0,
            TimeUnit::Microseconds => 86_400_000_000.0,
            TimeUnit::Milliseconds => 86_400_000.0,
        };
        series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map(|t| CellValue::Date(t as f64 / per_day + UNIX_EPOCH_SERIAL)))
            .collect()
    } else if dtype.is_numeric() {
        series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|f| f.is_finite()).map(CellValue::Number))
            .collect()
    } else if dtype.is_bool() {
        series
            .bool()?
            .into_iter()
            .map(|v| v.map(CellValue::Bool))
            .collect()
    } else {
        series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map(|s| CellValue::Text(strings.intern(s))))
            .collect()
    };
    Ok(cells)
}

/// Spreadsheet column letters for a zero-based index (0 → A, 26 → AA).
pub fn column_letters(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        let rem = u8::try_from(idx % 26).unwrap_or(0);
        letters.push(char::from(b'A' + rem));
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn emit<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| SweeperError::Encode(format!("Failed to write XML: {e}")))
}

fn xml_document(build: impl FnOnce(&mut Writer<Vec<u8>>) -> Result<()>) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
    )?;
    build(&mut writer)?;
    Ok(writer.into_inner())
}

fn sheet_xml(
    header: &[Option<CellValue>],
    columns: &[Vec<Option<CellValue>>],
    height: usize,
    placeholder: u32,
) -> Result<Vec<u8>> {
    xml_document(|w| {
        emit(
            w,
            Event::Start(BytesStart::new("worksheet").with_attributes([("xmlns", NS_MAIN)])),
        )?;
        emit(w, Event::Start(BytesStart::new("sheetData")))?;

        write_row(w, 1, header.iter())?;
        let empty_row = [Some(CellValue::Text(placeholder))];
        for row_idx in 0..height {
            let is_empty = columns
                .iter()
                .all(|col| col.get(row_idx).is_none_or(Option::is_none));
            if is_empty && !columns.is_empty() {
                write_row(w, row_idx + 2, empty_row.iter())?;
                continue;
            }
            let cells = columns.iter().map(|col| col.get(row_idx).unwrap_or(&None));
            write_row(w, row_idx + 2, cells)?;
        }

        emit(w, Event::End(BytesEnd::new("sheetData")))?;
        emit(w, Event::End(BytesEnd::new("worksheet")))
    })
}

fn write_row<'a>(
    w: &mut Writer<Vec<u8>>,
    row_number: usize,
    cells: impl Iterator<Item = &'a Option<CellValue>>,
) -> Result<()> {
    let row_ref = row_number.to_string();
    emit(
        w,
        Event::Start(BytesStart::new("row").with_attributes([("r", row_ref.as_str())])),
    )?;

    for (col_idx, cell) in cells.enumerate() {
        let Some(cell) = cell else { continue };
        let cell_ref = format!("{}{row_number}", column_letters(col_idx));
        let (kind, value) = match cell {
            CellValue::Number(f) | CellValue::Date(f) => (None, f.to_string()),
            CellValue::Bool(b) => (Some("b"), if *b { "1" } else { "0" }.to_owned()),
            CellValue::Text(idx) => (Some("s"), idx.to_string()),
        };

        let mut start = BytesStart::new("c");
        start.push_attribute(("r", cell_ref.as_str()));
        if let Some(kind) = kind {
            start.push_attribute(("t", kind));
        }
        if matches!(cell, CellValue::Date(_)) {
            start.push_attribute(("s", DATETIME_STYLE));
        }
        emit(w, Event::Start(start))?;
        emit(w, Event::Start(BytesStart::new("v")))?;
        emit(w, Event::Text(BytesText::new(&value)))?;
        emit(w, Event::End(BytesEnd::new("v")))?;
        emit(w, Event::End(BytesEnd::new("c")))?;
    }

    emit(w, Event::End(BytesEnd::new("row")))
}

fn shared_strings_xml(strings: &SharedStrings) -> Result<Vec<u8>> {
    let count = strings.references.to_string();
    let unique = strings.ordered.len().to_string();
    xml_document(|w| {
        emit(
            w,
            Event::Start(BytesStart::new("sst").with_attributes([
                ("xmlns", NS_MAIN),
                ("count", count.as_str()),
                ("uniqueCount", unique.as_str()),
            ])),
        )?;
        for value in &strings.ordered {
            emit(w, Event::Start(BytesStart::new("si")))?;
            let mut text = BytesStart::new("t");
            if value.starts_with(char::is_whitespace) || value.ends_with(char::is_whitespace) {
                text.push_attribute(("xml:space", "preserve"));
            }
            emit(w, Event::Start(text))?;
            emit(w, Event::Text(BytesText::new(value)))?;
            emit(w, Event::End(BytesEnd::new("t")))?;
            emit(w, Event::End(BytesEnd::new("si")))?;
        }
        emit(w, Event::End(BytesEnd::new("sst")))
    })
}

fn content_types_xml() -> Result<Vec<u8>> {
    xml_document(|w| {
        emit(
            w,
            Event::Start(BytesStart::new("Types").with_attributes([("xmlns", NS_CONTENT_TYPES)])),
        )?;
        emit(
            w,
            Event::Empty(BytesStart::new("Default").with_attributes([
                ("Extension", "rels"),
                (
                    "ContentType",
                    "application/vnd.openxmlformats-package.relationships+xml",
                ),
            ])),
        )?;
        emit(
            w,
            Event::Empty(
                BytesStart::new("Default")
                    .with_attributes([("Extension", "xml"), ("ContentType", "application/xml")]),
            ),
        )?;
        let overrides = [
            (
                "/xl/workbook.xml",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
            ),
            (
                "/xl/worksheets/sheet1.xml",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
            ),
            (
                "/xl/styles.xml",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml",
            ),
            (
                "/xl/sharedStrings.xml",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml",
            ),
        ];
        for (part, content_type) in overrides {
            emit(
                w,
                Event::Empty(
                    BytesStart::new("Override")
                        .with_attributes([("PartName", part), ("ContentType", content_type)]),
                ),
            )?;
        }
        emit(w, Event::End(BytesEnd::new("Types")))
    })
}

fn relationships_xml(relationships: &[(&str, &str, &str)]) -> Result<Vec<u8>> {
    xml_document(|w| {
        emit(
            w,
            Event::Start(BytesStart::new("Relationships").with_attributes([("xmlns", NS_PKG_REL)])),
        )?;
        for (id, kind, target) in relationships {
            emit(
                w,
                Event::Empty(BytesStart::new("Relationship").with_attributes([
                    ("Id", *id),
                    ("Type", *kind),
                    ("Target", *target),
                ])),
            )?;
        }
        emit(w, Event::End(BytesEnd::new("Relationships")))
    })
}

fn root_rels_xml() -> Result<Vec<u8>> {
    relationships_xml(&[("rId1", REL_OFFICE_DOCUMENT, "xl/workbook.xml")])
}

fn workbook_rels_xml() -> Result<Vec<u8>> {
    relationships_xml(&[
        ("rId1", REL_WORKSHEET, "worksheets/sheet1.xml"),
        ("rId2", REL_STYLES, "styles.xml"),
        ("rId3", REL_SHARED_STRINGS, "sharedStrings.xml"),
    ])
}

fn workbook_xml() -> Result<Vec<u8>> {
    xml_document(|w| {
        emit(
            w,
            Event::Start(
                BytesStart::new("workbook")
                    .with_attributes([("xmlns", NS_MAIN), ("xmlns:r", NS_REL)]),
            ),
        )?;
        emit(w, Event::Start(BytesStart::new("sheets")))?;
        emit(
            w,
            Event::Empty(BytesStart::new("sheet").with_attributes([
                ("name", SHEET_NAME),
                ("sheetId", "1"),
                ("r:id", "rId1"),
            ])),
        )?;
        emit(w, Event::End(BytesEnd::new("sheets")))?;
        emit(w, Event::End(BytesEnd::new("workbook")))
    })
}

/// Bare minimum stylesheet: one font, fill and border, plus a general and a
/// datetime cell format.
fn styles_xml() -> Result<Vec<u8>> {
    xml_document(|w| {
        emit(
            w,
            Event::Start(BytesStart::new("styleSheet").with_attributes([("xmlns", NS_MAIN)])),
        )?;

        emit(
            w,
            Event::Start(BytesStart::new("fonts").with_attributes([("count", "1")])),
        )?;
        emit(w, Event::Start(BytesStart::new("font")))?;
        emit(
            w,
            Event::Empty(BytesStart::new("sz").with_attributes([("val", "11")])),
        )?;
        emit(
            w,
            Event::Empty(BytesStart::new("name").with_attributes([("val", "Calibri")])),
        )?;
        emit(w, Event::End(BytesEnd::new("font")))?;
        emit(w, Event::End(BytesEnd::new("fonts")))?;

        emit(
            w,
            Event::Start(BytesStart::new("fills").with_attributes([("count", "1")])),
        )?;
        emit(w, Event::Start(BytesStart::new("fill")))?;
        emit(
            w,
            Event::Empty(BytesStart::new("patternFill").with_attributes([("patternType", "none")])),
        )?;
        emit(w, Event::End(BytesEnd::new("fill")))?;
        emit(w, Event::End(BytesEnd::new("fills")))?;

        emit(
            w,
            Event::Start(BytesStart::new("borders").with_attributes([("count", "1")])),
        )?;
        emit(w, Event::Empty(BytesStart::new("border")))?;
        emit(w, Event::End(BytesEnd::new("borders")))?;

        emit(
            w,
            Event::Start(BytesStart::new("cellStyleXfs").with_attributes([("count", "1")])),
        )?;
        emit(
            w,
            Event::Empty(BytesStart::new("xf").with_attributes([
                ("numFmtId", "0"),
                ("fontId", "0"),
                ("fillId", "0"),
                ("borderId", "0"),
            ])),
        )?;
        emit(w, Event::End(BytesEnd::new("cellStyleXfs")))?;

        emit(
            w,
            Event::Start(BytesStart::new("cellXfs").with_attributes([("count", "2")])),
        )?;
        emit(
            w,
            Event::Empty(BytesStart::new("xf").with_attributes([
                ("numFmtId", "0"),
                ("fontId", "0"),
                ("fillId", "0"),
                ("borderId", "0"),
                ("xfId", "0"),
            ])),
        )?;
        emit(
            w,
            Event::Empty(BytesStart::new("xf").with_attributes([
                ("numFmtId", DATETIME_NUM_FMT),
                ("fontId", "0"),
                ("fillId", "0"),
                ("borderId", "0"),
                ("xfId", "0"),
                ("applyNumberFormat", "1"),
            ])),
        )?;
        emit(w, Event::End(BytesEnd::new("cellXfs")))?;

        emit(w, Event::End(BytesEnd::new("styleSheet")))
    })
}
