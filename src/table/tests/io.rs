use crate::error::SweeperError;
use crate::table::io::{decode_csv, encode_csv};
use crate::table::xlsx::{read_xlsx, write_xlsx};
use crate::table::*;
use anyhow::Result;
use polars::prelude::*;

const SALES_CSV: &str = "id,name,price\n1,apple,2.5\n2,\"pear, green\",3.75\n3,,10.125\n";

fn decode(bytes: &[u8], name: &str) -> crate::error::Result<DataFrame> {
    decode_table(bytes, name, &DecodeOptions::default())
}

#[test]
fn test_detect_format() {
    assert_eq!(detect_format("data.csv").ok(), Some(FileFormat::Csv));
    assert_eq!(detect_format("DATA.XLSX").ok(), Some(FileFormat::Spreadsheet));
    assert_eq!(detect_format("archive.xlsx.csv").ok(), Some(FileFormat::Csv));

    match detect_format("data.txt") {
        Err(SweeperError::UnsupportedFormat(ext)) => assert_eq!(ext, ".txt"),
        other => panic!("expected unsupported format, got {other:?}"),
    }
    match detect_format("README") {
        Err(SweeperError::UnsupportedFormat(ext)) => assert_eq!(ext, ""),
        other => panic!("expected unsupported format, got {other:?}"),
    }
}

#[test]
fn test_decode_csv_infers_types() -> Result<()> {
    let df = decode(SALES_CSV.as_bytes(), "sales.csv")?;

    assert_eq!(df.height(), 3);
    assert_eq!(df.width(), 3);
    assert_eq!(df.column("id")?.dtype(), &DataType::Int64);
    assert_eq!(df.column("name")?.dtype(), &DataType::String);
    assert_eq!(df.column("price")?.dtype(), &DataType::Float64);

    let names = df.column("name")?.as_materialized_series().clone();
    let names = names.str()?;
    assert_eq!(names.get(1), Some("pear, green"));
    assert_eq!(names.get(2), None);
    Ok(())
}

#[test]
fn test_decode_csv_reads_na_tokens_as_missing() -> Result<()> {
    let df = decode(
        b"id,score,note\n1,10,NA\n2,N/A,ok\n3,null,#N/A\n4,20,NULL\n",
        "na.csv",
    )?;

    assert_eq!(df.column("score")?.dtype(), &DataType::Int64);
    assert_eq!(df.column("score")?.null_count(), 2);
    assert_eq!(df.column("note")?.null_count(), 3);

    let (filled, report) = fill_missing_numeric(&df)?;
    let score = report.filled.iter().find(|c| c.name == "score");
    assert_eq!(score.map(|c| (c.mean, c.cells_filled)), Some((15.0, 2)));
    assert_eq!(filled.column("score")?.null_count(), 0);
    Ok(())
}

#[test]
fn test_decode_csv_nan_does_not_poison_the_mean() -> Result<()> {
    let df = decode(b"id,score\n1,10\n2,NaN\n3,\n", "scores.csv")?;
    assert_eq!(df.column("score")?.null_count(), 2);

    let (filled, report) = fill_missing_numeric(&df)?;
    let score = report.filled.iter().find(|c| c.name == "score");
    assert_eq!(score.map(|c| c.mean), Some(10.0));

    let values: Vec<Option<f64>> = filled
        .column("score")?
        .as_materialized_series()
        .f64()?
        .into_iter()
        .collect();
    assert_eq!(values, vec![Some(10.0), Some(10.0), Some(10.0)]);
    Ok(())
}

#[test]
fn test_decode_unsupported_extension() {
    let err = decode(b"a,b\n1,2\n", "data.txt").unwrap_err();
    assert!(matches!(err, SweeperError::UnsupportedFormat(ref ext) if ext == ".txt"));
    assert!(err.to_string().contains(".txt"));
}

#[test]
fn test_decode_corrupt_spreadsheet() {
    let err = decode(b"definitely not a zip archive", "broken.xlsx").unwrap_err();
    assert!(matches!(err, SweeperError::Decode(_)));
    assert!(err.to_string().contains("broken.xlsx"));
}

#[test]
fn test_csv_round_trip() -> Result<()> {
    let original = decode(SALES_CSV.as_bytes(), "sales.csv")?;

    let artifact = encode_table(&original, FileFormat::Csv, "sales.csv")?;
    let decoded = decode(&artifact.bytes, &artifact.file_name)?;

    assert_eq!(decoded.shape(), original.shape());
    assert!(decoded.equals_missing(&original));
    Ok(())
}

#[test]
fn test_spreadsheet_round_trip() -> Result<()> {
    let original = df!(
        "id" => &[1i64, 2, 3],
        "label" => &[Some("a"), None, Some("b c")],
        "ratio" => &[Some(0.5f64), Some(1.25), None],
        "flag" => &[true, false, true]
    )?;

    let artifact = encode_table(&original, FileFormat::Spreadsheet, "book.xlsx")?;
    let decoded = decode(&artifact.bytes, &artifact.file_name)?;

    assert_eq!(decoded.shape(), original.shape());
    assert!(decoded.equals_missing(&original));
    Ok(())
}

#[test]
fn test_spreadsheet_keeps_rows_with_no_values() -> Result<()> {
    let original = df!(
        "id" => &[Some(1i64), None, Some(3), None],
        "label" => &[Some("a"), None, Some("c"), None]
    )?;

    let decoded = read_xlsx(&write_xlsx(&original)?)?;

    assert_eq!(decoded.height(), 4, "Empty rows, trailing one included, survive");
    assert!(decoded.equals_missing(&original), "{decoded}");
    Ok(())
}

#[test]
fn test_spreadsheet_dates_stay_dates() -> Result<()> {
    // 2024-01-15 00:00 and 2024-03-01 12:00 UTC
    let original = DataFrame::new(vec![
        Series::new("when".into(), &[Some(1_705_276_800_000i64), None, Some(1_709_294_400_000)])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            .into(),
        Series::new("n".into(), &[1i64, 2, 3]).into(),
    ])?;

    let artifact = encode_table(&original, FileFormat::Spreadsheet, "events.csv")?;
    let decoded = decode(&artifact.bytes, &artifact.file_name)?;

    assert_eq!(
        decoded.column("when")?.dtype(),
        &DataType::Datetime(TimeUnit::Milliseconds, None)
    );
    assert!(decoded.equals_missing(&original), "{decoded}");
    Ok(())
}

#[test]
fn test_cross_format_round_trip() -> Result<()> {
    let original = decode(SALES_CSV.as_bytes(), "sales.csv")?;

    let workbook = encode_table(&original, FileFormat::Spreadsheet, "sales.csv")?;
    assert_eq!(workbook.file_name, "sales.xlsx");
    let from_workbook = decode(&workbook.bytes, &workbook.file_name)?;

    let csv = encode_table(&from_workbook, FileFormat::Csv, &workbook.file_name)?;
    assert_eq!(csv.file_name, "sales.csv");
    let back = decode(&csv.bytes, &csv.file_name)?;

    let names: Vec<String> = back
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    assert_eq!(names, vec!["id", "name", "price"]);
    assert!(back.equals_missing(&original));
    assert_eq!(csv.bytes, encode_csv(&original)?);
    Ok(())
}

#[test]
fn test_encode_csv_quotes_when_needed() -> Result<()> {
    let df = df!(
        "text" => &["plain", "a,b", "say \"hi\"", "line\nbreak"]
    )?;

    let bytes = encode_csv(&df)?;
    let text = String::from_utf8(bytes.clone())?;

    assert!(text.starts_with("text\nplain\n"));
    assert!(text.contains("\"a,b\""));
    assert!(text.contains("\"say \"\"hi\"\"\""));
    assert!(text.contains("\"line\nbreak\""));

    let decoded = decode_csv(&bytes, &DecodeOptions::default())?;
    assert!(decoded.equals_missing(&df));
    Ok(())
}

#[test]
fn test_spreadsheet_mixed_column_reads_as_text() -> Result<()> {
    let df = df!("code" => &["7", "x9"])?;
    let decoded = read_xlsx(&write_xlsx(&df)?)?;
    assert_eq!(decoded.column("code")?.dtype(), &DataType::String);
    assert!(decoded.equals_missing(&df));
    Ok(())
}

#[test]
fn test_spreadsheet_with_no_rows() -> Result<()> {
    let df = df!("a" => Vec::<i64>::new(), "b" => Vec::<String>::new())?;
    let decoded = read_xlsx(&write_xlsx(&df)?)?;
    assert_eq!(decoded.height(), 0);
    assert_eq!(decoded.width(), 2);
    Ok(())
}

#[test]
fn test_artifact_metadata() -> Result<()> {
    let df = df!("a" => &[1i64])?;

    let csv = encode_table(&df, FileFormat::Csv, "report.xlsx")?;
    assert_eq!(csv.file_name, "report.csv");
    assert_eq!(csv.mime_type, "text/csv");
    assert_eq!(csv.format, FileFormat::Csv);

    let xlsx = encode_table(&df, FileFormat::Spreadsheet, "report.csv")?;
    assert_eq!(xlsx.file_name, "report.xlsx");
    assert_eq!(
        xlsx.mime_type,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert!(xlsx.bytes.starts_with(b"PK"));
    Ok(())
}

#[test]
fn test_output_file_name_replaces_suffix_only() {
    assert_eq!(
        output_file_name("q1.csv.backup.csv", FileFormat::Spreadsheet),
        "q1.csv.backup.xlsx"
    );
    assert_eq!(output_file_name("Data.CSV", FileFormat::Spreadsheet), "Data.xlsx");
    assert_eq!(output_file_name("sheet.xlsx", FileFormat::Csv), "sheet.csv");
    assert_eq!(output_file_name("noext", FileFormat::Csv), "noext.csv");
}
