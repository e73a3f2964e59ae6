//! Integration tests for the full conversion workflow
//!
//! These tests run fixture files through the pipeline (and the binary) and
//! check the artifacts that come out the other end.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use sweeper::config::SweeperSettings;
use sweeper::error::SweeperError;
use sweeper::pipeline::{PipelinePlan, SessionOptions, run_batch, run_file};
use sweeper::table::{DecodeOptions, FileFormat, UploadedFile, decode_table};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
}

fn load(name: &str) -> UploadedFile {
    UploadedFile::from_path(&fixture(name)).expect("fixture should be readable")
}

fn decode(bytes: &[u8], name: &str) -> DataFrame {
    decode_table(bytes, name, &DecodeOptions::default()).expect("artifact should decode")
}

fn f64_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .and_then(|c| c.as_materialized_series().cast(&DataType::Float64))
        .expect("column should be numeric")
        .f64()
        .expect("cast to f64")
        .into_iter()
        .collect()
}

#[test]
fn test_scores_dedup_fill_project_to_spreadsheet() {
    let options = SessionOptions {
        remove_duplicates: true,
        fill_missing_numeric: true,
        columns: Some(vec!["score".to_owned()]),
        target: FileFormat::Spreadsheet,
        ..SessionOptions::default()
    };

    let report = run_file(&load("scores.csv"), &options, &SweeperSettings::default())
        .expect("scores.csv should convert");

    assert_eq!(report.info.row_count, 3);
    assert_eq!(report.info.column_count, 2);
    assert_eq!(report.info.size_kib, 0);
    assert_eq!(report.artifact.file_name, "scores.xlsx");
    assert_eq!(
        report.artifact.mime_type,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let decoded = decode(&report.artifact.bytes, &report.artifact.file_name);
    let expected = df!("score" => &[10i64, 10]).expect("expected frame");
    assert!(
        decoded.equals_missing(&expected),
        "Converted workbook should hold the cleaned scores: {decoded}"
    );
}

#[test]
fn test_sales_cleaning_and_projection_to_csv() {
    let options = SessionOptions {
        remove_duplicates: true,
        fill_missing_numeric: true,
        columns: Some(vec!["region".to_owned(), "units".to_owned()]),
        show_chart: true,
        ..SessionOptions::default()
    };

    let report = run_file(&load("sales.csv"), &options, &SweeperSettings::default())
        .expect("sales.csv should convert");

    assert_eq!(report.dedup.map(|d| d.removed()), Some(1));
    let fill = report.fill.as_ref().expect("fill report");
    assert_eq!(fill.cells_filled(), 2, "units and price each had one gap left");
    let units = fill.filled.iter().find(|c| c.name == "units");
    assert_eq!(units.map(|c| c.mean), Some(7.0));

    // Only the projected numeric column is charted
    let chart = report.chart.as_ref().expect("chart requested");
    assert_eq!(chart.series.len(), 1);
    assert_eq!(chart.row_count(), 5);

    assert_eq!(report.artifact.file_name, "sales.csv");
    let decoded = decode(&report.artifact.bytes, &report.artifact.file_name);
    let names: Vec<String> = decoded
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    assert_eq!(names, vec!["region", "units"]);
    assert_eq!(
        f64_column(&decoded, "units"),
        vec![Some(5.0), Some(7.0), Some(8.0), Some(12.0), Some(3.0)]
    );
}

#[test]
fn test_sales_survives_csv_spreadsheet_csv() {
    let upload = load("sales.csv");
    let original = decode(&upload.bytes, &upload.name);

    let to_xlsx = run_file(
        &upload,
        &SessionOptions {
            target: FileFormat::Spreadsheet,
            ..SessionOptions::default()
        },
        &SweeperSettings::default(),
    )
    .expect("csv to xlsx");
    let workbook = UploadedFile::new(to_xlsx.artifact.file_name, to_xlsx.artifact.bytes);

    let back = run_file(&workbook, &SessionOptions::default(), &SweeperSettings::default())
        .expect("xlsx to csv");
    assert_eq!(back.artifact.file_name, "sales.csv");

    let decoded = decode(&back.artifact.bytes, &back.artifact.file_name);
    assert!(
        decoded.equals_missing(&original),
        "Round trip changed the table:\n{decoded}\nvs\n{original}"
    );
}

#[test]
fn test_batch_skips_unsupported_file() {
    let uploads = vec![load("scores.csv"), load("data.txt"), load("sales.csv")];
    let report = run_batch(uploads, &PipelinePlan::default(), &SweeperSettings::default());

    let converted: Vec<&str> = report
        .processed
        .iter()
        .map(|r| r.artifact.file_name.as_str())
        .collect();
    assert_eq!(converted, vec!["scores.csv", "sales.csv"]);

    assert_eq!(report.skipped.len(), 1);
    let skipped = report.skipped.first().expect("one skipped file");
    assert_eq!(skipped.name, "data.txt");
    assert!(matches!(skipped.error, SweeperError::UnsupportedFormat(ref ext) if ext == ".txt"));
    assert!(skipped.error.to_string().contains(".txt"));
}

#[test]
fn test_plan_file_overrides_per_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let plan_path = dir.path().join("plan.json");
    std::fs::write(
        &plan_path,
        r#"{
            "version": "0.1",
            "name": "mixed",
            "defaults": { "remove_duplicates": true },
            "files": {
                "sales.csv": { "columns": ["note", "order_id"], "target": "xlsx" }
            }
        }"#,
    )
    .expect("write plan");

    let plan = PipelinePlan::from_file(&plan_path).expect("plan should parse");
    let report = run_batch(
        vec![load("scores.csv"), load("sales.csv")],
        &plan,
        &SweeperSettings::default(),
    );
    assert!(report.skipped.is_empty());

    let scores = report.processed.first().expect("scores report");
    assert_eq!(scores.rows_after, 2);
    assert_eq!(scores.artifact.format, FileFormat::Csv);

    // The per-file entry replaces the defaults, so no rows are dropped
    let sales = report.processed.get(1).expect("sales report");
    assert!(sales.dedup.is_none());
    assert_eq!((sales.rows_after, sales.columns_after), (6, 2));
    assert_eq!(sales.artifact.file_name, "sales.xlsx");
}

fn sweeper_command(config_dir: &Path) -> Command {
    let config = config_dir.join("config.json");
    std::fs::write(&config, r#"{ "log_to_file": false }"#).expect("write config");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sweeper"));
    cmd.arg("--config").arg(config).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_convert_writes_artifacts() {
    let dir = tempfile::tempdir().expect("temp dir");
    let out = dir.path().join("out");

    let output = sweeper_command(dir.path())
        .arg("convert")
        .arg(fixture("scores.csv"))
        .arg(fixture("data.txt"))
        .args(["--to", "xlsx", "--dedup", "--fill-missing", "--output-dir"])
        .arg(&out)
        .output()
        .expect("run sweeper");

    assert!(output.status.success(), "One good file is enough to succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Converted 1 of 2 files"), "stdout: {stdout}");
    assert!(stdout.contains("skipped data.txt"), "stdout: {stdout}");

    let bytes = std::fs::read(out.join("scores.xlsx")).expect("artifact written");
    let decoded = decode(&bytes, "scores.xlsx");
    assert_eq!(decoded.shape(), (2, 2));
}

#[test]
fn test_cli_fails_when_every_file_fails() {
    let dir = tempfile::tempdir().expect("temp dir");

    let output = sweeper_command(dir.path())
        .arg("inspect")
        .arg(fixture("data.txt"))
        .output()
        .expect("run sweeper");

    assert!(!output.status.success());
}
