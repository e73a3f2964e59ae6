use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use sweeper::config::SweeperSettings;
use sweeper::pipeline::{
    FileSession, PipelinePlan, RunReport, SessionOptions, run_batch, validate_plan,
};
use sweeper::table::{FileFormat, UploadedFile, render_bar_chart};

#[derive(Parser)]
#[command(
    name = "sweeper",
    version,
    about = "Preview, clean and convert CSV and Excel files"
)]
pub struct Cli {
    /// Path to a JSON settings file
    #[arg(long, global = true, env = "SWEEPER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show size, shape and the first rows of each file
    Inspect {
        /// CSV or XLSX files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Number of preview rows. Defaults to the configured value.
        #[arg(short, long)]
        rows: Option<usize>,
    },
    /// Clean, project and re-encode each file
    Convert {
        /// CSV or XLSX files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format. Defaults to the configured value.
        #[arg(long, value_enum)]
        to: Option<TargetArg>,

        /// Remove duplicate rows
        #[arg(long)]
        dedup: bool,

        /// Fill missing numeric values with the column mean
        #[arg(long)]
        fill_missing: bool,

        /// Comma-separated columns to keep, in output order
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        /// Print a bar chart of the first numeric columns
        #[arg(long)]
        chart: bool,

        /// Directory for converted files. Defaults to the configured value, then `.`.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// JSON plan with per-file options, used instead of the flags above
        #[arg(long, conflicts_with_all = ["to", "dedup", "fill_missing", "columns", "chart"])]
        plan: Option<PathBuf>,
    },
    /// Print or save a plan filled with default options
    Plan {
        /// Write the plan here instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    Csv,
    Xlsx,
}

impl From<TargetArg> for FileFormat {
    fn from(target: TargetArg) -> Self {
        match target {
            TargetArg::Csv => Self::Csv,
            TargetArg::Xlsx => Self::Spreadsheet,
        }
    }
}

pub fn run_command(command: Commands, settings: &SweeperSettings) -> Result<ExitCode> {
    match command {
        Commands::Inspect { files, rows } => {
            Ok(handle_inspect(&files, rows.unwrap_or(settings.preview_rows), settings))
        }
        Commands::Convert {
            files,
            to,
            dedup,
            fill_missing,
            columns,
            chart,
            output_dir,
            plan,
        } => {
            let plan = match plan {
                Some(path) => PipelinePlan::from_file(&path)?,
                None => PipelinePlan::with_defaults(
                    "command line",
                    SessionOptions {
                        remove_duplicates: dedup,
                        fill_missing_numeric: fill_missing,
                        columns,
                        show_chart: chart,
                        target: to.map_or(settings.default_target, FileFormat::from),
                        preview_rows: None,
                    },
                ),
            };
            let output_dir = output_dir
                .or_else(|| settings.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            handle_convert(files, &plan, &output_dir, settings)
        }
        Commands::Plan { output } => handle_plan(output.as_deref(), settings),
    }
}

/// A batch only fails as a whole when it had files and none of them made it.
fn nothing_succeeded(succeeded: usize, total: usize) -> bool {
    total > 0 && succeeded == 0
}

fn exit_code(succeeded: usize, total: usize) -> ExitCode {
    if nothing_succeeded(succeeded, total) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn handle_inspect(files: &[PathBuf], rows: usize, settings: &SweeperSettings) -> ExitCode {
    let decode = settings.decode_options();
    let mut succeeded = 0;

    for path in files {
        let session = UploadedFile::from_path(path)
            .and_then(|upload| FileSession::open(&upload, &decode, SessionOptions::default()));
        match session {
            Ok(session) => {
                let info = session.info();
                println!("== {} ==", info.name);
                println!(
                    "size: {} KiB, rows: {}, columns: {}",
                    info.size_kib, info.row_count, info.column_count
                );
                println!("{}\n", session.preview(rows));
                succeeded += 1;
            }
            Err(e) => tracing::error!("Skipping {}: {e}", path.display()),
        }
    }

    exit_code(succeeded, files.len())
}

fn handle_convert(
    files: Vec<PathBuf>,
    plan: &PipelinePlan,
    output_dir: &Path,
    settings: &SweeperSettings,
) -> Result<ExitCode> {
    let errors = validate_plan(plan);
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid plan:\n{}", messages.join("\n"));
    }

    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory {}", output_dir.display())
    })?;

    let total = files.len();
    let mut uploads = Vec::with_capacity(total);
    let mut unreadable = Vec::new();
    for path in files {
        match UploadedFile::from_path(&path) {
            Ok(upload) => uploads.push(upload),
            Err(e) => unreadable.push((path.display().to_string(), e)),
        }
    }

    let mut report = run_batch(uploads, plan, settings);
    for (name, error) in unreadable {
        report.skip(name, error);
    }

    let mut written = 0;
    for run in &report.processed {
        print_run(run, settings);
        let target = output_dir.join(&run.artifact.file_name);
        match std::fs::write(&target, &run.artifact.bytes) {
            Ok(()) => {
                println!("wrote {} ({})\n", target.display(), run.artifact.mime_type);
                written += 1;
            }
            Err(e) => tracing::error!("Failed to write {}: {e}", target.display()),
        }
    }

    println!("Converted {written} of {total} files");
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.name, skipped.error);
    }

    Ok(exit_code(written, total))
}

fn print_run(run: &RunReport, settings: &SweeperSettings) {
    let info = &run.info;
    println!("== {} ==", info.name);
    println!(
        "size: {} KiB, rows: {}, columns: {}",
        info.size_kib, info.row_count, info.column_count
    );
    println!("{}", run.preview);

    if let Some(dedup) = &run.dedup {
        println!("removed {} duplicate rows", dedup.removed());
    }
    if let Some(fill) = &run.fill {
        for column in &fill.filled {
            println!(
                "filled {} missing values in '{}' with {}",
                column.cells_filled, column.name, column.mean
            );
        }
    }
    for warning in &run.warnings {
        println!("warning: {warning}");
    }
    if let Some(chart) = &run.chart {
        print!("{}", render_bar_chart(chart, settings.chart_width));
    }
    println!("{}", run.summary());
}

fn handle_plan(output: Option<&Path>, settings: &SweeperSettings) -> Result<ExitCode> {
    let plan = PipelinePlan::with_defaults(
        "default",
        SessionOptions {
            target: settings.default_target,
            ..SessionOptions::default()
        },
    );

    match output {
        Some(path) => {
            plan.to_file(path)?;
            println!("Wrote plan to {}", path.display());
        }
        None => println!("{}", plan.to_json()?),
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_convert_arguments() -> Result<()> {
        let cli = Cli::try_parse_from([
            "sweeper",
            "convert",
            "a.csv",
            "b.xlsx",
            "--to",
            "xlsx",
            "--dedup",
            "--columns",
            "score,id",
        ])?;

        match cli.command {
            Commands::Convert {
                files,
                to,
                dedup,
                fill_missing,
                columns,
                ..
            } => {
                assert_eq!(files.len(), 2);
                assert_eq!(to.map(FileFormat::from), Some(FileFormat::Spreadsheet));
                assert!(dedup);
                assert!(!fill_missing);
                assert_eq!(columns, Some(vec!["score".to_owned(), "id".to_owned()]));
            }
            _ => panic!("expected convert"),
        }
        Ok(())
    }

    #[test]
    fn test_plan_conflicts_with_flags() {
        let parsed =
            Cli::try_parse_from(["sweeper", "convert", "a.csv", "--plan", "p.json", "--dedup"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_batch_fails_only_when_nothing_succeeded() {
        assert!(!nothing_succeeded(1, 3));
        assert!(nothing_succeeded(0, 3));
        assert!(!nothing_succeeded(0, 0));
    }
}
