//! # Sweeper command-line entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Load settings (--config, SWEEPER_CONFIG, or the default config file)
//!   ├─> Initialize logging (stderr + rotating files)
//!   └─> Run the subcommand
//! ```
//!
//! ```bash
//! sweeper inspect sales.csv --rows 10
//! sweeper convert sales.csv q1.xlsx --to xlsx --dedup --fill-missing
//! sweeper convert *.csv --plan monthly.json --output-dir out
//! ```
//!
//! The process exits with a failure status when the arguments, settings or
//! plan are invalid, or when not a single file could be converted.

#![expect(clippy::print_stdout)] // The CLI reports on stdout

mod cli;

use anyhow::Result;
use clap::Parser as _;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = cli::Cli::parse();

    let settings = sweeper::config::load_settings(cli.config.as_deref())?;

    // File logging is optional; a read-only data directory should not stop a conversion
    if let Err(e) = sweeper::logging::init(settings.log_to_file) {
        sweeper::logging::init(false)?;
        tracing::warn!("File logging disabled: {e:#}");
    }

    cli::run_command(cli.command, &settings)
}
