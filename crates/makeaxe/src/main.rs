//! makeaxe - package and publish Tomahawk resolver bundles

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use makeaxe::ui::ConsoleReporter;
use makeaxe::{Cli, PROGRAM_NAME, run};
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if cli.version {
        println!("{PROGRAM_NAME}, version {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    let reporter = ConsoleReporter;
    let summary = match run(&cli, &reporter) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {e}.");
            eprintln!("See {PROGRAM_NAME} --help for usage information.");
            return Ok(ExitCode::from(2));
        }
    };

    reporter.summary(&summary);
    std::io::stdout()
        .flush()
        .context("failed to flush standard output")?;
    Ok(ExitCode::SUCCESS)
}
