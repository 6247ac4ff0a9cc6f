//! makeaxe - package Tomahawk resolvers into axes and publish them to Relaxe.
//!
//! In directory mode every SOURCE is packaged into DESTINATION (default: the
//! source directory itself). With `--relaxe` the second argument is a Relaxe
//! config file and every SOURCE is staged in the configured cache, named
//! after a fresh UUID and recorded in the catalog.

use std::path::{Path, PathBuf};

use axe_core::{BatchSummary, BuildOptions, RelaxeConfig, build_all, publish_all};
use clap::Parser;
use thiserror::Error;
use tracing::debug;

pub mod discover;
pub mod ui;

use ui::ConsoleReporter;

/// Program name as shown in `--version`.
pub const PROGRAM_NAME: &str = "makeaxe";

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "makeaxe")]
#[command(about = "makeaxe - package and publish Tomahawk resolver bundles (axes)")]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Build all the resolvers in SOURCE's subdirectories
    #[arg(short, long)]
    pub all: bool,

    /// Skip adding the git revision hash to a bundle
    #[arg(short, long)]
    pub release: bool,

    /// Overwrite a bundle of the same name and version in the destination
    #[arg(short, long)]
    pub force: bool,

    /// Publish to the Relaxe instance described by CONFIG; implies --release
    /// and ignores --force
    #[arg(short = 'x', long)]
    pub relaxe: bool,

    /// Show version information
    #[arg(short = 'v', long)]
    pub version: bool,

    /// The unpackaged resolver directory, or with --all the directory holding
    /// several of them
    #[arg(value_name = "SOURCE")]
    pub source: Option<PathBuf>,

    /// Where new axes go (default: SOURCE), or with --relaxe the path of the
    /// Relaxe configuration file
    #[arg(value_name = "DESTINATION|CONFIG")]
    pub target: Option<PathBuf>,
}

impl Cli {
    /// Packaging switches for directory mode.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            release: self.release,
            force: self.force,
        }
    }
}

/// Problems detected before any directory is processed.
#[derive(Error, Debug)]
pub enum UsageError {
    /// No SOURCE argument.
    #[error("a source directory must be specified")]
    MissingSource,

    /// SOURCE is not an existing directory.
    #[error("bad source directory path {}", .0.display())]
    BadSource(PathBuf),

    /// SOURCE's subdirectories could not be listed.
    #[error("cannot list {}: {reason}", path.display())]
    Discovery {
        /// Directory being scanned.
        path: PathBuf,
        /// Underlying error.
        reason: String,
    },

    /// DESTINATION is not an existing directory.
    #[error("bad destination directory path {}", .0.display())]
    BadDestination(PathBuf),

    /// `--relaxe` without CONFIG.
    #[error("source or Relaxe configuration file path missing")]
    MissingConfig,

    /// CONFIG is not an existing file.
    #[error("bad Relaxe configuration file path {}", .0.display())]
    BadConfigPath(PathBuf),

    /// CONFIG could not be loaded or its cache directory created.
    #[error(transparent)]
    Config(#[from] axe_core::config::ConfigError),

    /// The catalog database could not be opened.
    #[error("cannot connect to Relaxe database: {0}")]
    Catalog(#[from] axe_core::CatalogError),
}

/// Validate arguments and run the requested batch.
///
/// # Errors
///
/// Returns a [`UsageError`] for anything wrong with the arguments, the config
/// file or the catalog connection. Per-directory failures are reported via
/// `reporter` and counted in the summary instead.
pub fn run(cli: &Cli, reporter: &ConsoleReporter) -> Result<BatchSummary, UsageError> {
    let source = cli.source.as_deref().ok_or(UsageError::MissingSource)?;
    let source = absolute_dir(source).ok_or_else(|| UsageError::BadSource(source.to_path_buf()))?;

    let dirs = if cli.all {
        let found = discover::discover(&source).map_err(|e| UsageError::Discovery {
            path: source.clone(),
            reason: e.to_string(),
        })?;
        for dir in &found.skipped {
            reporter.not_an_axe(dir);
        }
        found.plugins
    } else {
        vec![source.clone()]
    };
    debug!("processing {} source directories", dirs.len());

    if cli.relaxe {
        let config_path = cli.target.as_deref().ok_or(UsageError::MissingConfig)?;
        if !config_path.is_file() {
            return Err(UsageError::BadConfigPath(config_path.to_path_buf()));
        }
        let config = RelaxeConfig::load(config_path)?;
        config.ensure_cache_directory()?;
        let mut catalog = config.database.open_catalog()?;
        debug!("staging axes in {}", config.cache_directory.display());

        Ok(publish_all(&dirs, &config, &mut catalog, reporter))
    } else {
        let dest = match cli.target.as_deref() {
            Some(dest) => {
                absolute_dir(dest).ok_or_else(|| UsageError::BadDestination(dest.to_path_buf()))?
            }
            None => source,
        };
        Ok(build_all(&dirs, &dest, &cli.build_options(), reporter))
    }
}

fn absolute_dir(path: &Path) -> Option<PathBuf> {
    let path = std::path::absolute(path).ok()?;
    path.is_dir().then_some(path)
}
