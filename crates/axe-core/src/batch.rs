//! Sequential drivers over a list of source directories.
//!
//! Every directory is handled on its own: a failure is reported, counted and
//! the batch moves on.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::bundle::{BuildOptions, BuildOutcome, package};
use crate::catalog::Catalog;
use crate::config::RelaxeConfig;
use crate::publish::{PublishOutcome, publish_one};
use crate::reporter::Reporter;

/// Tally of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Archives written.
    pub built: usize,
    /// Archives left untouched because they already existed.
    pub skipped: usize,
    /// Archives given an identity and offered to the catalog.
    pub published: usize,
    /// Directories whose name and version were already in the catalog.
    pub already_published: usize,
    /// Directories that failed.
    pub failed: Vec<PathBuf>,
}

impl BatchSummary {
    /// Number of directories processed.
    pub fn total(&self) -> usize {
        self.built + self.skipped + self.published + self.already_published + self.failed.len()
    }

    fn fail(&mut self, dir: &Path, reason: &str, reporter: &dyn Reporter) {
        warn!("{}: {reason}", dir.display());
        reporter.failed(dir, reason);
        self.failed.push(dir.to_path_buf());
    }
}

/// Package every directory into `dest_dir`.
pub fn build_all(
    dirs: &[PathBuf],
    dest_dir: &Path,
    options: &BuildOptions,
    reporter: &dyn Reporter,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for dir in dirs {
        match package(dir, dest_dir, options) {
            Ok(packaged) => match packaged.outcome {
                BuildOutcome::Built => {
                    reporter.built(&packaged.archive_path, packaged.checksum_path.as_deref());
                    summary.built += 1;
                }
                BuildOutcome::SkippedExisting => {
                    reporter.skipped_existing(&packaged.archive_path);
                    summary.skipped += 1;
                }
            },
            Err(e) => summary.fail(dir, &e.to_string(), reporter),
        }
    }
    summary
}

/// Publish every directory to `catalog`, staging in the configured cache.
pub fn publish_all(
    dirs: &[PathBuf],
    config: &RelaxeConfig,
    catalog: &mut dyn Catalog,
    reporter: &dyn Reporter,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for dir in dirs {
        match publish_one(dir, config, catalog) {
            Ok(PublishOutcome::Published {
                descriptor,
                archive,
                recorded,
                ..
            }) => {
                let axe_id = descriptor.axe_id.as_deref().unwrap_or_default();
                reporter.published(&archive, axe_id, recorded);
                summary.published += 1;
            }
            Ok(PublishOutcome::AlreadyPublished { name, version }) => {
                reporter.already_published(&name, &version);
                summary.already_published += 1;
            }
            Err(e) => summary.fail(dir, &e.to_string(), reporter),
        }
    }
    summary
}
