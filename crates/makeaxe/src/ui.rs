//! Console output.

use std::path::Path;

use axe_core::{BatchSummary, Reporter};
use axe_schema::{PluginName, Version};
use crossterm::style::Stylize;

/// Prints batch progress to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Note a subdirectory that `--all` passed over.
    pub fn not_an_axe(&self, dir: &Path) {
        let name = dir.file_name().map_or_else(
            || dir.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        );
        println!("{name} does not seem to be an axe directory, skipping.");
    }

    /// Final tally.
    pub fn summary(&self, summary: &BatchSummary) {
        let mut parts = Vec::new();
        if summary.built > 0 {
            parts.push(format!("{} built", summary.built));
        }
        if summary.skipped > 0 {
            parts.push(format!("{} up to date", summary.skipped));
        }
        if summary.published > 0 {
            parts.push(format!("{} published", summary.published));
        }
        if summary.already_published > 0 {
            parts.push(format!("{} already published", summary.already_published));
        }
        if !summary.failed.is_empty() {
            parts.push(format!("{} failed", summary.failed.len()));
        }
        if parts.is_empty() {
            println!("Nothing to do.");
        } else {
            println!("Done: {}.", parts.join(", "));
        }
    }
}

fn warning(msg: &str) {
    println!("{} {msg}", "Warning:".yellow());
}

fn bullet(msg: &str) {
    println!("{} {msg}", "*".green());
}

impl Reporter for ConsoleReporter {
    fn built(&self, archive: &Path, checksum: Option<&Path>) {
        bullet(&format!("Created axe in {}.", archive.display()));
        if checksum.is_none() {
            warning(&format!("no MD5 hash file for {}.", archive.display()));
        }
    }

    fn skipped_existing(&self, archive: &Path) {
        bullet(&format!("{} already exists, skipping.", archive.display()));
    }

    fn already_published(&self, name: &PluginName, version: &Version) {
        warning(&format!(
            "axe {name}-{version} is already published on Relaxe. Skipping."
        ));
    }

    fn published(&self, archive: &Path, axe_id: &str, recorded: bool) {
        bullet(&format!("Published axe {axe_id} in {}.", archive.display()));
        if !recorded {
            warning(&format!(
                "{} could not be recorded in the Relaxe catalog.",
                archive.display()
            ));
        }
    }

    fn failed(&self, source_dir: &Path, reason: &str) {
        warning(&format!(
            "could not build axe for directory {}. {reason}",
            source_dir.display()
        ));
    }
}
