//! Reporter trait for batch progress.

use std::path::Path;

use axe_schema::{PluginName, Version};

/// Receives per-directory results from the batch drivers.
///
/// The core never prints; the CLI decides what a user sees.
pub trait Reporter {
    /// A fresh archive was written.
    fn built(&self, archive: &Path, checksum: Option<&Path>);

    /// The target archive already existed and was left alone.
    fn skipped_existing(&self, archive: &Path);

    /// The catalog already lists this name and version.
    fn already_published(&self, name: &PluginName, version: &Version);

    /// An archive received its final name. `recorded` is false when the
    /// catalog insert failed.
    fn published(&self, archive: &Path, axe_id: &str, recorded: bool);

    /// The directory could not be processed.
    fn failed(&self, source_dir: &Path, reason: &str);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn built(&self, _archive: &Path, _checksum: Option<&Path>) {}
    fn skipped_existing(&self, _archive: &Path) {}
    fn already_published(&self, _name: &PluginName, _version: &Version) {}
    fn published(&self, _archive: &Path, _axe_id: &str, _recorded: bool) {}
    fn failed(&self, _source_dir: &Path, _reason: &str) {}
}
