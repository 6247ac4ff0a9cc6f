//! Descriptor loading and validation.
//!
//! The descriptor lives at `content/metadata.json` in every source tree and
//! is embedded unchanged in meaning (but enriched) at the same path inside
//! every archive.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use axe_schema::{Descriptor, METADATA_PATH};
use tracing::warn;

use crate::error::BundleError;

/// Load, validate and normalise the descriptor of a source directory.
///
/// Legacy `author`/`email` fields are migrated into `authors` here, once,
/// with a deprecation warning.
///
/// # Errors
///
/// Returns [`BundleError::NotFound`] if `content/metadata.json` is missing or
/// unreadable and [`BundleError::Malformed`] if it does not parse or fails
/// validation.
pub fn load_descriptor(source_dir: &Path) -> Result<Descriptor, BundleError> {
    let path = source_dir.join(METADATA_PATH);
    let bytes = fs::read(&path).map_err(|source| BundleError::NotFound {
        path: path.clone(),
        source,
    })?;

    let descriptor = parse_validated(&bytes, &path)?;
    let (descriptor, legacy) = descriptor.migrate_legacy_author();
    if legacy.is_deprecated_use() {
        warn!(
            "author and email fields are deprecated in {}; replace them with an authors array",
            path.display()
        );
    }
    Ok(descriptor)
}

/// Read the enriched descriptor back out of a finished archive.
///
/// # Errors
///
/// Returns [`BundleError::Io`] if the archive cannot be opened,
/// [`BundleError::Archive`] if it is not a zip or lacks the metadata entry, and
/// [`BundleError::Malformed`] if the embedded descriptor is invalid.
pub fn read_embedded_descriptor(archive_path: &Path) -> Result<Descriptor, BundleError> {
    let file =
        File::open(archive_path).map_err(|e| BundleError::io("cannot open", archive_path, e))?;
    let zip_err = |source| BundleError::Archive {
        path: archive_path.to_path_buf(),
        source,
    };

    let mut archive = zip::ZipArchive::new(file).map_err(zip_err)?;
    let mut entry = archive.by_name(METADATA_PATH).map_err(zip_err)?;

    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| BundleError::io("cannot read metadata from", archive_path, e))?;

    parse_validated(&bytes, archive_path)
}

fn parse_validated(bytes: &[u8], path: &Path) -> Result<Descriptor, BundleError> {
    let malformed = |reason: String| BundleError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let descriptor: Descriptor =
        serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;
    descriptor.validate().map_err(|e| malformed(e.to_string()))?;
    Ok(descriptor)
}
