//! Bundle construction.
//!
//! [`package`] turns a plugin source directory into `<pluginName>-<version>.axe`
//! plus a `<pluginName>-<version>.md5` sidecar:
//!
//! 1. Load and validate `content/metadata.json`.
//! 2. Skip if the target archive already exists (unless forced).
//! 3. Stamp the descriptor with the packaging time, the bundle format version
//!    and, outside release builds, the git revision.
//! 4. Resolve the manifest against `content/`.
//! 5. Write every manifest file, then the enriched descriptor, into a zip.
//! 6. Hash the archive into the sidecar.
//!
//! The archive is assembled in a temporary file in the destination directory
//! and moved to its final name only once complete, so a failed build never
//! leaves a file at the target path.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use axe_schema::{Descriptor, Manifest, METADATA_PATH};
use tracing::{debug, info, warn};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::BundleError;
use crate::metadata::load_descriptor;
use crate::paths::{archive_file_name, content_entry, sidecar_path};
use crate::{checksum, revision};

/// Per-run packaging switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Release build: never embed a source-control revision.
    pub release: bool,
    /// Rebuild even if an archive with the same name already exists.
    pub force: bool,
}

impl BuildOptions {
    /// Options used when staging archives for the catalog.
    pub fn publish() -> Self {
        Self {
            release: true,
            force: false,
        }
    }
}

/// Whether [`package`] wrote anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// A fresh archive was written.
    Built,
    /// An archive already occupied the target path and was left untouched.
    SkippedExisting,
}

/// Result of a successful [`package`] call.
#[derive(Debug, Clone)]
pub struct Packaged {
    /// The enriched descriptor for [`BuildOutcome::Built`]; the descriptor as
    /// loaded from the source tree for [`BuildOutcome::SkippedExisting`].
    pub descriptor: Descriptor,
    /// Path of the archive (fresh or pre-existing).
    pub archive_path: PathBuf,
    /// Path of the checksum sidecar, if one was written by this call.
    pub checksum_path: Option<PathBuf>,
    /// What happened.
    pub outcome: BuildOutcome,
}

/// Package `source_dir` into an archive under `dest_dir`.
///
/// # Errors
///
/// Returns [`BundleError::NotFound`] or [`BundleError::Malformed`] for
/// descriptor problems, [`BundleError::MissingEntry`] when a manifest file is
/// absent, and [`BundleError::Io`] / [`BundleError::Archive`] when the
/// archive cannot be written. A checksum failure is logged, not returned.
pub fn package(
    source_dir: &Path,
    dest_dir: &Path,
    options: &BuildOptions,
) -> Result<Packaged, BundleError> {
    let mut descriptor = load_descriptor(source_dir)?;

    let archive_name = archive_file_name(&descriptor.versioned_stem());
    let archive_path = dest_dir.join(&archive_name);

    // An undeterminable target counts as occupied.
    let occupied = archive_path.try_exists().unwrap_or(true);
    if occupied && !options.force {
        info!("{archive_name} already exists, skipping");
        return Ok(Packaged {
            descriptor,
            archive_path,
            checksum_path: None,
            outcome: BuildOutcome::SkippedExisting,
        });
    }

    let revision = if options.release {
        None
    } else {
        match revision::short_revision(source_dir) {
            Ok(rev) => Some(rev),
            Err(e) => {
                warn!(
                    "cannot get revision hash for {}: {e}",
                    descriptor.versioned_stem()
                );
                None
            }
        }
    };
    descriptor.stamp(chrono::Utc::now().timestamp(), revision);

    let metadata = descriptor
        .to_pretty_json()
        .map_err(|e| BundleError::Malformed {
            path: source_dir.join(METADATA_PATH),
            reason: e.to_string(),
        })?;

    let entries = resolve_entries(&descriptor.manifest);

    if occupied {
        // The old sidecar goes with the old archive so a failed hash never
        // leaves a stale digest beside the new one.
        for stale in [archive_path.clone(), sidecar_path(&archive_path)] {
            match fs::remove_file(&stale) {
                Ok(()) => debug!("removed existing {}", stale.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(BundleError::io("cannot remove", &stale, e)),
            }
        }
    }

    write_archive(source_dir, &archive_path, &entries, metadata.as_bytes())?;
    info!("created {}", archive_path.display());

    let checksum_path = match checksum::write_sidecar(&archive_path) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("could not create MD5 hash file for {archive_name}: {e}");
            None
        }
    };

    Ok(Packaged {
        descriptor,
        archive_path,
        checksum_path,
        outcome: BuildOutcome::Built,
    })
}

/// Archive paths for every manifest file, in declaration order, duplicates
/// included.
///
/// ```
/// use axe_core::bundle::resolve_entries;
/// use axe_schema::Manifest;
///
/// let manifest = Manifest {
///     main: "main.js".into(),
///     scripts: vec!["lib.js".into()],
///     icon: "icon.png".into(),
///     resources: vec![],
/// };
/// assert_eq!(
///     resolve_entries(&manifest),
///     ["content/main.js", "content/lib.js", "content/icon.png"]
/// );
/// ```
pub fn resolve_entries(manifest: &Manifest) -> Vec<String> {
    manifest.entries().map(content_entry).collect()
}

fn write_archive(
    source_dir: &Path,
    archive_path: &Path,
    entries: &[String],
    metadata: &[u8],
) -> Result<(), BundleError> {
    let dest_dir = archive_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let staging = tempfile::Builder::new()
        .prefix(".axe-")
        .suffix(".partial")
        .tempfile_in(dest_dir)
        .map_err(|e| BundleError::io("cannot create archive in", dest_dir, e))?;

    let zip_err = |source| BundleError::Archive {
        path: archive_path.to_path_buf(),
        source,
    };
    let write_err = |e| BundleError::io("cannot write", archive_path, e);

    let mut zip = ZipWriter::new(staging);
    let options = SimpleFileOptions::default();
    let mut written: HashSet<&str> = HashSet::new();

    for entry in entries {
        if entry == METADATA_PATH {
            debug!("{entry} is listed in the manifest; the enriched descriptor replaces it");
            continue;
        }
        if !written.insert(entry.as_str()) {
            debug!("{entry} is listed more than once; archiving it once");
            continue;
        }

        let file_path = source_dir.join(entry);
        let body = fs::read(&file_path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => BundleError::MissingEntry {
                entry: entry.clone(),
                path: file_path.clone(),
                source,
            },
            _ => BundleError::io("cannot read", &file_path, source),
        })?;

        zip.start_file(entry.as_str(), options).map_err(zip_err)?;
        zip.write_all(&body).map_err(write_err)?;
        debug!("added {entry} ({} bytes)", body.len());
    }

    zip.start_file(METADATA_PATH, options).map_err(zip_err)?;
    zip.write_all(metadata).map_err(write_err)?;

    let staging = zip.finish().map_err(zip_err)?;
    staging.as_file().sync_all().map_err(write_err)?;
    staging
        .persist(archive_path)
        .map_err(|e| BundleError::io("cannot move archive to", archive_path, e.error))?;
    Ok(())
}
