//! Publishing to a Relaxe catalog.
//!
//! A publish stages a release build in the cache directory, refuses
//! name/version pairs the catalog already knows, gives the archive a fresh
//! UUID, renames archive and sidecar to `<pluginName>-<axeId>` and finally
//! records the descriptor.
//!
//! The duplicate guard is check-then-act: two concurrent publishers of the
//! same name and version can both pass it.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use axe_schema::{Descriptor, PluginName, Version};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bundle::{BuildOptions, BuildOutcome, package};
use crate::catalog::{Catalog, CatalogError};
use crate::checksum;
use crate::config::RelaxeConfig;
use crate::error::BundleError;
use crate::metadata::read_embedded_descriptor;
use crate::paths::{archive_file_name, checksum_file_name, sidecar_path};

/// Result of a publish that did not fail.
#[derive(Debug)]
pub enum PublishOutcome {
    /// The archive carries its final name.
    Published {
        /// Descriptor with `axeId` assigned.
        descriptor: Box<Descriptor>,
        /// `<pluginName>-<axeId>.axe`
        archive: PathBuf,
        /// `<pluginName>-<axeId>.md5`
        checksum: PathBuf,
        /// Whether the catalog insert succeeded.
        recorded: bool,
    },
    /// The catalog already lists this name and version; nothing was renamed
    /// or recorded.
    AlreadyPublished {
        /// Plugin name.
        name: PluginName,
        /// Plugin version.
        version: Version,
    },
}

/// Why a directory could not be published.
#[derive(Error, Debug)]
pub enum PublishError {
    /// Staging the release build failed.
    #[error(transparent)]
    Build(#[from] BundleError),

    /// The duplicate guard could not query the catalog.
    #[error("catalog lookup failed for {stem}: {source}")]
    Lookup {
        /// `<pluginName>-<version>` being checked.
        stem: String,
        /// Underlying catalog error.
        #[source]
        source: CatalogError,
    },

    /// The identity rename did not commit.
    #[error("cannot give {} its published name: {outcome}", staged.display())]
    Rename {
        /// The staged archive.
        staged: PathBuf,
        /// What the rename left behind.
        outcome: IdentityRename,
    },
}

/// A file the rollback could not delete.
#[derive(Debug)]
pub struct Leftover {
    /// File still on disk.
    pub path: PathBuf,
    /// Why it could not be removed.
    pub error: io::Error,
}

/// Outcome of [`commit_identity`].
#[derive(Debug)]
pub enum IdentityRename {
    /// Both files carry their identity names.
    Committed {
        /// Renamed archive.
        archive: PathBuf,
        /// Renamed sidecar, pointing at the renamed archive.
        checksum: PathBuf,
    },
    /// The archive rename failed; nothing changed on disk.
    Aborted {
        /// Why.
        cause: io::Error,
    },
    /// The sidecar rename failed; the renamed archive and the sidecar were
    /// deleted.
    RolledBack {
        /// Why the sidecar could not be renamed.
        cause: io::Error,
    },
    /// The sidecar rename failed and the rollback left files behind.
    Unrecoverable {
        /// Why the sidecar could not be renamed.
        cause: io::Error,
        /// Files still on disk.
        leftovers: Vec<Leftover>,
    },
}

impl IdentityRename {
    /// Whether both renames went through.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

impl fmt::Display for IdentityRename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Committed { archive, .. } => write!(f, "committed as {}", archive.display()),
            Self::Aborted { cause } => write!(f, "archive rename failed: {cause}"),
            Self::RolledBack { cause } => {
                write!(f, "sidecar rename failed, rolled back: {cause}")
            }
            Self::Unrecoverable { cause, leftovers } => {
                write!(f, "sidecar rename failed: {cause}; could not clean up")?;
                for leftover in leftovers {
                    write!(f, " {} ({})", leftover.path.display(), leftover.error)?;
                }
                Ok(())
            }
        }
    }
}

/// Rename a staged archive and its sidecar to `<identity_stem>.axe` and
/// `<identity_stem>.md5` in the same directory.
///
/// Phase 1 refuses to replace an existing file under either final name, then
/// moves the archive. Phase 2 moves the sidecar and rewrites the archive name
/// it references. If phase 2 fails the renamed archive and whichever sidecar
/// this call still owns are deleted.
pub fn commit_identity(staged_archive: &Path, identity_stem: &str) -> IdentityRename {
    let dir = staged_archive.parent().unwrap_or_else(|| Path::new(""));
    let final_name = archive_file_name(identity_stem);
    let final_archive = dir.join(&final_name);
    let staged_sidecar = sidecar_path(staged_archive);
    let final_sidecar = dir.join(checksum_file_name(identity_stem));

    for target in [&final_archive, &final_sidecar] {
        match target.try_exists() {
            Ok(false) => {}
            Ok(true) => {
                return IdentityRename::Aborted {
                    cause: io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("{} already exists", target.display()),
                    ),
                };
            }
            Err(cause) => return IdentityRename::Aborted { cause },
        }
    }
    if let Err(cause) = fs::rename(staged_archive, &final_archive) {
        return IdentityRename::Aborted { cause };
    }

    let (cause, sidecar) = match fs::rename(&staged_sidecar, &final_sidecar) {
        Err(cause) => (cause, &staged_sidecar),
        Ok(()) => match checksum::rewrite_sidecar(&final_sidecar, &final_name) {
            Ok(()) => {
                return IdentityRename::Committed {
                    archive: final_archive,
                    checksum: final_sidecar,
                };
            }
            Err(cause) => (cause, &final_sidecar),
        },
    };

    let mut leftovers = Vec::new();
    for path in [&final_archive, sidecar] {
        match fs::remove_file(path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => leftovers.push(Leftover {
                path: path.clone(),
                error,
            }),
            _ => {}
        }
    }

    if leftovers.is_empty() {
        IdentityRename::RolledBack { cause }
    } else {
        IdentityRename::Unrecoverable { cause, leftovers }
    }
}

/// Publish one source directory.
///
/// A failed catalog insert is logged and reported as
/// `Published { recorded: false }`; the renamed archive stays on disk.
///
/// # Errors
///
/// Returns [`PublishError::Build`] if staging fails, [`PublishError::Lookup`]
/// if the duplicate guard cannot query the catalog and
/// [`PublishError::Rename`] if the identity rename does not commit.
pub fn publish_one(
    source_dir: &Path,
    config: &RelaxeConfig,
    catalog: &mut dyn Catalog,
) -> Result<PublishOutcome, PublishError> {
    let staged = package(source_dir, &config.cache_directory, &BuildOptions::publish())?;
    let mut descriptor = match staged.outcome {
        BuildOutcome::Built => staged.descriptor,
        BuildOutcome::SkippedExisting => read_embedded_descriptor(&staged.archive_path)?,
    };

    let count = catalog
        .count_by_name_and_version(&descriptor.plugin_name, &descriptor.version)
        .map_err(|source| PublishError::Lookup {
            stem: descriptor.versioned_stem(),
            source,
        })?;
    if count > 0 {
        warn!(
            "{} is already published on Relaxe, skipping",
            descriptor.versioned_stem()
        );
        return Ok(PublishOutcome::AlreadyPublished {
            name: descriptor.plugin_name,
            version: descriptor.version,
        });
    }

    let axe_id = Uuid::new_v4().to_string();
    let stem = descriptor.assign_identity(axe_id);

    let (archive, checksum) = match commit_identity(&staged.archive_path, &stem) {
        IdentityRename::Committed { archive, checksum } => (archive, checksum),
        outcome => {
            if let IdentityRename::Unrecoverable { leftovers, .. } = &outcome {
                for leftover in leftovers {
                    warn!(
                        "could not remove {} after a failed rename: {}",
                        leftover.path.display(),
                        leftover.error
                    );
                }
            }
            return Err(PublishError::Rename {
                staged: staged.archive_path,
                outcome,
            });
        }
    };

    let recorded = match catalog.insert(&descriptor) {
        Ok(()) => {
            info!("published {}", archive.display());
            true
        }
        Err(e) => {
            warn!("Relaxe database error for {}: {e}", archive.display());
            false
        }
    };

    Ok(PublishOutcome::Published {
        descriptor: Box::new(descriptor),
        archive,
        checksum,
        recorded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::tests::foo_source;
    use crate::catalog::SqliteCatalog;
    use crate::config::{CatalogLocation, DatabaseConfig};
    use tempfile::TempDir;

    fn config(cache: &Path) -> RelaxeConfig {
        RelaxeConfig {
            cache_directory: cache.to_path_buf(),
            database: DatabaseConfig {
                connection_string: ":memory:".to_string(),
                location: CatalogLocation::Memory,
            },
        }
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Catalog whose lookups or inserts can be made to fail.
    struct FlakyCatalog {
        count: u64,
        fail_lookup: bool,
        fail_insert: bool,
        inserts: usize,
    }

    impl FlakyCatalog {
        fn new() -> Self {
            Self {
                count: 0,
                fail_lookup: false,
                fail_insert: false,
                inserts: 0,
            }
        }
    }

    impl Catalog for FlakyCatalog {
        fn count_by_name_and_version(
            &self,
            _name: &PluginName,
            _version: &Version,
        ) -> Result<u64, CatalogError> {
            if self.fail_lookup {
                return Err(CatalogError::MissingIdentity("lookup".to_string()));
            }
            Ok(self.count)
        }

        fn insert(&mut self, _descriptor: &Descriptor) -> Result<(), CatalogError> {
            self.inserts += 1;
            if self.fail_insert {
                return Err(CatalogError::MissingIdentity("insert".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn publish_renames_to_identity_and_records() {
        let src = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        foo_source(src.path());
        let mut catalog = SqliteCatalog::open_in_memory().unwrap();

        let outcome = publish_one(src.path(), &config(cache.path()), &mut catalog).unwrap();
        let PublishOutcome::Published {
            descriptor,
            archive,
            checksum,
            recorded,
        } = outcome
        else {
            panic!("expected a publish");
        };
        assert!(recorded);

        let axe_id = descriptor.axe_id.clone().unwrap();
        assert!(Uuid::parse_str(&axe_id).is_ok());

        let archive_name = archive.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(archive_name, format!("foo-{axe_id}.axe"));
        assert!(!archive_name.contains("1.0"));
        assert_eq!(checksum, cache.path().join(format!("foo-{axe_id}.md5")));

        let line = checksum::read_sidecar(&checksum).unwrap();
        assert_eq!(line.file_name, archive_name);
        assert_eq!(line.digest, checksum::md5_file(&archive).unwrap());

        assert_eq!(
            file_names(cache.path()),
            vec![format!("foo-{axe_id}.axe"), format!("foo-{axe_id}.md5")]
        );

        let stored = catalog.get(&axe_id).unwrap().unwrap();
        assert_eq!(stored.descriptor, *descriptor);
        assert_eq!(stored.descriptor.revision, None);
    }

    #[test]
    fn duplicate_is_skipped_without_rename_or_insert() {
        let src = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        foo_source(src.path());
        let mut catalog = FlakyCatalog::new();
        catalog.count = 1;

        let outcome = publish_one(src.path(), &config(cache.path()), &mut catalog).unwrap();
        assert!(matches!(
            &outcome,
            PublishOutcome::AlreadyPublished { name, version } if name == "foo" && version == "1.0"
        ));
        assert_eq!(catalog.inserts, 0);
        assert_eq!(file_names(cache.path()), vec!["foo-1.0.axe", "foo-1.0.md5"]);
    }

    #[test]
    fn republishing_the_same_version_is_refused() {
        let src = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        foo_source(src.path());
        let mut catalog = SqliteCatalog::open_in_memory().unwrap();
        let config = config(cache.path());

        let first = publish_one(src.path(), &config, &mut catalog).unwrap();
        assert!(matches!(first, PublishOutcome::Published { .. }));
        let second = publish_one(src.path(), &config, &mut catalog).unwrap();
        assert!(matches!(second, PublishOutcome::AlreadyPublished { .. }));
    }

    #[test]
    fn staged_archive_from_an_earlier_run_is_reused() {
        let src = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        foo_source(src.path());
        let staged = package(src.path(), cache.path(), &BuildOptions::publish()).unwrap();
        let staged_descriptor = staged.descriptor;

        let mut catalog = SqliteCatalog::open_in_memory().unwrap();
        let PublishOutcome::Published { descriptor, .. } =
            publish_one(src.path(), &config(cache.path()), &mut catalog).unwrap()
        else {
            panic!("expected a publish");
        };
        assert_eq!(descriptor.timestamp, staged_descriptor.timestamp);
    }

    #[test]
    fn failed_insert_keeps_the_renamed_archive() {
        let src = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        foo_source(src.path());
        let mut catalog = FlakyCatalog::new();
        catalog.fail_insert = true;

        let outcome = publish_one(src.path(), &config(cache.path()), &mut catalog).unwrap();
        let PublishOutcome::Published {
            archive, recorded, ..
        } = outcome
        else {
            panic!("expected a publish");
        };
        assert!(!recorded);
        assert!(archive.exists());
        assert_eq!(catalog.inserts, 1);
    }

    #[test]
    fn lookup_failure_is_an_error_for_this_directory() {
        let src = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        foo_source(src.path());
        let mut catalog = FlakyCatalog::new();
        catalog.fail_lookup = true;

        let err = publish_one(src.path(), &config(cache.path()), &mut catalog).unwrap_err();
        assert!(matches!(err, PublishError::Lookup { .. }));
        assert_eq!(catalog.inserts, 0);
    }

    #[test]
    fn commit_renames_both_files() {
        let tmp = TempDir::new().unwrap();
        let staged = tmp.path().join("foo-1.0.axe");
        fs::write(&staged, b"axe").unwrap();
        checksum::write_sidecar(&staged).unwrap();

        let result = commit_identity(&staged, "foo-1234");
        assert!(result.is_committed());
        assert_eq!(file_names(tmp.path()), vec!["foo-1234.axe", "foo-1234.md5"]);
        assert_eq!(
            checksum::read_sidecar(&tmp.path().join("foo-1234.md5"))
                .unwrap()
                .file_name,
            "foo-1234.axe"
        );
    }

    #[test]
    fn missing_sidecar_rolls_back_the_archive() {
        let tmp = TempDir::new().unwrap();
        let staged = tmp.path().join("foo-1.0.axe");
        fs::write(&staged, b"axe").unwrap();

        let result = commit_identity(&staged, "foo-1234");
        assert!(matches!(result, IdentityRename::RolledBack { .. }));
        assert!(file_names(tmp.path()).is_empty());
    }

    #[test]
    fn unreadable_sidecar_rolls_back_both_files() {
        let tmp = TempDir::new().unwrap();
        let staged = tmp.path().join("foo-1.0.axe");
        fs::write(&staged, b"axe").unwrap();
        fs::write(tmp.path().join("foo-1.0.md5"), "not a checksum").unwrap();

        let result = commit_identity(&staged, "foo-1234");
        assert!(matches!(result, IdentityRename::RolledBack { .. }));
        assert!(file_names(tmp.path()).is_empty());
    }

    #[test]
    fn existing_target_aborts_without_touching_anything() {
        let tmp = TempDir::new().unwrap();
        let staged = tmp.path().join("foo-1.0.axe");
        fs::write(&staged, b"axe").unwrap();
        checksum::write_sidecar(&staged).unwrap();
        fs::write(tmp.path().join("foo-1234.axe"), b"other").unwrap();

        let result = commit_identity(&staged, "foo-1234");
        assert!(matches!(result, IdentityRename::Aborted { .. }));
        assert_eq!(
            file_names(tmp.path()),
            vec!["foo-1.0.axe", "foo-1.0.md5", "foo-1234.axe"]
        );
        assert_eq!(fs::read(tmp.path().join("foo-1234.axe")).unwrap(), b"other");
    }

    #[test]
    fn existing_sidecar_target_aborts_without_touching_anything() {
        let tmp = TempDir::new().unwrap();
        let staged = tmp.path().join("foo-1.0.axe");
        fs::write(&staged, b"axe").unwrap();
        checksum::write_sidecar(&staged).unwrap();
        fs::write(tmp.path().join("foo-1234.md5"), b"someone else's").unwrap();

        let result = commit_identity(&staged, "foo-1234");
        assert!(matches!(
            &result,
            IdentityRename::Aborted { cause } if cause.kind() == io::ErrorKind::AlreadyExists
        ));
        assert_eq!(
            file_names(tmp.path()),
            vec!["foo-1.0.axe", "foo-1.0.md5", "foo-1234.md5"]
        );
        assert_eq!(
            fs::read(tmp.path().join("foo-1234.md5")).unwrap(),
            b"someone else's"
        );
    }

    #[test]
    fn failed_cleanup_names_the_leftover_file() {
        let tmp = TempDir::new().unwrap();
        let staged = tmp.path().join("foo-1.0.axe");
        fs::write(&staged, b"axe").unwrap();
        // A directory can be renamed but neither read as a sidecar nor
        // removed with remove_file.
        fs::create_dir_all(tmp.path().join("foo-1.0.md5/inner")).unwrap();

        let result = commit_identity(&staged, "foo-1234");
        let IdentityRename::Unrecoverable { leftovers, .. } = &result else {
            panic!("expected an unrecoverable rename, got {result}");
        };
        let paths: Vec<&Path> = leftovers.iter().map(|l| l.path.as_path()).collect();
        assert_eq!(paths, vec![tmp.path().join("foo-1234.md5").as_path()]);
        assert!(result.to_string().contains("foo-1234.md5"));
        assert_eq!(file_names(tmp.path()), vec!["foo-1234.md5"]);
    }

    #[test]
    fn missing_source_files_fail_before_the_catalog_is_touched() {
        let src = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let mut catalog = FlakyCatalog::new();
        catalog.fail_lookup = true;

        let err = publish_one(src.path(), &config(cache.path()), &mut catalog).unwrap_err();
        assert!(matches!(err, PublishError::Build(_)));
    }
}
