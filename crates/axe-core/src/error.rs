//! Domain-specific errors for packaging

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a [`BundleError`], matching how a batch run
/// treats it. Every kind is fatal to the directory being packaged and to
/// nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The descriptor file is missing or unreadable.
    NotFound,
    /// The descriptor does not parse or fails validation.
    Malformed,
    /// Archive construction, rename or delete failed.
    Io,
}

/// Errors produced while loading a descriptor or building an archive.
#[derive(Error, Debug)]
pub enum BundleError {
    /// The descriptor file is missing or cannot be read.
    #[error("cannot find metadata file {}; make sure it exists and is readable", path.display())]
    NotFound {
        /// Expected location of the descriptor.
        path: PathBuf,
        /// Underlying read error.
        #[source]
        source: io::Error,
    },

    /// The descriptor does not parse or fails structural validation.
    #[error("bad metadata file {}: {reason}", path.display())]
    Malformed {
        /// Location of the offending descriptor (or archive holding it).
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// A file declared in the manifest is missing from the source tree.
    #[error("manifest entry {entry} not found at {}", path.display())]
    MissingEntry {
        /// Archive-relative entry path.
        entry: String,
        /// Where the file was expected on disk.
        path: PathBuf,
        /// Underlying read error.
        #[source]
        source: io::Error,
    },

    /// A filesystem operation failed.
    #[error("{context} {}: {source}", path.display())]
    Io {
        /// What was being attempted.
        context: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The zip writer or reader failed.
    #[error("archive error in {}: {source}", path.display())]
    Archive {
        /// Archive path.
        path: PathBuf,
        /// Underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },
}

impl BundleError {
    /// Create an [`BundleError::Io`] for `path`.
    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    /// Classify this error.
    ///
    /// A missing manifest entry is discovered while the archive is being
    /// written and therefore counts as an archive I/O failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Malformed { .. } => ErrorKind::Malformed,
            Self::MissingEntry { .. } | Self::Io { .. } | Self::Archive { .. } => ErrorKind::Io,
        }
    }

    /// Whether a required file (descriptor or manifest entry) was missing.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::MissingEntry { .. })
    }
}
