//! Shared types and wire formats for axe bundles.
//!
//! An axe is a zip archive holding a plugin's manifest-declared files under
//! `content/` plus an enriched copy of its descriptor at
//! `content/metadata.json`. This crate owns the descriptor model and the
//! checksum sidecar line format. It performs no I/O.

pub mod descriptor;
pub mod hash;
pub mod types;

// Re-exports
pub use descriptor::{Author, Descriptor, DescriptorError, LegacyAuthor, Manifest};
pub use hash::{ChecksumError, ChecksumLine, Md5Digest};
pub use types::{PluginName, Version};

/// Bundle format version stamped into every descriptor at build time.
pub const BUNDLE_VERSION: &str = "2";

/// Directory inside the source tree (and inside the archive) holding all
/// plugin content.
pub const CONTENT_ROOT: &str = "content";

/// Relative path of the descriptor inside both the source tree and the archive.
pub const METADATA_PATH: &str = "content/metadata.json";

/// File extension of bundle archives.
pub const AXE_EXTENSION: &str = "axe";

/// File extension of checksum sidecars.
pub const CHECKSUM_EXTENSION: &str = "md5";
