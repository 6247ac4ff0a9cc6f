//! File naming for archives, sidecars and the staging cache.

use std::path::{Component, Path, PathBuf};

use axe_schema::{AXE_EXTENSION, CHECKSUM_EXTENSION, CONTENT_ROOT};

/// `<stem>.axe`
pub fn archive_file_name(stem: &str) -> String {
    format!("{stem}.{AXE_EXTENSION}")
}

/// `<stem>.md5`
pub fn checksum_file_name(stem: &str) -> String {
    format!("{stem}.{CHECKSUM_EXTENSION}")
}

/// Sidecar path for an archive: same directory and stem, `.md5` extension.
///
/// ```
/// use std::path::Path;
/// use axe_core::paths::sidecar_path;
///
/// assert_eq!(
///     sidecar_path(Path::new("/out/jamendo-0.4.axe")),
///     Path::new("/out/jamendo-0.4.md5")
/// );
/// ```
pub fn sidecar_path(archive: &Path) -> PathBuf {
    archive.with_extension(CHECKSUM_EXTENSION)
}

/// Archive-relative path of a manifest entry: `content/<entry>` with `/`
/// separators and any `.` components dropped.
pub fn content_entry(entry: &str) -> String {
    let mut out = String::from(CONTENT_ROOT);
    for component in Path::new(entry).components() {
        if let Component::Normal(part) = component {
            out.push('/');
            out.push_str(&part.to_string_lossy());
        }
    }
    out
}

/// Default staging directory for publish runs.
///
/// `RELAXE_CACHE_DIR` wins when set; otherwise `<user cache dir>/relaxe`,
/// falling back to the system temp directory.
pub fn default_cache_dir() -> PathBuf {
    if let Ok(val) = std::env::var("RELAXE_CACHE_DIR") {
        return PathBuf::from(val);
    }
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("relaxe")
}
