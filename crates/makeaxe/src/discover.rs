//! Finding plugin directories for `--all`.

use std::path::{Path, PathBuf};

use axe_schema::METADATA_PATH;
use walkdir::WalkDir;

/// Direct subdirectories of a root, split by whether they hold a descriptor.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Subdirectories containing `content/metadata.json`, in file-name order.
    pub plugins: Vec<PathBuf>,
    /// Other subdirectories, in file-name order.
    pub skipped: Vec<PathBuf>,
}

/// Scan the direct subdirectories of `root`. Plain files are ignored.
///
/// # Errors
///
/// Returns the `walkdir` error if `root` or one of its entries cannot be read.
pub fn discover(root: &Path) -> Result<Discovery, walkdir::Error> {
    let mut discovery = Discovery::default();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if path.join(METADATA_PATH).is_file() {
            discovery.plugins.push(path.to_path_buf());
        } else {
            discovery.skipped.push(path.to_path_buf());
        }
    }
    Ok(discovery)
}
