//! MD5 checksum sidecars.
//!
//! Every archive gets a one-line `<name>.md5` file beside it holding
//! `<digest>\t<archive file name>`.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use axe_schema::{ChecksumLine, Md5Digest};

use crate::paths::sidecar_path;

/// Stream a file through MD5.
///
/// # Errors
///
/// Returns any I/O error from opening or reading the file.
pub fn md5_file(path: &Path) -> io::Result<Md5Digest> {
    let mut file = File::open(path)?;
    let mut context = md5::Context::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        context.consume(&buf[..n]);
    }
    Md5Digest::new(format!("{:x}", context.compute()))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Hash `archive` and write its sidecar. Returns the sidecar path.
///
/// # Errors
///
/// Returns any I/O error from hashing or writing.
pub fn write_sidecar(archive: &Path) -> io::Result<PathBuf> {
    let digest = md5_file(archive)?;
    let line = ChecksumLine::new(digest, file_name_of(archive)?);
    let path = sidecar_path(archive);
    fs::write(&path, line.render())?;
    Ok(path)
}

/// Parse an existing sidecar.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, or
/// [`io::ErrorKind::InvalidData`] if its contents are not a checksum line.
pub fn read_sidecar(path: &Path) -> io::Result<ChecksumLine> {
    let content = fs::read_to_string(path)?;
    ChecksumLine::parse(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Point an existing sidecar at a different archive file name, keeping its
/// digest. The file is replaced atomically.
///
/// # Errors
///
/// Returns an I/O error if the sidecar cannot be read or parsed, or the
/// replacement cannot be written.
pub fn rewrite_sidecar(path: &Path, archive_file_name: &str) -> io::Result<()> {
    let line = read_sidecar(path)?.renamed(archive_file_name);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(line.render().as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn file_name_of(path: &Path) -> io::Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no file name", path.display()),
            )
        })
}
