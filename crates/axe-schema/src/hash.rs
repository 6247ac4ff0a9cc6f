//! Checksum sidecar format.

use thiserror::Error;

/// Errors from parsing digests and checksum lines.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChecksumError {
    /// The digest is not exactly 32 ASCII hex characters.
    #[error("invalid MD5 digest: expected 32 hex characters, got '{0}'")]
    InvalidDigest(String),

    /// The line is not `<digest>\t<file name>`.
    #[error("malformed checksum line: '{0}'")]
    MalformedLine(String),
}

/// A validated MD5 digest (32 lowercase hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Md5Digest(String);

impl Md5Digest {
    /// Create a new `Md5Digest`, validating the input.
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError::InvalidDigest`] if the input is not exactly 32
    /// ASCII hex characters.
    pub fn new(s: impl Into<String>) -> Result<Self, ChecksumError> {
        let s = s.into();
        if s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(ChecksumError::InvalidDigest(s))
        }
    }

    /// Get the digest as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Md5Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Md5Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The single line stored in a checksum sidecar: `<digest>\t<file name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumLine {
    /// Digest of the archive's bytes.
    pub digest: Md5Digest,
    /// Bare file name (no directory) of the archive the digest covers.
    pub file_name: String,
}

impl ChecksumLine {
    /// Create a line for `file_name`.
    pub fn new(digest: Md5Digest, file_name: impl Into<String>) -> Self {
        Self {
            digest,
            file_name: file_name.into(),
        }
    }

    /// Render the line exactly as written to disk (no trailing newline).
    ///
    /// ```
    /// use axe_schema::{ChecksumLine, Md5Digest};
    ///
    /// let digest = Md5Digest::new("d41d8cd98f00b204e9800998ecf8427e").unwrap();
    /// let line = ChecksumLine::new(digest, "jamendo-0.4.axe");
    /// assert_eq!(line.render(), "d41d8cd98f00b204e9800998ecf8427e\tjamendo-0.4.axe");
    /// ```
    pub fn render(&self) -> String {
        format!("{}\t{}", self.digest, self.file_name)
    }

    /// Parse a sidecar's contents. A single trailing newline is tolerated.
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError::MalformedLine`] if there is no tab separator
    /// or the file name is empty, and [`ChecksumError::InvalidDigest`] if the
    /// digest is not valid hex.
    pub fn parse(s: &str) -> Result<Self, ChecksumError> {
        let line = s.strip_suffix('\n').unwrap_or(s);
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some((digest, file_name)) = line.split_once('\t') else {
            return Err(ChecksumError::MalformedLine(s.to_string()));
        };
        if file_name.is_empty() || file_name.contains(['\n', '\t']) {
            return Err(ChecksumError::MalformedLine(s.to_string()));
        }
        Ok(Self::new(Md5Digest::new(digest)?, file_name))
    }

    /// The same digest pointing at a different archive name.
    pub fn renamed(&self, file_name: impl Into<String>) -> Self {
        Self::new(self.digest.clone(), file_name)
    }
}

impl std::fmt::Display for ChecksumLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}
