//! Source-control revision lookup.

use std::io;
use std::path::Path;
use std::process::Command;

use thiserror::Error;

/// Why no revision could be determined.
#[derive(Error, Debug)]
pub enum RevisionError {
    /// `git` could not be started.
    #[error("failed to run git: {0}")]
    Spawn(#[from] io::Error),

    /// `git` ran but reported an error (typically: not a repository).
    #[error("git exited with {code:?}: {stderr}")]
    Failed {
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Trimmed standard error.
        stderr: String,
    },

    /// `git` succeeded but printed nothing.
    #[error("git returned an empty revision")]
    Empty,
}

/// Short hash of `HEAD` for the repository containing `dir`.
///
/// # Errors
///
/// Returns a [`RevisionError`] if git is unavailable, `dir` is not inside a
/// repository, or the repository has no commits.
pub fn short_revision(dir: &Path) -> Result<String, RevisionError> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(dir)
        .output()?;

    if !output.status.success() {
        return Err(RevisionError::Failed {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if revision.is_empty() {
        return Err(RevisionError::Empty);
    }
    Ok(revision)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Initialise a repository with one commit in `dir`. Returns `false` when
    /// git is not installed so callers can skip.
    pub(crate) fn init_repo(dir: &Path) -> bool {
        if which::which("git").is_err() {
            return false;
        }
        let git = |args: &[&str]| {
            let status = Command::new("git")
                .args(["-c", "user.name=makeaxe", "-c", "user.email=makeaxe@localhost"])
                .args(["-c", "commit.gpgsign=false"])
                .args(args)
                .current_dir(dir)
                .output()
                .unwrap()
                .status;
            assert!(status.success(), "git {args:?} failed");
        };
        git(&["init", "-q"]);
        git(&["add", "-A"]);
        git(&["commit", "-q", "--allow-empty", "-m", "init"]);
        true
    }

    #[test]
    fn outside_a_repository_is_an_error() {
        if which::which("git").is_err() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        assert!(short_revision(tmp.path()).is_err());
    }

    #[test]
    fn reads_head_of_repository() {
        let tmp = TempDir::new().unwrap();
        if !init_repo(tmp.path()) {
            return;
        }
        let rev = short_revision(tmp.path()).unwrap();
        assert!(rev.len() >= 4);
        assert!(rev.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
