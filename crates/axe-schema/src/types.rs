//! Identity newtypes for plugin names and versions.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use regex::Regex;

static PLUGIN_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("plugin name pattern is valid")
});

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.+_-]*$").expect("version pattern is valid")
});

/// A plugin's machine name, used for archive naming and catalog identity.
///
/// Stored exactly as written in the descriptor; no case folding is applied
/// because the name ends up verbatim in file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct PluginName(String);

impl PluginName {
    /// Create a new plugin name without validation.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Whether the name passes the format check: a leading alphanumeric
    /// followed by alphanumerics, `.`, `_` or `-`.
    ///
    /// ```
    /// use axe_schema::PluginName;
    ///
    /// assert!(PluginName::new("jamendo").is_well_formed());
    /// assert!(!PluginName::new("../etc").is_well_formed());
    /// ```
    pub fn is_well_formed(&self) -> bool {
        PLUGIN_NAME_RE.is_match(&self.0)
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PluginName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PluginName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PluginName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PluginName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PluginName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for PluginName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PluginName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A plugin version string, opaque apart from its format check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Create a new version from the given string (stored as-is).
    pub fn new(v: impl Into<String>) -> Self {
        Self(v.into())
    }

    /// Whether the version passes the format check: a leading alphanumeric
    /// followed by alphanumerics, `.`, `+`, `_` or `-`.
    pub fn is_well_formed(&self) -> bool {
        VERSION_RE.is_match(&self.0)
    }

    /// Return the version string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for Version {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
