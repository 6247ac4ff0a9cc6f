//! The plugin descriptor (`content/metadata.json`).
//!
//! A descriptor is loaded from the source tree, validated, migrated once from
//! the legacy single-author fields, then enriched at build time with a
//! timestamp, the bundle format version and (outside release builds) a
//! source-control revision. Publishing adds a globally unique `axeId`.
//!
//! Keys the builder does not know about are kept in [`Descriptor::extra`] so
//! that the embedded copy never silently drops information.

use std::path::{Component, Path};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::types::{PluginName, Version};
use crate::BUNDLE_VERSION;

/// Structural problems found by [`Descriptor::validate`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DescriptorError {
    /// A required string field is empty.
    #[error("empty field: {0}")]
    EmptyField(&'static str),

    /// The plugin name fails the format check.
    #[error("invalid plugin name '{0}'")]
    InvalidName(String),

    /// The version fails the format check.
    #[error("invalid version '{0}'")]
    InvalidVersion(String),

    /// A manifest entry is absolute or escapes the content root.
    #[error("manifest {field} entry '{path}' must be a relative path inside content/")]
    InvalidPath {
        /// Manifest field the entry came from (`main`, `scripts`, ...).
        field: &'static str,
        /// The offending entry as written.
        path: String,
    },
}

/// One author of a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Author {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Contact address.
    #[serde(default)]
    pub email: String,
}

/// The file manifest: which files under `content/` belong in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Manifest {
    /// Entry script loaded first by the host.
    pub main: String,
    /// Additional scripts, in load order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scripts: Vec<String>,
    /// Icon shown by the host.
    pub icon: String,
    /// Any other bundled files (UI definitions, images, ...).
    #[serde(default, deserialize_with = "null_as_empty")]
    pub resources: Vec<String>,
}

impl Manifest {
    /// Every declared file in declaration order: main, scripts, icon, resources.
    ///
    /// Duplicates are yielded as often as they are declared.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.main.as_str())
            .chain(self.scripts.iter().map(String::as_str))
            .chain(std::iter::once(self.icon.as_str()))
            .chain(self.resources.iter().map(String::as_str))
    }

    fn validate(&self) -> Result<(), DescriptorError> {
        if self.main.trim().is_empty() {
            return Err(DescriptorError::EmptyField("manifest.main"));
        }
        if self.icon.trim().is_empty() {
            return Err(DescriptorError::EmptyField("manifest.icon"));
        }

        check_relative("main", &self.main)?;
        for script in &self.scripts {
            check_relative("scripts", script)?;
        }
        check_relative("icon", &self.icon)?;
        for resource in &self.resources {
            check_relative("resources", resource)?;
        }
        Ok(())
    }
}

fn check_relative(field: &'static str, entry: &str) -> Result<(), DescriptorError> {
    let escapes = entry.is_empty()
        || Path::new(entry)
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(DescriptorError::InvalidPath {
            field,
            path: entry.to_string(),
        });
    }
    Ok(())
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// What [`Descriptor::migrate_legacy_author`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyAuthor {
    /// No `author`/`email` fields were present.
    Absent,
    /// Legacy fields were folded into a one-element `authors` list.
    Migrated,
    /// Legacy fields were present but an `authors` list already existed.
    Ignored,
}

impl LegacyAuthor {
    /// Whether the descriptor used the deprecated fields at all.
    pub fn is_deprecated_use(self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// A plugin descriptor as stored in `content/metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Human-readable display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Machine name used for archive naming and catalog identity.
    pub plugin_name: PluginName,
    /// Deprecated single author name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Deprecated single author address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Plugin authors.
    #[serde(default, deserialize_with = "null_as_empty_authors")]
    pub authors: Vec<Author>,
    /// Plugin version, used for archive naming and duplicate detection.
    pub version: Version,
    /// Project homepage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Plugin kind as understood by the host (e.g. `resolver/javascript`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Files that make up the bundle.
    pub manifest: Manifest,
    /// Packaging time in unix seconds. Build-time only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Short source-control revision. Build-time only, never in release builds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Bundle format version. Build-time only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_version: Option<String>,
    /// Globally unique identity. Publish-time only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axe_id: Option<String>,
    /// Unrecognised keys, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn null_as_empty_authors<'de, D>(deserializer: D) -> Result<Vec<Author>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Author>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Descriptor {
    /// Parse a descriptor from JSON without validating it.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the text is not a descriptor-shaped
    /// JSON object.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize with two-space indentation, the form embedded in archives.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialization fails (only possible
    /// for non-string map keys in `extra`, which JSON input cannot produce).
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check required fields and the name/version format.
    ///
    /// # Errors
    ///
    /// Returns the first [`DescriptorError`] encountered.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.plugin_name.is_empty() {
            return Err(DescriptorError::EmptyField("pluginName"));
        }
        if self.version.is_empty() {
            return Err(DescriptorError::EmptyField("version"));
        }
        if !self.plugin_name.is_well_formed() {
            return Err(DescriptorError::InvalidName(self.plugin_name.to_string()));
        }
        if !self.version.is_well_formed() {
            return Err(DescriptorError::InvalidVersion(self.version.to_string()));
        }
        self.manifest.validate()
    }

    /// Fold the deprecated `author`/`email` fields into `authors`.
    ///
    /// A one-element list is synthesised only when no `authors` list was
    /// supplied. The legacy fields themselves are left in place.
    pub fn migrate_legacy_author(mut self) -> (Self, LegacyAuthor) {
        let author = self.author.clone().unwrap_or_default();
        let email = self.email.clone().unwrap_or_default();

        if author.is_empty() && email.is_empty() {
            return (self, LegacyAuthor::Absent);
        }
        if !self.authors.is_empty() {
            return (self, LegacyAuthor::Ignored);
        }

        self.authors.push(Author {
            name: author,
            email,
        });
        (self, LegacyAuthor::Migrated)
    }

    /// Record build-time information: packaging time, the bundle format
    /// version and an optional revision.
    ///
    /// Whatever the source tree said about these fields is discarded, and so
    /// is any `axeId`: identities are only handed out at publish time.
    pub fn stamp(&mut self, timestamp: i64, revision: Option<String>) {
        self.timestamp = Some(timestamp);
        self.bundle_version = Some(BUNDLE_VERSION.to_string());
        self.revision = revision.filter(|r| !r.is_empty());
        self.axe_id = None;
    }

    /// Attach the identity assigned at publish time and return the new
    /// `<pluginName>-<axeId>` stem.
    pub fn assign_identity(&mut self, axe_id: impl Into<String>) -> String {
        let axe_id = axe_id.into();
        let stem = format!("{}-{axe_id}", self.plugin_name);
        self.axe_id = Some(axe_id);
        stem
    }

    /// `<pluginName>-<version>`, the stem of staged archive and sidecar names.
    pub fn versioned_stem(&self) -> String {
        format!("{}-{}", self.plugin_name, self.version)
    }

    /// `<pluginName>-<axeId>`, the stem of published archive names.
    ///
    /// Returns `None` before an identity has been assigned.
    pub fn identity_stem(&self) -> Option<String> {
        self.axe_id
            .as_ref()
            .map(|id| format!("{}-{id}", self.plugin_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAMENDO: &str = r#"{
        "name": "Jamendo",
        "pluginName": "jamendo",
        "author": "Leo Franchi",
        "email": "lfranchi@kde.org",
        "version": "0.4",
        "website": "http://gettomahawk.com",
        "description": "Searches Jamendo for free music",
        "type": "resolver/javascript",
        "platform": "any",
        "manifest": {
            "main": "jamendo.js",
            "scripts": [],
            "icon": "jamendo-icon.png",
            "resources": ["jamendo-config.ui"]
        }
    }"#;

    fn minimal(name: &str, version: &str) -> Descriptor {
        Descriptor::from_json(&format!(
            r#"{{"pluginName":"{name}","version":"{version}","manifest":{{"main":"a.js","icon":"i.png"}}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn parses_tomahawk_metadata() {
        let d = Descriptor::from_json(JAMENDO).unwrap();
        assert_eq!(d.plugin_name, "jamendo");
        assert_eq!(d.version, "0.4");
        assert_eq!(d.kind.as_deref(), Some("resolver/javascript"));
        assert_eq!(d.manifest.resources, vec!["jamendo-config.ui"]);
        assert_eq!(d.extra.get("platform"), Some(&serde_json::json!("any")));
        assert!(d.validate().is_ok());
    }

    #[test]
    fn absent_or_null_lists_are_empty() {
        let d = Descriptor::from_json(
            r#"{"pluginName":"x","version":"1","authors":null,
                "manifest":{"main":"a.js","icon":"i.png","scripts":null}}"#,
        )
        .unwrap();
        assert!(d.manifest.scripts.is_empty());
        assert!(d.manifest.resources.is_empty());
        assert!(d.authors.is_empty());
    }

    #[test]
    fn missing_manifest_is_parse_error() {
        assert!(Descriptor::from_json(r#"{"pluginName":"x","version":"1"}"#).is_err());
    }

    #[test]
    fn rejects_empty_and_malformed_identity() {
        assert_eq!(
            minimal("", "1").validate(),
            Err(DescriptorError::EmptyField("pluginName"))
        );
        assert_eq!(
            minimal("x", "").validate(),
            Err(DescriptorError::EmptyField("version"))
        );
        assert!(matches!(
            minimal("bad name", "1").validate(),
            Err(DescriptorError::InvalidName(_))
        ));
        assert!(matches!(
            minimal("x", "1 0").validate(),
            Err(DescriptorError::InvalidVersion(_))
        ));
    }

    #[test]
    fn rejects_empty_main_or_icon() {
        let mut d = minimal("x", "1");
        d.manifest.icon = "  ".to_string();
        assert_eq!(d.validate(), Err(DescriptorError::EmptyField("manifest.icon")));

        let mut d = minimal("x", "1");
        d.manifest.main = String::new();
        assert_eq!(d.validate(), Err(DescriptorError::EmptyField("manifest.main")));
    }

    #[test]
    fn rejects_paths_escaping_content_root() {
        let mut d = minimal("x", "1");
        d.manifest.scripts = vec!["../outside.js".to_string()];
        assert!(matches!(
            d.validate(),
            Err(DescriptorError::InvalidPath { field: "scripts", .. })
        ));

        let mut d = minimal("x", "1");
        d.manifest.resources = vec!["/etc/passwd".to_string()];
        assert!(matches!(
            d.validate(),
            Err(DescriptorError::InvalidPath { field: "resources", .. })
        ));

        let mut d = minimal("x", "1");
        d.manifest.resources = vec!["./ui/config.ui".to_string()];
        assert!(d.validate().is_ok());
    }

    #[test]
    fn legacy_author_migrates_once() {
        let d = Descriptor::from_json(JAMENDO).unwrap();
        let (d, status) = d.migrate_legacy_author();
        assert_eq!(status, LegacyAuthor::Migrated);
        assert_eq!(
            d.authors,
            vec![Author {
                name: "Leo Franchi".to_string(),
                email: "lfranchi@kde.org".to_string(),
            }]
        );

        // A second pass finds the list already populated.
        let (d, status) = d.migrate_legacy_author();
        assert_eq!(status, LegacyAuthor::Ignored);
        assert_eq!(d.authors.len(), 1);
    }

    #[test]
    fn explicit_authors_win_over_legacy_fields() {
        let mut d = minimal("x", "1");
        d.author = Some("Old".to_string());
        d.authors = vec![Author {
            name: "New".to_string(),
            email: String::new(),
        }];
        let (d, status) = d.migrate_legacy_author();
        assert_eq!(status, LegacyAuthor::Ignored);
        assert!(status.is_deprecated_use());
        assert_eq!(d.authors[0].name, "New");
    }

    #[test]
    fn no_legacy_fields_is_a_no_op() {
        let (d, status) = minimal("x", "1").migrate_legacy_author();
        assert_eq!(status, LegacyAuthor::Absent);
        assert!(!status.is_deprecated_use());
        assert!(d.authors.is_empty());
    }

    #[test]
    fn stamp_sets_build_fields() {
        let mut d = minimal("x", "1");
        d.stamp(1_700_000_000, Some(String::new()));
        assert_eq!(d.timestamp, Some(1_700_000_000));
        assert_eq!(d.bundle_version.as_deref(), Some(BUNDLE_VERSION));
        assert_eq!(d.revision, None);

        d.stamp(1_700_000_001, Some("abc1234".to_string()));
        assert_eq!(d.revision.as_deref(), Some("abc1234"));
    }

    #[test]
    fn stamp_discards_caller_supplied_build_fields() {
        let mut d = Descriptor::from_json(
            r#"{"pluginName":"x","version":"1","timestamp":1,"revision":"feed",
                "bundleVersion":"9","axeId":"caller-set",
                "manifest":{"main":"a.js","icon":"i.png"}}"#,
        )
        .unwrap();
        d.stamp(1_700_000_000, None);
        assert_eq!(d.timestamp, Some(1_700_000_000));
        assert_eq!(d.bundle_version.as_deref(), Some(BUNDLE_VERSION));
        assert_eq!(d.revision, None);
        assert_eq!(d.axe_id, None);
    }

    #[test]
    fn pretty_json_uses_camel_case_and_two_spaces() {
        let mut d = minimal("x", "1");
        d.stamp(42, None);
        d.assign_identity("0f5c");
        let json = d.to_pretty_json().unwrap();
        assert!(json.contains("\n  \"pluginName\": \"x\""));
        assert!(json.contains("\"bundleVersion\": \"2\""));
        assert!(json.contains("\"axeId\": \"0f5c\""));
        assert!(!json.contains("revision"));
    }

    #[test]
    fn manifest_entries_keep_declaration_order_and_duplicates() {
        let m = Manifest {
            main: "main.js".to_string(),
            scripts: vec!["a.js".to_string(), "main.js".to_string()],
            icon: "icon.png".to_string(),
            resources: vec!["ui/config.ui".to_string()],
        };
        let entries: Vec<_> = m.entries().collect();
        assert_eq!(
            entries,
            vec!["main.js", "a.js", "main.js", "icon.png", "ui/config.ui"]
        );
    }

    #[test]
    fn stems() {
        let mut d = minimal("spotify", "0.9");
        assert_eq!(d.versioned_stem(), "spotify-0.9");
        assert_eq!(d.identity_stem(), None);
        assert_eq!(d.assign_identity("1234"), "spotify-1234");
        assert_eq!(d.identity_stem().as_deref(), Some("spotify-1234"));
    }
}
