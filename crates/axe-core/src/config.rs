//! Relaxe configuration file.
//!
//! ```toml
//! cache_directory = "/var/cache/relaxe"
//!
//! [database]
//! connection_string = "sqlite:///var/lib/relaxe/catalog.db"
//! ```
//!
//! `cache_directory` is optional. Relative paths are resolved against the
//! directory holding the config file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::catalog::{CatalogError, SqliteCatalog};
use crate::paths::default_cache_dir;

const SQLITE_SCHEME: &str = "sqlite://";
const IN_MEMORY: &str = ":memory:";

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file (or the cache directory) could not be accessed.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// A value is present but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    cache_directory: Option<PathBuf>,
    database: RawDatabase,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDatabase {
    connection_string: String,
}

/// Where the catalog lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLocation {
    /// A SQLite database file.
    File(PathBuf),
    /// A throwaway in-memory database.
    Memory,
}

/// Catalog connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// The connection string as written in the file.
    pub connection_string: String,
    /// Resolved location.
    pub location: CatalogLocation,
}

impl DatabaseConfig {
    /// Open the configured catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the database cannot be opened.
    pub fn open_catalog(&self) -> Result<SqliteCatalog, CatalogError> {
        match &self.location {
            CatalogLocation::File(path) => SqliteCatalog::open(path),
            CatalogLocation::Memory => SqliteCatalog::open_in_memory(),
        }
    }
}

/// Settings for a publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaxeConfig {
    /// Staging directory for archives before their identity rename.
    pub cache_directory: PathBuf,
    /// Catalog connection.
    pub database: DatabaseConfig,
}

impl RelaxeConfig {
    /// Read and resolve a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Parse`] for bad TOML, and [`ConfigError::Invalid`] for an
    /// empty connection string.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base_dir).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse config text, resolving relative paths against `base_dir`.
    ///
    /// # Errors
    ///
    /// See [`RelaxeConfig::load`].
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source: Box::new(source),
        })?;

        let connection_string = raw.database.connection_string.trim().to_string();
        if connection_string.is_empty() {
            return Err(ConfigError::Invalid(
                "database.connection_string is empty".to_string(),
            ));
        }
        let target = connection_string
            .strip_prefix(SQLITE_SCHEME)
            .unwrap_or(&connection_string);
        let location = if target == IN_MEMORY {
            CatalogLocation::Memory
        } else if target.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "connection string '{connection_string}' has no database path"
            )));
        } else {
            CatalogLocation::File(base_dir.join(target))
        };

        let cache_directory = raw
            .cache_directory
            .map_or_else(default_cache_dir, |dir| base_dir.join(dir));

        Ok(Self {
            cache_directory,
            database: DatabaseConfig {
                connection_string,
                location,
            },
        })
    }

    /// Create the cache directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the directory cannot be created.
    pub fn ensure_cache_directory(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.cache_directory).map_err(|source| ConfigError::Io {
            path: self.cache_directory.clone(),
            source,
        })
    }
}
