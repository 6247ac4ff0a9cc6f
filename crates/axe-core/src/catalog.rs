//! The Relaxe catalog of published axes.
//!
//! Publishing needs two things from the catalog: how many records already
//! exist for a `(pluginName, version)` pair, and a way to insert a new one.
//! [`Catalog`] is that seam; [`SqliteCatalog`] is the bundled backend.

use std::path::{Path, PathBuf};

use axe_schema::{Descriptor, PluginName, Version};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// Catalog backend failures.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The SQLite backend reported an error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The descriptor could not be stored as JSON.
    #[error("cannot encode record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The directory for the database file could not be created.
    #[error("cannot create {}: {source}", path.display())]
    Io {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Only descriptors with an assigned `axeId` can be recorded.
    #[error("{0} has no axeId")]
    MissingIdentity(String),
}

/// Storage for published descriptors.
pub trait Catalog {
    /// Number of records with this plugin name and version.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the backend cannot be queried.
    fn count_by_name_and_version(
        &self,
        name: &PluginName,
        version: &Version,
    ) -> Result<u64, CatalogError>;

    /// Store a published descriptor. It must carry an `axeId`.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the descriptor has no identity or the
    /// backend rejects the write.
    fn insert(&mut self, descriptor: &Descriptor) -> Result<(), CatalogError>;
}

/// A stored catalog record.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    /// Unique identity of the published archive.
    pub axe_id: String,
    /// Unix seconds at which the record was inserted.
    pub published_at: i64,
    /// The descriptor as published.
    pub descriptor: Descriptor,
}

/// SQLite-backed catalog.
#[derive(Debug)]
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Open or create a catalog database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the parent directory cannot be created
    /// and [`CatalogError::Sqlite`] if the file cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CatalogError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let catalog = Self { conn };
        catalog.init_schema()?;
        Ok(catalog)
    }

    /// Open a private in-memory catalog (for tests and dry runs).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Sqlite`] if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let catalog = Self {
            conn: Connection::open_in_memory()?,
        };
        catalog.init_schema()?;
        Ok(catalog)
    }

    fn init_schema(&self) -> Result<(), CatalogError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS axes (
                axe_id TEXT PRIMARY KEY,
                plugin_name TEXT NOT NULL,
                version TEXT NOT NULL,
                published_at INTEGER NOT NULL,
                record TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_axes_name_version ON axes(plugin_name, version);
            ",
        )?;
        Ok(())
    }

    /// Look up a record by identity.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the query fails or the stored record no
    /// longer parses.
    pub fn get(&self, axe_id: &str) -> Result<Option<CatalogRecord>, CatalogError> {
        let row = self
            .conn
            .query_row(
                "SELECT axe_id, published_at, record FROM axes WHERE axe_id = ?1",
                params![axe_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(axe_id, published_at, record)| {
            Ok(CatalogRecord {
                axe_id,
                published_at,
                descriptor: serde_json::from_str(&record)?,
            })
        })
        .transpose()
    }

    /// All records for a plugin name and version, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the query fails or a stored record no
    /// longer parses.
    pub fn find_by_name_and_version(
        &self,
        name: &PluginName,
        version: &Version,
    ) -> Result<Vec<CatalogRecord>, CatalogError> {
        let mut stmt = self.conn.prepare(
            "SELECT axe_id, published_at, record FROM axes
             WHERE plugin_name = ?1 AND version = ?2
             ORDER BY published_at, axe_id",
        )?;

        let rows = stmt.query_map(params![name.as_str(), version.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (axe_id, published_at, record) = row?;
            records.push(CatalogRecord {
                axe_id,
                published_at,
                descriptor: serde_json::from_str(&record)?,
            });
        }
        Ok(records)
    }
}

impl Catalog for SqliteCatalog {
    fn count_by_name_and_version(
        &self,
        name: &PluginName,
        version: &Version,
    ) -> Result<u64, CatalogError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM axes WHERE plugin_name = ?1 AND version = ?2",
            params![name.as_str(), version.as_str()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn insert(&mut self, descriptor: &Descriptor) -> Result<(), CatalogError> {
        let axe_id = descriptor
            .axe_id
            .as_deref()
            .ok_or_else(|| CatalogError::MissingIdentity(descriptor.versioned_stem()))?;
        let record = serde_json::to_string(descriptor)?;

        self.conn.execute(
            "INSERT INTO axes (axe_id, plugin_name, version, published_at, record)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                axe_id,
                descriptor.plugin_name.as_str(),
                descriptor.version.as_str(),
                chrono::Utc::now().timestamp(),
                record
            ],
        )?;
        Ok(())
    }
}
