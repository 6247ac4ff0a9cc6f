//! Core library for makeaxe: descriptor loading, archive building, checksum
//! sidecars and publishing to a Relaxe catalog.

pub mod batch;
pub mod bundle;
pub mod catalog;
pub mod checksum;
pub mod config;
pub mod error;
pub mod metadata;
pub mod paths;
pub mod publish;
pub mod revision;

pub mod reporter;

pub use batch::{BatchSummary, build_all, publish_all};
pub use bundle::{BuildOptions, BuildOutcome, Packaged, package};
pub use catalog::{Catalog, CatalogError, SqliteCatalog};
pub use config::RelaxeConfig;
pub use error::{BundleError, ErrorKind};
pub use publish::{IdentityRename, PublishError, PublishOutcome, publish_one};
pub use reporter::{NullReporter, Reporter};
