//! Storage module for persisting archived documents
//!
//! This module is the store gateway of the archiver:
//! - SQLite database initialization and schema management
//! - Existence checks used for dedup
//! - Transactional upserts of document records
//! - Forward iteration for downstream consumers

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{DocumentStore, StorageError, StorageResult};

use std::path::Path;

/// Opens the archive database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully opened store
/// * `Err(StorageError)` - Failed to open store
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::open(path)
}
