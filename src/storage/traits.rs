//! Storage traits and error types
//!
//! This module defines the key-value interface the archiver persists
//! documents through, and its error type.

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Store connection lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Transactional key-value store holding archived documents
///
/// Keys are raw URL bytes, values the JSON-encoded document field map.
/// `exists` followed by `put` is not atomic; two writers racing on one key
/// both succeed and the last write is kept.
pub trait DocumentStore: Send + Sync {
    /// Returns true if a value is stored under `key`
    fn exists(&self, key: &[u8]) -> StorageResult<bool>;

    /// Gets the value stored under `key`
    ///
    /// Returns [`StorageError::NotFound`] when nothing is stored.
    fn get(&self, key: &[u8]) -> StorageResult<Vec<u8>>;

    /// Stores `value` under `key`, replacing any previous value
    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Visits every entry in key order
    ///
    /// Iteration stops at the first error returned by `visit`.
    fn for_each(
        &self,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> StorageResult<()>,
    ) -> StorageResult<()>;
}
