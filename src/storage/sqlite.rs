//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the DocumentStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DocumentStore, StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
///
/// The connection sits behind a mutex so one store can be shared by every
/// worker of a run.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the archive database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for concurrent readers and fewer fsyncs
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        tracing::debug!("Opened document store at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Counts stored documents
    pub fn count(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl DocumentStore for SqliteStore {
    fn exists(&self, key: &[u8]) -> StorageResult<bool> {
        let conn = self.lock()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM documents WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn get(&self, key: &[u8]) -> StorageResult<Vec<u8>> {
        let conn = self.lock()?;
        let value: Option<Vec<u8>> = conn
            .query_row(
                "SELECT value FROM documents WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        value.ok_or_else(|| StorageError::NotFound(String::from_utf8_lossy(key).into_owned()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO documents (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn for_each(
        &self,
        visit: &mut dyn FnMut(&[u8], &[u8]) -> StorageResult<()>,
    ) -> StorageResult<()> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key, value FROM documents ORDER BY key")?;
        let mut rows = stmt.query([])?;

        while let Some(row) = rows.next()? {
            let key: Vec<u8> = row.get(0)?;
            let value: Vec<u8> = row.get(1)?;
            visit(&key, &value)?;
        }

        Ok(())
    }
}
