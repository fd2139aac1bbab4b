//! Database schema definitions
//!
//! This module contains the SQL schema of the archive database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Archived documents keyed by URL
CREATE TABLE IF NOT EXISTS documents (
    key BLOB PRIMARY KEY,
    value BLOB NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
