//! Nate-Archive: a bookmark archiver
//!
//! This crate fetches the pages behind a list of bookmarks, extracts the
//! readable article, tags it with a detected language and stores a normalized
//! record in a key-value store for later full-text indexing.

pub mod archive;
pub mod config;
pub mod content;
pub mod extract;
pub mod fetch;
pub mod identity;
pub mod output;
pub mod source;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Nate-Archive operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Invalid bookmark URL {url}: {source}")]
    InvalidBookmarkUrl { url: String, source: UrlError },

    #[error("Bookmark source error: {0}")]
    Source(#[from] source::SourceError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Failed to fetch {url} after {attempts} attempt(s): {source}")]
    Fetch {
        url: String,
        attempts: u32,
        source: fetch::FetchError,
    },

    #[error("Empty body for {url} after {attempts} attempt(s)")]
    EmptyBody { url: String, attempts: u32 },

    #[error("Failed to extract content from {url}: {source}")]
    Extraction {
        url: String,
        source: extract::ExtractError,
    },

    #[error("Failed to encode document for {url}: {source}")]
    Encode {
        url: String,
        source: serde_json::Error,
    },

    #[error("Couldn't save document {url}: {source}")]
    Save {
        url: String,
        source: storage::StorageError,
    },

    #[error("Worker pool error: {0}")]
    Pool(#[from] archive::PoolError),

    #[error("Run cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(#[from] ::url::ParseError),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Nate-Archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use archive::{Archiver, Collaborators};
pub use config::Config;
pub use content::{ArchivedDocument, Language};
pub use source::BookmarkDescriptor;
pub use state::{FetchState, RunProgress, RunSummary};
pub use url::{extract_host, parse_bookmark_url};
