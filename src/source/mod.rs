//! Bookmark sources
//!
//! A source hands the archiver the full list of bookmarks for one run. The
//! list is read once and fully materialized; the archiver never streams it.

mod json;

pub use json::{parse_bookmarks, JsonBookmarkFile, FOLDER_SEPARATOR};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while listing bookmarks
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read bookmarks from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse bookmark export: {0}")]
    Json(#[from] serde_json::Error),
}

/// One bookmark to archive; the URL is the dedup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkDescriptor {
    pub url: String,
    pub folder_path: String,
    pub original_title: String,
}

impl BookmarkDescriptor {
    pub fn new(
        url: impl Into<String>,
        folder_path: impl Into<String>,
        original_title: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            folder_path: folder_path.into(),
            original_title: original_title.into(),
        }
    }
}

/// Source collaborator
pub trait BookmarkSource: Send + Sync {
    /// Lists every bookmark of the run
    fn list(&self) -> Result<Vec<BookmarkDescriptor>, SourceError>;
}

/// Source over an in-memory list
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    bookmarks: Vec<BookmarkDescriptor>,
}

impl StaticSource {
    pub fn new(bookmarks: Vec<BookmarkDescriptor>) -> Self {
        Self { bookmarks }
    }
}

impl BookmarkSource for StaticSource {
    fn list(&self) -> Result<Vec<BookmarkDescriptor>, SourceError> {
        Ok(self.bookmarks.clone())
    }
}
