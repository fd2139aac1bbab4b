//! JSON bookmark export reader
//!
//! The export is a tree of folders and links:
//!
//! ```json
//! {"folders": [{"type": "folder", "title": "Rust", "items": [
//!     {"type": "link", "title": "Book", "href": "https://doc.rust-lang.org/book/"}
//! ]}]}
//! ```
//!
//! Links are flattened depth-first; nested folder titles are joined with `::`.

use crate::source::{BookmarkDescriptor, BookmarkSource, SourceError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Separator between nested folder titles in a folder path
pub const FOLDER_SEPARATOR: &str = "::";

#[derive(Debug, Deserialize)]
struct RootFolder {
    #[serde(default)]
    folders: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct Node {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    href: String,
    #[serde(default)]
    items: Vec<Node>,
}

/// Bookmark source backed by a JSON export file
#[derive(Debug, Clone)]
pub struct JsonBookmarkFile {
    path: PathBuf,
}

impl JsonBookmarkFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BookmarkSource for JsonBookmarkFile {
    fn list(&self) -> Result<Vec<BookmarkDescriptor>, SourceError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let bookmarks = parse_bookmarks(&content)?;

        tracing::debug!(
            "Read {} bookmark(s) from {}",
            bookmarks.len(),
            self.path.display()
        );

        Ok(bookmarks)
    }
}

/// Parses and flattens a JSON bookmark export
pub fn parse_bookmarks(content: &str) -> Result<Vec<BookmarkDescriptor>, SourceError> {
    let root: RootFolder = serde_json::from_str(content)?;
    let mut out = Vec::new();
    flatten(&root.folders, "", &mut out);
    Ok(out)
}

fn flatten(nodes: &[Node], parent: &str, out: &mut Vec<BookmarkDescriptor>) {
    for node in nodes {
        match node.kind.as_str() {
            "link" => out.push(BookmarkDescriptor {
                url: node.href.clone(),
                folder_path: parent.to_string(),
                original_title: node.title.clone(),
            }),
            "folder" => {
                let path = if parent.is_empty() {
                    node.title.clone()
                } else {
                    format!("{}{}{}", parent, FOLDER_SEPARATOR, node.title)
                };
                flatten(&node.items, &path, out);
            }
            other => tracing::trace!("Skipping bookmark node of type '{}'", other),
        }
    }
}
