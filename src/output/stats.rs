//! Statistics generation from the archive database
//!
//! This module provides functionality for extracting and displaying
//! archive statistics from the document store.

use crate::content::{ArchivedDocument, Language};
use crate::storage::{DocumentStore, StorageError, StorageResult};
use std::collections::BTreeMap;

/// Archive statistics summary
#[derive(Debug, Clone, Default)]
pub struct ArchiveStatistics {
    /// Total number of stored documents
    pub total_documents: u64,

    /// Count of documents by language
    pub by_language: BTreeMap<Language, u64>,

    /// Count of documents by bookmark folder
    pub by_folder: BTreeMap<String, u64>,

    /// Documents stored without an author
    pub missing_author: u64,

    /// Documents whose extracted text is empty
    pub empty_text: u64,

    /// Records that could not be decoded
    pub undecodable: u64,
}

impl ArchiveStatistics {
    fn record(&mut self, document: &ArchivedDocument) {
        self.total_documents += 1;
        *self.by_language.entry(document.lang).or_insert(0) += 1;
        *self.by_folder.entry(document.folder.clone()).or_insert(0) += 1;
        if document.author.is_empty() {
            self.missing_author += 1;
        }
        if document.text.is_empty() {
            self.empty_text += 1;
        }
    }
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The document store to scan
///
/// # Returns
///
/// * `Ok(ArchiveStatistics)` - Successfully scanned the store
/// * `Err(StorageError)` - Failed to iterate the store
pub fn load_statistics(store: &dyn DocumentStore) -> StorageResult<ArchiveStatistics> {
    let mut stats = ArchiveStatistics::default();

    store.for_each(&mut |key, value| {
        match ArchivedDocument::from_json(value) {
            Ok(document) => stats.record(&document),
            Err(e) => {
                tracing::warn!(
                    "Skipping undecodable record {}: {}",
                    String::from_utf8_lossy(key),
                    e
                );
                stats.undecodable += 1;
            }
        }
        Ok::<(), StorageError>(())
    })?;

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &ArchiveStatistics) {
    println!("=== Archive Statistics ===\n");

    println!("Overview:");
    println!("  Archived documents: {}", stats.total_documents);
    println!("  Without author: {}", stats.missing_author);
    println!("  Without text: {}", stats.empty_text);
    if stats.undecodable > 0 {
        println!("  Undecodable records: {}", stats.undecodable);
    }
    println!();

    println!("Documents by Language:");
    let mut languages: Vec<_> = stats.by_language.iter().collect();
    languages.sort_by(|a, b| b.1.cmp(a.1));

    for (lang, count) in languages {
        let percentage = if stats.total_documents > 0 {
            (*count as f64 / stats.total_documents as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", lang, count, percentage);
    }
    println!();

    if !stats.by_folder.is_empty() {
        println!("Documents by Folder ({}):", stats.by_folder.len());
        for (folder, count) in &stats.by_folder {
            let name = if folder.is_empty() { "(root)" } else { folder };
            println!("  {}: {}", name, count);
        }
    }
}
