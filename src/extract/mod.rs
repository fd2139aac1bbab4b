//! Readable-content extraction
//!
//! Turns fetched HTML into the article fields stored for a bookmark. The
//! extractor is a stateful collaborator: the archiver owns a single instance
//! and serializes access to it.

mod readable;

pub use readable::ReadableExtractor;

use thiserror::Error;
use url::Url;

/// Errors raised while extracting content
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to parse document: {0}")]
    Parse(String),

    #[error("Extractor panicked: {0}")]
    Panic(String),
}

/// Fields extracted from a page; every field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub title: Option<String>,
    pub html: Option<String>,
    pub text: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub site_name: Option<String>,
}

/// Extraction collaborator
pub trait Extractor: Send {
    /// Extracts the readable article from `html`, fetched from `url`
    fn parse(&mut self, html: &str, url: &Url) -> Result<Extraction, ExtractError>;
}
