//! Content normalizer
//!
//! Turns an extraction result into the record stored for a bookmark:
//! - Missing fields become empty strings
//! - The title defaults to the bookmark's own title
//! - One language is selected from body text, excerpt and title

mod document;
mod language;

pub use document::{ArchivedDocument, DocumentError};
pub use language::{
    tag_language, Detection, Language, LanguageDetector, WhatlangDetector, CONFIDENCE_THRESHOLD,
};

use crate::extract::Extraction;
use crate::source::BookmarkDescriptor;

/// Builds the stored document for `descriptor` from its extraction result
///
/// # Arguments
///
/// * `descriptor` - The bookmark being archived
/// * `extraction` - Fields extracted from the fetched page
/// * `detector` - Language detector used for tagging
pub fn normalize(
    descriptor: &BookmarkDescriptor,
    extraction: Extraction,
    detector: &dyn LanguageDetector,
) -> ArchivedDocument {
    let title = extraction
        .title
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| descriptor.original_title.clone());
    let html = extraction.html.unwrap_or_default();
    let text = extraction.text.unwrap_or_default();
    let excerpt = extraction.excerpt.unwrap_or_default();

    let lang = tag_language(detector, &[text.as_str(), excerpt.as_str(), title.as_str()]);

    ArchivedDocument {
        url: descriptor.url.clone(),
        folder: descriptor.folder_path.clone(),
        lang,
        title,
        html,
        text,
        excerpt,
        author: extraction.author.unwrap_or_default(),
        site_name: extraction.site_name.unwrap_or_default(),
    }
}
