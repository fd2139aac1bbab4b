//! Stored document shape
//!
//! The record persisted for each bookmark is a flat string map. The four text
//! fields are namespaced by language (`<lang>_title`, `<lang>_html`,
//! `<lang>_text`, `<lang>_excerpt`); `lang`, `author`, `siteName`, `url` and
//! `folder` are not. The downstream indexer depends on these names.

use crate::content::Language;
use std::collections::BTreeMap;
use thiserror::Error;

pub const FIELD_LANG: &str = "lang";
pub const FIELD_AUTHOR: &str = "author";
pub const FIELD_SITE_NAME: &str = "siteName";
pub const FIELD_URL: &str = "url";
pub const FIELD_FOLDER: &str = "folder";

/// Errors raised while decoding a stored record
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Malformed document JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document is missing field '{0}'")]
    MissingField(String),

    #[error("Document has unsupported language '{0}'")]
    UnsupportedLanguage(String),
}

/// A normalized, language-tagged article ready to be stored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchivedDocument {
    pub url: String,
    pub folder: String,
    pub lang: Language,
    pub title: String,
    pub html: String,
    pub text: String,
    pub excerpt: String,
    pub author: String,
    pub site_name: String,
}

fn namespaced(lang: Language, field: &str) -> String {
    format!("{}_{}", lang.code(), field)
}

impl ArchivedDocument {
    /// Builds the stable field map written to the store
    ///
    /// Every field is always present, including `html`, even when empty.
    pub fn to_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert(namespaced(self.lang, "title"), self.title.clone());
        fields.insert(namespaced(self.lang, "html"), self.html.clone());
        fields.insert(namespaced(self.lang, "text"), self.text.clone());
        fields.insert(namespaced(self.lang, "excerpt"), self.excerpt.clone());
        fields.insert(FIELD_LANG.to_string(), self.lang.code().to_string());
        fields.insert(FIELD_AUTHOR.to_string(), self.author.clone());
        fields.insert(FIELD_SITE_NAME.to_string(), self.site_name.clone());
        fields.insert(FIELD_URL.to_string(), self.url.clone());
        fields.insert(FIELD_FOLDER.to_string(), self.folder.clone());
        fields
    }

    /// Rebuilds a document from a stored field map
    ///
    /// `lang` and `url` are required; any other missing field reads as empty.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Result<Self, DocumentError> {
        let code = fields
            .get(FIELD_LANG)
            .ok_or_else(|| DocumentError::MissingField(FIELD_LANG.to_string()))?;
        let lang = Language::from_code(code)
            .ok_or_else(|| DocumentError::UnsupportedLanguage(code.clone()))?;
        let url = fields
            .get(FIELD_URL)
            .cloned()
            .ok_or_else(|| DocumentError::MissingField(FIELD_URL.to_string()))?;

        let get = |key: &str| fields.get(key).cloned().unwrap_or_default();

        Ok(Self {
            url,
            folder: get(FIELD_FOLDER),
            lang,
            title: get(&namespaced(lang, "title")),
            html: get(&namespaced(lang, "html")),
            text: get(&namespaced(lang, "text")),
            excerpt: get(&namespaced(lang, "excerpt")),
            author: get(FIELD_AUTHOR),
            site_name: get(FIELD_SITE_NAME),
        })
    }

    /// Encodes the field map as the JSON value stored under the URL key
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.to_fields())
    }

    /// Decodes a stored JSON value
    pub fn from_json(bytes: &[u8]) -> Result<Self, DocumentError> {
        let fields: BTreeMap<String, String> = serde_json::from_slice(bytes)?;
        Self::from_fields(&fields)
    }
}
