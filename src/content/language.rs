//! Language tagging
//!
//! Every archived document carries exactly one language from the supported
//! set. Its text fields are stored under that language's prefix so the
//! downstream indexer can pick a matching analyzer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Detection confidence a result must exceed to be trusted
pub const CONFIDENCE_THRESHOLD: f64 = 0.95;

/// Languages the downstream index has analyzers for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Language {
    #[default]
    English,
    Arabic,
    Danish,
    Dutch,
    Finnish,
    French,
    German,
    Hungarian,
    Italian,
    Persian,
    Portuguese,
    Romanian,
    Russian,
    Spanish,
    Swedish,
    Turkish,
}

impl Language {
    pub const ALL: [Language; 16] = [
        Self::English,
        Self::Arabic,
        Self::Danish,
        Self::Dutch,
        Self::Finnish,
        Self::French,
        Self::German,
        Self::Hungarian,
        Self::Italian,
        Self::Persian,
        Self::Portuguese,
        Self::Romanian,
        Self::Russian,
        Self::Spanish,
        Self::Swedish,
        Self::Turkish,
    ];

    /// Two-letter code used as the field prefix
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Arabic => "ar",
            Self::Danish => "da",
            Self::Dutch => "nl",
            Self::Finnish => "fi",
            Self::French => "fr",
            Self::German => "de",
            Self::Hungarian => "hu",
            Self::Italian => "it",
            Self::Persian => "fa",
            Self::Portuguese => "pt",
            Self::Romanian => "ro",
            Self::Russian => "ru",
            Self::Spanish => "es",
            Self::Swedish => "sv",
            Self::Turkish => "tr",
        }
    }

    /// Parses a two-letter code; None for anything outside the supported set
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|lang| lang.code() == code)
    }

    /// Maps an ISO 639-3 code (as reported by whatlang) to a supported language
    pub fn from_iso639_3(code: &str) -> Option<Self> {
        let lang = match code {
            "eng" => Self::English,
            "ara" | "arb" => Self::Arabic,
            "dan" => Self::Danish,
            "nld" => Self::Dutch,
            "fin" => Self::Finnish,
            "fra" => Self::French,
            "deu" => Self::German,
            "hun" => Self::Hungarian,
            "ita" => Self::Italian,
            "pes" | "fas" => Self::Persian,
            "por" => Self::Portuguese,
            "ron" => Self::Romanian,
            "rus" => Self::Russian,
            "spa" => Self::Spanish,
            "swe" => Self::Swedish,
            "tur" => Self::Turkish,
            _ => return None,
        };
        Some(lang)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.code().to_string()
    }
}

impl TryFrom<String> for Language {
    type Error = String;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::from_code(&code).ok_or_else(|| format!("unsupported language code: {}", code))
    }
}

/// One detection result
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Language code; two-letter for supported languages, raw otherwise
    pub code: String,
    /// Confidence between 0 and 1
    pub confidence: f64,
}

/// Language detector collaborator
pub trait LanguageDetector: Send + Sync {
    /// Detects the language of `text`, or None when nothing can be said
    fn detect(&self, text: &str) -> Option<Detection>;
}

/// Detector backed by the `whatlang` trigram model
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<Detection> {
        let info = whatlang::detect(text)?;
        let raw = info.lang().code();
        let code = Language::from_iso639_3(raw)
            .map(|lang| lang.code().to_string())
            .unwrap_or_else(|| raw.to_string());

        Some(Detection {
            code,
            confidence: info.confidence(),
        })
    }
}

/// Selects the language of a document from its text fields
///
/// `fields` are checked in order (body text, excerpt, title). Each non-empty
/// field overwrites the previous choice: a confident detection selects its
/// language, anything else selects English. The last non-empty field wins.
/// A final choice outside the supported set falls back to English.
pub fn tag_language(detector: &dyn LanguageDetector, fields: &[&str]) -> Language {
    let mut selected: Option<String> = None;

    for field in fields.iter().filter(|field| !field.is_empty()) {
        let code = match detector.detect(field) {
            Some(detection) if detection.confidence > CONFIDENCE_THRESHOLD => detection.code,
            _ => Language::default().code().to_string(),
        };
        selected = Some(code);
    }

    selected
        .as_deref()
        .and_then(Language::from_code)
        .unwrap_or_default()
}
