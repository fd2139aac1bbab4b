//! URL handling module for Nate-Archive
//!
//! Bookmark URLs are the dedup key of the store and are kept exactly as the
//! source reports them. This module only validates them and derives the host
//! key used for per-host rate limiting.

mod domain;

use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use domain::extract_host;

/// Parses a bookmark URL, rejecting anything that cannot be fetched over HTTP
///
/// A failure here means the bookmark data itself is malformed, which is
/// fatal to a bulk run.
///
/// # Examples
///
/// ```
/// use nate_archive::url::parse_bookmark_url;
///
/// let url = parse_bookmark_url("https://example.com/post?id=1").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(parse_bookmark_url("javascript:alert(1)").is_err());
/// assert!(parse_bookmark_url("not a url").is_err());
/// ```
pub fn parse_bookmark_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}
