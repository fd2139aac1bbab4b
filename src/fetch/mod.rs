//! Page fetchers
//!
//! Pages are retrieved through one capability, [`PageFetcher`], with two
//! tiers behind it:
//! - a lightweight fetcher doing a plain HTTP request/response
//! - a heavyweight fetcher rendering the page in a headless browser
//!
//! The archive state machine picks the tier explicitly; the fetchers
//! themselves know nothing about retries or fallbacks.

#[cfg(feature = "chromium")]
mod browser;
mod http;

#[cfg(feature = "chromium")]
pub use browser::ChromiumFetcher;
pub use http::{build_http_client, HttpFetcher};

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Errors produced by a single fetch call
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} could not be sent: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read response body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Rendered page returned status {status}")]
    Status { status: u16 },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Headless browser tier is disabled")]
    TierDisabled,

    #[error("Fetch cancelled")]
    Cancelled,
}

/// Result of one fetch attempt
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// HTTP status code of the main document
    pub status_code: u16,

    /// Raw response body
    pub body: Vec<u8>,
}

impl FetchOutcome {
    pub fn new(status_code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// The two fetch tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Plain request/response without script execution
    Lightweight,
    /// Full browser engine executing scripts before returning HTML
    Heavyweight,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lightweight => write!(f, "lightweight"),
            Self::Heavyweight => write!(f, "heavyweight"),
        }
    }
}

/// Capability shared by both fetch tiers
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`, presenting `identity` as the client user agent when given
    ///
    /// Implementations must return [`FetchError::Cancelled`] promptly once
    /// `cancel` fires.
    async fn fetch(
        &self,
        url: &Url,
        identity: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, FetchError>;
}

/// Heavyweight stand-in used when browser rendering is turned off
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledFetcher;

#[async_trait]
impl PageFetcher for DisabledFetcher {
    async fn fetch(
        &self,
        _url: &Url,
        _identity: Option<&str>,
        _cancel: &CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        Err(FetchError::TierDisabled)
    }
}
