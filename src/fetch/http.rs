//! Lightweight HTTP fetcher
//!
//! This module handles plain HTTP retrieval of bookmarked pages, including:
//! - Building the HTTP client with timeouts and compression
//! - Attaching browser-like headers and the rotating user agent per request
//! - Racing the request and body read against cancellation
//!
//! Status codes are returned as-is; deciding what a 403 or 503 means is the
//! archive state machine's job.

use crate::config::FetcherConfig;
use crate::fetch::{FetchError, FetchOutcome, PageFetcher};
use crate::identity::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_CHARSET, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Accept header of a desktop browser requesting a document
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.9";

/// Maximum number of redirects followed for one request
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use nate_archive::config::FetcherConfig;
/// use nate_archive::fetch::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain request/response fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    referer: String,
    accept_language: String,
}

impl HttpFetcher {
    /// Creates a fetcher from the `[fetcher]` configuration section
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = build_http_client(config).map_err(FetchError::Client)?;
        Ok(Self {
            client,
            referer: config.referer.clone(),
            accept_language: config.accept_language.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &Url,
        identity: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_CHARSET, "utf-8")
            .header(ACCEPT_LANGUAGE, self.accept_language.as_str())
            .header(REFERER, self.referer.as_str());

        if let Some(identity) = identity {
            request = request.header(USER_AGENT, identity);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = request.send() => result.map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?,
        };

        let status_code = response.status().as_u16();

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = response.bytes() => result.map_err(|source| FetchError::Body {
                url: url.to_string(),
                source,
            })?,
        };

        tracing::trace!("GET {} -> {} ({} bytes)", url, status_code, body.len());

        Ok(FetchOutcome {
            status_code,
            body: body.to_vec(),
        })
    }
}
