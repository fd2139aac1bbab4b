//! Headless browser fetcher
//!
//! Renders pages in Chromium through the DevTools protocol and returns the
//! document HTML after scripts have run. One browser process is shared by the
//! whole run; the number of pages rendered at once is capped by `max-pages`.

use crate::config::BrowserConfig;
use crate::fetch::{FetchError, FetchOutcome, PageFetcher};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Reads the main document status from the Navigation Timing API (0 when unknown)
const STATUS_SCRIPT: &str =
    "(performance.getEntriesByType('navigation')[0] || {}).responseStatus || 0";

fn browser_error(err: impl std::fmt::Display) -> FetchError {
    FetchError::Browser(err.to_string())
}

/// Heavyweight fetcher backed by a headless Chromium
pub struct ChromiumFetcher {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    pages: Semaphore,
    navigation_timeout: Duration,
}

impl ChromiumFetcher {
    /// Launches the browser and starts driving its event handler
    pub async fn launch(config: &BrowserConfig) -> Result<Self, FetchError> {
        let mut builder = LaunchConfig::builder().arg(format!("--user-agent={}", config.user_agent));
        if !config.headless {
            builder = builder.with_head();
        }
        let launch_config = builder.build().map_err(FetchError::Browser)?;

        let (browser, mut handler) = Browser::launch(launch_config)
            .await
            .map_err(browser_error)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler event error: {}", e);
                }
            }
        });

        tracing::info!(
            "Headless browser launched (max pages: {}, headless: {})",
            config.max_pages,
            config.headless
        );

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            pages: Semaphore::new(config.max_pages as usize),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        })
    }

    /// Closes the browser and stops the handler task
    pub async fn shutdown(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = browser.wait().await {
            tracing::debug!("Browser process wait failed: {}", e);
        }
        self.handler.abort();
    }

    async fn render(&self, page: &Page, url: &Url) -> Result<FetchOutcome, FetchError> {
        page.goto(url.as_str()).await.map_err(browser_error)?;

        let status: i64 = page
            .evaluate(STATUS_SCRIPT)
            .await
            .map_err(browser_error)?
            .into_value()
            .map_err(browser_error)?;

        // Chromium reports 0 when the status is not exposed; the page rendered,
        // so treat it as a success.
        let status_code = if status == 0 { 200 } else { status as u16 };
        if !(200..300).contains(&status_code) {
            return Err(FetchError::Status {
                status: status_code,
            });
        }

        let html = page.content().await.map_err(browser_error)?;
        Ok(FetchOutcome::new(status_code, html))
    }
}

#[async_trait]
impl PageFetcher for ChromiumFetcher {
    async fn fetch(
        &self,
        url: &Url,
        _identity: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            permit = self.pages.acquire() => permit.map_err(browser_error)?,
        };

        let page = {
            let browser = self.browser.lock().await;
            browser.new_page("about:blank").await.map_err(browser_error)?
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            rendered = tokio::time::timeout(self.navigation_timeout, self.render(&page, url)) => {
                rendered.unwrap_or(Err(FetchError::Timeout(self.navigation_timeout)))
            }
        };

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close page for {}: {}", url, e);
        }

        result
    }
}
