//! Archive orchestrator
//!
//! This module owns the archive pipeline. It:
//! - Dedups bookmarks against the document store
//! - Schedules one task per bookmark on the worker pool
//! - Takes a per-host rate-limit token before every fetch
//! - Runs the tiered fetch, extraction and normalization
//! - Persists the resulting document and reports progress

use crate::archive::limiter::{acquire, HostLimiter, HostRateLimiters};
use crate::archive::pool::{panic_message, PoolError, WorkerPool};
use crate::archive::tiered::{fetch_tiered, RetryPolicy, Tiers};
use crate::config::ArchiverConfig;
use crate::content::{normalize, Language, LanguageDetector};
use crate::extract::{ExtractError, Extraction, Extractor};
use crate::fetch::{FetchError, PageFetcher, Tier};
use crate::identity::IdentityProvider;
use crate::source::{BookmarkDescriptor, BookmarkSource};
use crate::state::{FailedFetch, FetchFailure, RunProgress, RunSummary};
use crate::storage::DocumentStore;
use crate::url::{extract_host, parse_bookmark_url};
use crate::{ArchiveError, Result};
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// External collaborators the archiver is wired with
pub struct Collaborators {
    pub source: Arc<dyn BookmarkSource>,
    pub store: Arc<dyn DocumentStore>,
    pub lightweight: Arc<dyn PageFetcher>,
    pub heavyweight: Arc<dyn PageFetcher>,
    pub extractor: Box<dyn Extractor>,
    pub detector: Arc<dyn LanguageDetector>,
    pub identity: Arc<dyn IdentityProvider>,
}

/// Result of archiving one bookmark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Already in the store and not forced; nothing fetched
    AlreadyStored,

    /// Fetched and persisted
    Archived {
        lang: Language,
        tier: Tier,
        attempts: u32,
    },
}

/// The archive pipeline
///
/// Cloning is cheap; clones share collaborators and the cancellation token.
#[derive(Clone)]
pub struct Archiver {
    config: Arc<ArchiverConfig>,
    source: Arc<dyn BookmarkSource>,
    store: Arc<dyn DocumentStore>,
    tiers: Tiers,
    // Single shared instance; extractions run one at a time.
    extractor: Arc<Mutex<Box<dyn Extractor>>>,
    detector: Arc<dyn LanguageDetector>,
    identity: Arc<dyn IdentityProvider>,
    cancel: CancellationToken,
}

impl Archiver {
    pub fn new(
        config: ArchiverConfig,
        collaborators: Collaborators,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config: Arc::new(config),
            source: collaborators.source,
            store: collaborators.store,
            tiers: Tiers {
                lightweight: collaborators.lightweight,
                heavyweight: collaborators.heavyweight,
            },
            extractor: Arc::new(Mutex::new(collaborators.extractor)),
            detector: collaborators.detector,
            identity: collaborators.identity,
            cancel,
        }
    }

    /// Token cancelling every operation of this archiver
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Archives a single bookmark
    ///
    /// Unless `force` is set, a bookmark already in the store is left alone
    /// and nothing is fetched. Errors are returned to the caller as-is.
    ///
    /// # Arguments
    ///
    /// * `descriptor` - The bookmark to archive
    /// * `force` - Re-fetch and overwrite an existing record
    pub async fn archive(
        &self,
        descriptor: &BookmarkDescriptor,
        force: bool,
    ) -> Result<ArchiveOutcome> {
        let url = parse_bookmark_url(&descriptor.url).map_err(|source| {
            ArchiveError::InvalidBookmarkUrl {
                url: descriptor.url.clone(),
                source,
            }
        })?;
        let key = descriptor.url.as_bytes();

        if !force && self.store.exists(key)? {
            tracing::debug!("{} already archived, skipping", descriptor.url);
            return Ok(ArchiveOutcome::AlreadyStored);
        }

        let policy = RetryPolicy::from(self.config.as_ref());
        let page = fetch_tiered(
            &self.tiers,
            self.identity.as_ref(),
            &policy,
            &url,
            &self.cancel,
        )
        .await
        .map_err(|failed| fetch_failure(&descriptor.url, failed))?;

        let html = String::from_utf8_lossy(&page.body).into_owned();
        let extraction = self
            .extract(html, url)
            .await
            .map_err(|source| ArchiveError::Extraction {
                url: descriptor.url.clone(),
                source,
            })?;

        let document = normalize(descriptor, extraction, self.detector.as_ref());
        let value = document.to_json().map_err(|source| ArchiveError::Encode {
            url: descriptor.url.clone(),
            source,
        })?;

        self.store
            .put(key, &value)
            .map_err(|source| ArchiveError::Save {
                url: descriptor.url.clone(),
                source,
            })?;

        tracing::info!(
            "Archived {} [{}] via {} tier after {} attempt(s)",
            descriptor.url,
            document.lang,
            page.tier,
            page.attempts
        );

        Ok(ArchiveOutcome::Archived {
            lang: document.lang,
            tier: page.tier,
            attempts: page.attempts,
        })
    }

    /// Runs the shared extractor on the blocking pool
    ///
    /// Extractions are serialized by the mutex; waiting for it never holds a
    /// runtime worker thread.
    async fn extract(
        &self,
        html: String,
        url: Url,
    ) -> std::result::Result<Extraction, ExtractError> {
        let extractor = Arc::clone(&self.extractor);
        let joined = tokio::task::spawn_blocking(move || {
            // The extractor keeps no per-document state; a poisoned lock is still usable.
            let mut extractor = extractor.lock().unwrap_or_else(PoisonError::into_inner);
            catch_unwind(AssertUnwindSafe(|| extractor.parse(&html, &url)))
        })
        .await;

        match joined {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(ExtractError::Panic(panic_message(&*panic))),
            Err(e) => Err(ExtractError::Panic(e.to_string())),
        }
    }

    /// Archives every bookmark of the source
    ///
    /// Per-bookmark failures are logged and counted; the run goes on. A
    /// malformed bookmark URL or a failing source/store lookup aborts the
    /// run after in-flight tasks finish. Cancellation stops scheduling and
    /// returns a summary marked as cancelled.
    pub async fn run_all(&self, force: bool) -> Result<RunSummary> {
        let bookmarks = self.source.list()?;
        let total = bookmarks.len() as u64;
        let started = Instant::now();

        let pool = WorkerPool::new(self.config.pool_size as usize);
        let limiters = HostRateLimiters::new(
            NonZeroU32::new(self.config.host_rate_limit).unwrap_or(NonZeroU32::MIN),
        );
        let progress = Arc::new(RunProgress::new(total));

        tracing::info!(
            "Archiving {} bookmark(s) with {} workers, {} req/s per host{}",
            total,
            pool.capacity(),
            self.config.host_rate_limit,
            if force { " (forced)" } else { "" }
        );

        let mut fatal: Option<ArchiveError> = None;
        let mut scheduled: HashSet<String> = HashSet::new();

        for descriptor in bookmarks {
            if self.cancel.is_cancelled() {
                tracing::info!("Cancellation requested, no more bookmarks will be scheduled");
                break;
            }

            let url = match parse_bookmark_url(&descriptor.url) {
                Ok(url) => url,
                Err(source) => {
                    fatal = Some(ArchiveError::InvalidBookmarkUrl {
                        url: descriptor.url.clone(),
                        source,
                    });
                    break;
                }
            };

            if !scheduled.insert(descriptor.url.clone()) {
                tracing::debug!(
                    "{} listed again under '{}', already scheduled",
                    descriptor.url,
                    descriptor.folder_path
                );
                progress.record_skipped();
                continue;
            }

            if !force {
                match self.store.exists(descriptor.url.as_bytes()) {
                    Ok(true) => {
                        tracing::debug!("{} already archived, skipping", descriptor.url);
                        progress.record_skipped();
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        fatal = Some(e.into());
                        break;
                    }
                }
            }

            let host = extract_host(&url).unwrap_or_default();
            let limiter = limiters.limiter(&host);
            let task = self
                .clone()
                .bookmark_task(descriptor, limiter, Arc::clone(&progress), force);

            let submitted = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!("Cancellation requested while waiting for a free worker");
                    break;
                }
                submitted = async {
                    match self.config.schedule_timeout() {
                        Some(timeout) => pool.submit_with_timeout(task, timeout).await,
                        None => pool.submit(task).await,
                    }
                } => submitted,
            };

            match submitted {
                Ok(()) => {}
                Err(PoolError::ScheduleTimeout(timeout)) => {
                    tracing::error!("No free worker for {} within {:?}", url, timeout);
                    progress.record_failed();
                }
                Err(e) => {
                    fatal = Some(e.into());
                    break;
                }
            }
        }

        pool.wait().await;

        let summary = progress.summary(self.cancel.is_cancelled());
        tracing::info!(
            "Archive run finished: {} in {:?}",
            summary,
            started.elapsed()
        );

        match fatal {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    /// Task run on the pool for one bookmark
    ///
    /// Progress advances exactly once: when the outcome is known, or through
    /// the [`Completion`] guard if the task unwinds first.
    async fn bookmark_task(
        self,
        descriptor: BookmarkDescriptor,
        limiter: HostLimiter,
        progress: Arc<RunProgress>,
        force: bool,
    ) -> Result<()> {
        let completion = Completion::new(progress);

        if !acquire(&limiter, &self.cancel).await {
            completion.failed();
            tracing::debug!("Cancelled before fetching {}", descriptor.url);
            return Ok(());
        }

        match self.archive(&descriptor, force).await {
            Ok(ArchiveOutcome::AlreadyStored) => completion.skipped(),
            Ok(ArchiveOutcome::Archived { .. }) => completion.archived(),
            Err(ArchiveError::Cancelled) => {
                completion.failed();
                tracing::debug!("Cancelled while archiving {}", descriptor.url);
            }
            Err(e) => {
                completion.failed();
                tracing::error!("{}", e);
            }
        }

        Ok(())
    }
}

fn fetch_failure(url: &str, failed: FailedFetch) -> ArchiveError {
    let FailedFetch { error, attempts } = failed;
    match error {
        FetchFailure::Fetch(FetchError::Cancelled) => ArchiveError::Cancelled,
        FetchFailure::Fetch(source) => ArchiveError::Fetch {
            url: url.to_string(),
            attempts,
            source,
        },
        FetchFailure::EmptyBody => ArchiveError::EmptyBody {
            url: url.to_string(),
            attempts,
        },
    }
}

/// Records a failure if dropped before an outcome was recorded
struct Completion {
    progress: Arc<RunProgress>,
    recorded: bool,
}

impl Completion {
    fn new(progress: Arc<RunProgress>) -> Self {
        Self {
            progress,
            recorded: false,
        }
    }

    fn skipped(mut self) {
        self.recorded = true;
        self.progress.record_skipped();
    }

    fn archived(mut self) {
        self.recorded = true;
        self.progress.record_archived();
    }

    fn failed(mut self) {
        self.recorded = true;
        self.progress.record_failed();
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if !self.recorded {
            self.progress.record_failed();
        }
    }
}
