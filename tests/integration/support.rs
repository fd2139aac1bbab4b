//! Scripted collaborators shared by the integration tests

use async_trait::async_trait;
use nate_archive::archive::{Archiver, Collaborators};
use nate_archive::config::ArchiverConfig;
use nate_archive::content::{Detection, LanguageDetector};
use nate_archive::extract::{ExtractError, Extraction, Extractor, ReadableExtractor};
use nate_archive::fetch::{FetchError, FetchOutcome, PageFetcher};
use nate_archive::identity::IdentityProvider;
use nate_archive::source::{BookmarkSource, StaticSource};
use nate_archive::storage::SqliteStore;
use nate_archive::BookmarkDescriptor;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

pub const PAGE: &str = r#"<html><head><title>Scripted page</title></head>
<body><article><p>Archived body text.</p></article></body></html>"#;

/// One scripted fetcher reply
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, &'static str),
    TimedOut,
    Slow(Duration),
}

/// Fetcher replaying per-URL scripts and recording every call
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    fallback: Reply,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedFetcher {
    /// Answers every URL with `fallback` unless scripted otherwise
    pub fn new(fallback: Reply) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(HashMap::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::new(Reply::Status(200, PAGE))
    }

    /// Queues `replies` for `url`; once used up the fallback applies
    pub fn script(self: &Arc<Self>, url: &str, replies: Vec<Reply>) -> Arc<Self> {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into());
        Arc::clone(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called == url)
            .count()
    }

    pub fn timestamps(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        url: &Url,
        _identity: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));

        let reply = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(url.as_str())
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Status(status, body) => Ok(FetchOutcome::new(status, body)),
            Reply::TimedOut => Err(FetchError::Timeout(Duration::from_secs(30))),
            Reply::Slow(delay) => tokio::select! {
                _ = cancel.cancelled() => Err(FetchError::Cancelled),
                _ = tokio::time::sleep(delay) => Ok(FetchOutcome::new(200, PAGE)),
            },
        }
    }
}

/// Extractor returning the same fields for every page
pub struct FixedExtractor(pub Extraction);

impl Extractor for FixedExtractor {
    fn parse(&mut self, _html: &str, _url: &Url) -> Result<Extraction, ExtractError> {
        Ok(self.0.clone())
    }
}

/// Detector answering from a fixed table of texts
#[derive(Default)]
pub struct TableDetector(pub HashMap<String, (String, f64)>);

impl TableDetector {
    pub fn with(mut self, text: &str, code: &str, confidence: f64) -> Self {
        self.0
            .insert(text.to_string(), (code.to_string(), confidence));
        self
    }
}

impl LanguageDetector for TableDetector {
    fn detect(&self, text: &str) -> Option<Detection> {
        self.0.get(text).map(|(code, confidence)| Detection {
            code: code.clone(),
            confidence: *confidence,
        })
    }
}

pub struct FixedIdentity;

impl IdentityProvider for FixedIdentity {
    fn next(&self) -> String {
        "Agent/Test".to_string()
    }
}

/// Configuration with millisecond backoff and no effective host limit
pub fn fast_config() -> ArchiverConfig {
    ArchiverConfig {
        pool_size: 8,
        host_rate_limit: 1000,
        max_lightweight_attempts: 3,
        backoff_initial_ms: 1,
        backoff_max_ms: 5,
        schedule_timeout_ms: 0,
    }
}

pub fn bookmark(url: &str) -> BookmarkDescriptor {
    BookmarkDescriptor::new(url, "Tests", "Bookmark title")
}

/// An archiver wired to scripted collaborators
pub struct Harness {
    pub archiver: Archiver,
    pub store: Arc<SqliteStore>,
    pub light: Arc<ScriptedFetcher>,
    pub heavy: Arc<ScriptedFetcher>,
    pub cancel: CancellationToken,
}

pub struct HarnessBuilder {
    config: ArchiverConfig,
    bookmarks: Vec<BookmarkDescriptor>,
    light: Arc<ScriptedFetcher>,
    heavy: Arc<ScriptedFetcher>,
    network: Option<Arc<dyn PageFetcher>>,
    extractor: Box<dyn Extractor>,
    detector: Arc<dyn LanguageDetector>,
    store: Arc<SqliteStore>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: fast_config(),
            bookmarks: Vec::new(),
            light: ScriptedFetcher::ok(),
            heavy: ScriptedFetcher::ok(),
            network: None,
            extractor: Box::new(ReadableExtractor::new().unwrap()),
            detector: Arc::new(TableDetector::default()),
            store: Arc::new(SqliteStore::open_in_memory().unwrap()),
        }
    }

    pub fn config(mut self, config: ArchiverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bookmarks(mut self, bookmarks: Vec<BookmarkDescriptor>) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    pub fn light(mut self, fetcher: Arc<ScriptedFetcher>) -> Self {
        self.light = fetcher;
        self
    }

    pub fn heavy(mut self, fetcher: Arc<ScriptedFetcher>) -> Self {
        self.heavy = fetcher;
        self
    }

    /// Replaces the scripted lightweight tier with a real fetcher
    pub fn network(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.network = Some(fetcher);
        self
    }

    pub fn extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn detector(mut self, detector: impl LanguageDetector + 'static) -> Self {
        self.detector = Arc::new(detector);
        self
    }

    pub fn build(self) -> Harness {
        self.build_with_source(None)
    }

    pub fn build_with_source(self, source: Option<Arc<dyn BookmarkSource>>) -> Harness {
        let cancel = CancellationToken::new();
        let source = source.unwrap_or_else(|| Arc::new(StaticSource::new(self.bookmarks)));
        let collaborators = Collaborators {
            source,
            store: self.store.clone(),
            lightweight: match self.network {
                Some(fetcher) => fetcher,
                None => self.light.clone(),
            },
            heavyweight: self.heavy.clone(),
            extractor: self.extractor,
            detector: self.detector,
            identity: Arc::new(FixedIdentity),
        };

        Harness {
            archiver: Archiver::new(self.config, collaborators, cancel.clone()),
            store: self.store,
            light: self.light,
            heavy: self.heavy,
            cancel,
        }
    }
}
