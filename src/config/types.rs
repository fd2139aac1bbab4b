use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Nate-Archive
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub archiver: ArchiverConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

/// Archive pipeline behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArchiverConfig {
    /// Number of bookmarks processed concurrently
    #[serde(rename = "pool-size")]
    pub pool_size: u32,

    /// Requests per second allowed against a single host
    #[serde(rename = "host-rate-limit")]
    pub host_rate_limit: u32,

    /// Lightweight attempts before falling back to the headless browser
    #[serde(rename = "max-lightweight-attempts")]
    pub max_lightweight_attempts: u32,

    /// First backoff interval (milliseconds)
    #[serde(rename = "backoff-initial-ms")]
    pub backoff_initial_ms: u64,

    /// Backoff ceiling (milliseconds)
    #[serde(rename = "backoff-max-ms")]
    pub backoff_max_ms: u64,

    /// How long the bulk loop may wait for a free worker (milliseconds, 0 = forever)
    #[serde(rename = "schedule-timeout-ms")]
    pub schedule_timeout_ms: u64,
}

impl ArchiverConfig {
    pub fn backoff_initial(&self) -> Duration {
        Duration::from_millis(self.backoff_initial_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    /// Returns the schedule timeout, or None when submission should block
    pub fn schedule_timeout(&self) -> Option<Duration> {
        (self.schedule_timeout_ms > 0).then(|| Duration::from_millis(self.schedule_timeout_ms))
    }
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            pool_size: 100,
            host_rate_limit: 2,
            max_lightweight_attempts: 3,
            backoff_initial_ms: 10_000,
            backoff_max_ms: 60_000,
            schedule_timeout_ms: 0,
        }
    }
}

/// Lightweight (plain HTTP) fetcher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Referer header sent with every request
    pub referer: String,

    /// Accept-Language header sent with every request
    #[serde(rename = "accept-language")]
    pub accept_language: String,

    /// Optional CSV file with a weighted user agent pool
    #[serde(rename = "user-agents-path")]
    pub user_agents_path: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            referer: "https://www.google.com/".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            user_agents_path: None,
        }
    }
}

/// Headless browser (heavyweight fetcher) configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// When false the heavyweight tier always fails
    pub enabled: bool,

    /// Run the browser without a window
    pub headless: bool,

    /// Maximum number of pages rendered at the same time
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Navigation timeout (seconds)
    #[serde(rename = "navigation-timeout-secs")]
    pub navigation_timeout_secs: u64,

    /// User agent presented by the browser
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            headless: true,
            max_pages: 1,
            navigation_timeout_secs: 60,
            user_agent: crate::identity::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./nate.db".to_string(),
        }
    }
}

/// Bookmark source configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Path to the JSON bookmark export
    #[serde(rename = "bookmarks-path")]
    pub bookmarks_path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            bookmarks_path: "./bookmarks.json".to_string(),
        }
    }
}
