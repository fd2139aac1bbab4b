//! Nate-Archive main entry point
//!
//! This is the command-line interface for the Nate-Archive bookmark archiver.

use anyhow::Context;
use clap::Parser;
use nate_archive::config::{load_config_with_hash, validate, BrowserConfig, Config};
use nate_archive::content::WhatlangDetector;
use nate_archive::extract::ReadableExtractor;
use nate_archive::fetch::{DisabledFetcher, HttpFetcher, PageFetcher};
use nate_archive::identity::RotatingIdentity;
use nate_archive::source::{BookmarkSource, JsonBookmarkFile, StaticSource};
use nate_archive::storage::open_store;
use nate_archive::{parse_bookmark_url, ArchiveError, Archiver, BookmarkDescriptor, Collaborators};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "chromium")]
use nate_archive::fetch::ChromiumFetcher;

/// Nate-Archive: a bookmark archiver
///
/// Nate-Archive fetches the pages behind your bookmarks, extracts the
/// readable article, tags its language and stores it for later indexing.
/// With a URL it archives that single bookmark; otherwise it archives every
/// bookmark of the configured export.
#[derive(Parser, Debug)]
#[command(name = "nate-archive")]
#[command(version = "1.0.0")]
#[command(about = "Fetch and archive bookmarked pages", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Archive only this URL
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Folder path recorded for the single URL
    #[arg(value_name = "FOLDER", requires = "url")]
    folder: Option<String>,

    /// Title recorded for the single URL when the page has none
    #[arg(value_name = "TITLE", requires = "folder")]
    title: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Re-archive bookmarks that are already stored
    #[arg(short = 'F', long)]
    force: bool,

    /// Override the worker pool size
    #[arg(short = 'c', long, value_name = "N")]
    concurrency: Option<u32>,

    /// Override the JSON bookmark export path
    #[arg(short = 'f', long, value_name = "PATH")]
    bookmarks: Option<PathBuf>,

    /// Validate config and list the bookmarks that would be archived, without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    apply_overrides(&mut config, &cli)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_archive(config, &cli).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("nate_archive=info,warn"),
            1 => EnvFilter::new("nate_archive=debug,info"),
            2 => EnvFilter::new("nate_archive=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides and re-validates the result
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(concurrency) = cli.concurrency {
        config.archiver.pool_size = concurrency;
    }
    if let Some(bookmarks) = &cli.bookmarks {
        config.source.bookmarks_path = bookmarks.display().to_string();
    }
    validate(config).context("Invalid command-line override")?;
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be archived
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Nate-Archive Dry Run ===\n");

    println!("Archiver Configuration:");
    println!("  Pool size: {}", config.archiver.pool_size);
    println!("  Host rate limit: {}/s", config.archiver.host_rate_limit);
    println!(
        "  Lightweight attempts: {}",
        config.archiver.max_lightweight_attempts
    );
    println!(
        "  Backoff: {}ms initial, {}ms max",
        config.archiver.backoff_initial_ms, config.archiver.backoff_max_ms
    );

    println!("\nFetcher:");
    println!("  Request timeout: {}s", config.fetcher.request_timeout_secs);
    println!("  Referer: {}", config.fetcher.referer);
    println!(
        "  User agents: {}",
        config
            .fetcher
            .user_agents_path
            .as_deref()
            .unwrap_or("(built-in pool)")
    );

    println!("\nHeadless Browser:");
    println!("  Enabled: {}", config.browser.enabled && cfg!(feature = "chromium"));
    println!("  Max pages: {}", config.browser.max_pages);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let source = JsonBookmarkFile::new(&config.source.bookmarks_path);
    let bookmarks = source.list()?;

    println!(
        "\nBookmarks ({}) from {}:",
        bookmarks.len(),
        source.path().display()
    );
    let mut invalid = 0;
    for bookmark in &bookmarks {
        match parse_bookmark_url(&bookmark.url) {
            Ok(_) => println!("  - [{}] {}", bookmark.folder_path, bookmark.url),
            Err(e) => {
                invalid += 1;
                println!("  ! [{}] {} ({})", bookmark.folder_path, bookmark.url, e);
            }
        }
    }

    println!("\n✓ Configuration is valid");
    if invalid > 0 {
        println!(
            "✗ {} malformed bookmark URL(s) would abort the run",
            invalid
        );
    } else {
        println!("✓ Would archive up to {} bookmarks", bookmarks.len());
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use nate_archive::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Heavyweight tier of the run, and the browser to shut down afterwards
struct HeavyTier {
    fetcher: Arc<dyn PageFetcher>,
    #[cfg(feature = "chromium")]
    browser: Option<Arc<ChromiumFetcher>>,
}

impl HeavyTier {
    #[cfg(feature = "chromium")]
    async fn start(config: &BrowserConfig) -> anyhow::Result<Self> {
        if !config.enabled {
            tracing::info!("Headless browser disabled; fallbacks will fail");
            return Ok(Self {
                fetcher: Arc::new(DisabledFetcher),
                browser: None,
            });
        }

        let browser = Arc::new(
            ChromiumFetcher::launch(config)
                .await
                .context("Failed to launch headless browser")?,
        );
        Ok(Self {
            fetcher: browser.clone(),
            browser: Some(browser),
        })
    }

    #[cfg(not(feature = "chromium"))]
    async fn start(config: &BrowserConfig) -> anyhow::Result<Self> {
        if config.enabled {
            tracing::warn!("Built without the `chromium` feature; fallbacks will fail");
        }
        Ok(Self {
            fetcher: Arc::new(DisabledFetcher),
        })
    }

    #[cfg(feature = "chromium")]
    async fn shutdown(self) {
        if let Some(browser) = self.browser {
            browser.shutdown().await;
        }
    }

    #[cfg(not(feature = "chromium"))]
    async fn shutdown(self) {}
}

/// Handles the archive operation, bulk or single-bookmark
async fn handle_archive(config: Config, cli: &Cli) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling run");
            signal_token.cancel();
        }
    });

    let single = cli.url.as_ref().map(|url| {
        BookmarkDescriptor::new(
            url.clone(),
            cli.folder.clone().unwrap_or_default(),
            cli.title.clone().unwrap_or_default(),
        )
    });

    let source: Arc<dyn BookmarkSource> = match &single {
        Some(descriptor) => Arc::new(StaticSource::new(vec![descriptor.clone()])),
        None => Arc::new(JsonBookmarkFile::new(&config.source.bookmarks_path)),
    };

    let identity = match &config.fetcher.user_agents_path {
        Some(path) => RotatingIdentity::from_csv(Path::new(path))?,
        None => RotatingIdentity::builtin()?,
    };
    tracing::debug!("Rotating between {} user agents", identity.len());

    let store = open_store(Path::new(&config.output.database_path))?;
    let heavy = HeavyTier::start(&config.browser).await?;

    let collaborators = Collaborators {
        source,
        store: Arc::new(store),
        lightweight: Arc::new(HttpFetcher::new(&config.fetcher)?),
        heavyweight: heavy.fetcher.clone(),
        extractor: Box::new(ReadableExtractor::new()?),
        detector: Arc::new(WhatlangDetector),
        identity: Arc::new(identity),
    };
    let archiver = Archiver::new(config.archiver.clone(), collaborators, cancel);

    let result = match &single {
        Some(descriptor) => archiver
            .archive(descriptor, cli.force)
            .await
            .map(|outcome| tracing::info!("{}: {:?}", descriptor.url, outcome)),
        None => archiver.run_all(cli.force).await.and_then(|summary| {
            if summary.cancelled {
                Err(ArchiveError::Cancelled)
            } else {
                Ok(())
            }
        }),
    };

    heavy.shutdown().await;

    match result {
        Ok(()) => {
            tracing::info!("Archive completed successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Archive failed: {}", e);
            Err(e.into())
        }
    }
}
