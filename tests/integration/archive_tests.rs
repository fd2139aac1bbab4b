//! End-to-end tests of the archive pipeline against scripted fetchers
//!
//! These tests verify dedup, the tiered retry contract, language tagging,
//! per-host rate limiting and cancellation through the public API.

use crate::support::*;
use nate_archive::archive::ArchiveOutcome;
use nate_archive::config::ArchiverConfig;
use nate_archive::content::ArchivedDocument;
use nate_archive::extract::Extraction;
use nate_archive::fetch::Tier;
use nate_archive::source::JsonBookmarkFile;
use nate_archive::storage::DocumentStore;
use nate_archive::{ArchiveError, BookmarkDescriptor, Language};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

const URL: &str = "https://blog.example.com/post";

fn stored(harness: &Harness, url: &str) -> ArchivedDocument {
    let bytes = harness.store.get(url.as_bytes()).unwrap();
    ArchivedDocument::from_json(&bytes).unwrap()
}

fn stored_fields(harness: &Harness, url: &str) -> BTreeMap<String, String> {
    let bytes = harness.store.get(url.as_bytes()).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_already_stored_bookmark_is_not_fetched() {
    let harness = HarnessBuilder::new().build();
    harness.store.put(URL.as_bytes(), b"{}").unwrap();

    let outcome = harness.archiver.archive(&bookmark(URL), false).await.unwrap();

    assert_eq!(outcome, ArchiveOutcome::AlreadyStored);
    assert_eq!(harness.light.calls(), 0);
    assert_eq!(harness.heavy.calls(), 0);
    assert_eq!(harness.store.get(URL.as_bytes()).unwrap(), b"{}");
}

#[tokio::test]
async fn test_force_refetches_and_overwrites() {
    let harness = HarnessBuilder::new().build();
    harness.store.put(URL.as_bytes(), b"{}").unwrap();

    let outcome = harness.archiver.archive(&bookmark(URL), true).await.unwrap();

    assert!(matches!(outcome, ArchiveOutcome::Archived { .. }));
    assert_eq!(harness.light.calls(), 1);
    assert_eq!(stored(&harness, URL).title, "Scripted page");
    assert_eq!(harness.store.count().unwrap(), 1);
}

#[tokio::test]
async fn test_retryable_statuses_then_success_stay_lightweight() {
    let light = ScriptedFetcher::ok().script(
        URL,
        vec![
            Reply::Status(503, "busy"),
            Reply::Status(503, "busy"),
            Reply::Status(200, PAGE),
        ],
    );
    let harness = HarnessBuilder::new().light(light).build();

    let outcome = harness.archiver.archive(&bookmark(URL), false).await.unwrap();

    assert_eq!(
        outcome,
        ArchiveOutcome::Archived {
            lang: Language::English,
            tier: Tier::Lightweight,
            attempts: 3,
        }
    );
    assert_eq!(harness.light.calls(), 3);
    assert_eq!(harness.heavy.calls(), 0);
    assert!(stored(&harness, URL).html.contains("Archived body text."));
}

#[tokio::test]
async fn test_exhausted_retries_fall_back_to_browser_once() {
    let light = ScriptedFetcher::new(Reply::Status(403, "forbidden"));
    let harness = HarnessBuilder::new().light(light).build();

    let outcome = harness.archiver.archive(&bookmark(URL), false).await.unwrap();

    assert_eq!(
        outcome,
        ArchiveOutcome::Archived {
            lang: Language::English,
            tier: Tier::Heavyweight,
            attempts: 4,
        }
    );
    assert_eq!(harness.light.calls(), 3);
    assert_eq!(harness.heavy.calls(), 1);
}

#[tokio::test]
async fn test_non_retryable_status_falls_back_immediately() {
    let light = ScriptedFetcher::new(Reply::Status(404, "missing"));
    let harness = HarnessBuilder::new().light(light).build();

    harness.archiver.archive(&bookmark(URL), false).await.unwrap();

    assert_eq!(harness.light.calls(), 1);
    assert_eq!(harness.heavy.calls(), 1);
}

#[tokio::test]
async fn test_failed_browser_fallback_is_not_stored() {
    let light = ScriptedFetcher::new(Reply::Status(404, "missing"));
    let heavy = ScriptedFetcher::new(Reply::Status(500, "error"));
    let harness = HarnessBuilder::new().light(light).heavy(heavy).build();

    let err = harness
        .archiver
        .archive(&bookmark(URL), false)
        .await
        .unwrap_err();

    assert!(matches!(err, ArchiveError::Fetch { attempts: 2, .. }));
    assert!(!harness.store.exists(URL.as_bytes()).unwrap());
}

#[tokio::test]
async fn test_empty_body_fails() {
    let light = ScriptedFetcher::new(Reply::Status(200, ""));
    let harness = HarnessBuilder::new().light(light).build();

    let err = harness
        .archiver
        .archive(&bookmark(URL), false)
        .await
        .unwrap_err();

    assert!(matches!(err, ArchiveError::EmptyBody { attempts: 1, .. }));
    assert_eq!(harness.heavy.calls(), 0);
    assert!(!harness.store.exists(URL.as_bytes()).unwrap());
}

#[tokio::test]
async fn test_transport_error_is_reported_without_fallback() {
    let light = ScriptedFetcher::new(Reply::TimedOut);
    let harness = HarnessBuilder::new().light(light).build();

    let err = harness
        .archiver
        .archive(&bookmark(URL), false)
        .await
        .unwrap_err();

    assert!(matches!(err, ArchiveError::Fetch { attempts: 1, .. }));
    assert_eq!(harness.heavy.calls(), 0);
}

#[tokio::test]
async fn test_last_non_empty_field_decides_language() {
    let untitled = BookmarkDescriptor::new(URL, "Tests", "");
    let french = Extraction {
        text: Some(String::new()),
        excerpt: Some("Bonjour le monde".to_string()),
        title: Some(String::new()),
        ..Extraction::default()
    };
    let detector = || {
        TableDetector::default()
            .with("Bonjour le monde", "fr", 0.99)
            .with("Hello world", "en", 0.99)
    };

    let harness = HarnessBuilder::new()
        .extractor(FixedExtractor(french.clone()))
        .detector(detector())
        .build();
    harness.archiver.archive(&untitled, false).await.unwrap();

    let fields = stored_fields(&harness, URL);
    assert_eq!(fields["lang"], "fr");
    assert_eq!(fields["fr_excerpt"], "Bonjour le monde");

    let titled = Extraction {
        title: Some("Hello world".to_string()),
        ..french
    };
    let harness = HarnessBuilder::new()
        .extractor(FixedExtractor(titled))
        .detector(detector())
        .build();
    harness.archiver.archive(&untitled, false).await.unwrap();

    let document = stored(&harness, URL);
    assert_eq!(document.lang, Language::English);
    assert_eq!(document.excerpt, "Bonjour le monde");
}

#[tokio::test]
async fn test_missing_title_uses_bookmark_title() {
    let extraction = Extraction {
        excerpt: Some("Bonjour le monde".to_string()),
        ..Extraction::default()
    };
    let detector = TableDetector::default()
        .with("Bonjour le monde", "fr", 0.99)
        .with("Bookmark title", "en", 0.90);
    let harness = HarnessBuilder::new()
        .extractor(FixedExtractor(extraction))
        .detector(detector)
        .build();

    harness.archiver.archive(&bookmark(URL), false).await.unwrap();

    // The bookmark title is the last non-empty field but not confident enough.
    let document = stored(&harness, URL);
    assert_eq!(document.title, "Bookmark title");
    assert_eq!(document.lang, Language::English);
}

#[tokio::test]
async fn test_stored_record_has_stable_field_names() {
    let extraction = Extraction {
        title: Some("Title".to_string()),
        text: Some("Body".to_string()),
        excerpt: Some("Summary".to_string()),
        author: Some("Jane Doe".to_string()),
        site_name: Some("Example".to_string()),
        html: None,
    };
    let harness = HarnessBuilder::new()
        .extractor(FixedExtractor(extraction))
        .build();

    harness.archiver.archive(&bookmark(URL), false).await.unwrap();

    let fields = stored_fields(&harness, URL);
    let names: Vec<&str> = fields.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "author",
            "en_excerpt",
            "en_html",
            "en_text",
            "en_title",
            "folder",
            "lang",
            "siteName",
            "url",
        ]
    );
    assert_eq!(fields["en_html"], "");
    assert_eq!(fields["folder"], "Tests");
    assert_eq!(fields["url"], URL);
    assert_eq!(fields["author"], "Jane Doe");
}

#[tokio::test]
async fn test_bulk_run_continues_past_failures() {
    let light = ScriptedFetcher::ok()
        .script("https://a.example/broken", vec![Reply::TimedOut])
        .script("https://b.example/empty", vec![Reply::Status(200, "")]);
    let harness = HarnessBuilder::new()
        .light(light)
        .bookmarks(vec![
            bookmark("https://a.example/ok"),
            bookmark("https://a.example/broken"),
            bookmark("https://b.example/empty"),
            bookmark("https://c.example/stored"),
            bookmark("https://c.example/ok"),
        ])
        .build();
    harness
        .store
        .put(b"https://c.example/stored", b"{}")
        .unwrap();

    let summary = harness.archiver.run_all(false).await.unwrap();

    assert_eq!(summary.total, 5);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.archived, 2);
    assert_eq!(summary.failed, 2);
    assert!(!summary.cancelled);
    assert_eq!(summary.completed(), summary.total);
    assert_eq!(harness.light.calls_for("https://c.example/stored"), 0);
    assert!(harness.store.exists(b"https://a.example/ok").unwrap());
    assert!(harness.store.exists(b"https://c.example/ok").unwrap());
    assert_eq!(harness.store.count().unwrap(), 3);
}

#[tokio::test]
async fn test_forced_run_refetches_stored_bookmarks() {
    let harness = HarnessBuilder::new()
        .bookmarks(vec![
            bookmark("https://a.example/one"),
            bookmark("https://b.example/two"),
        ])
        .build();
    harness.store.put(b"https://a.example/one", b"{}").unwrap();
    harness.store.put(b"https://b.example/two", b"{}").unwrap();

    let summary = harness.archiver.run_all(true).await.unwrap();

    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.archived, 2);
    assert_eq!(harness.light.calls(), 2);
    assert_eq!(stored(&harness, "https://a.example/one").title, "Scripted page");
    assert_eq!(stored(&harness, "https://b.example/two").title, "Scripted page");
    assert_eq!(harness.store.count().unwrap(), 2);
}

async fn run_with_duplicate_url(force: bool) -> (Harness, nate_archive::RunSummary) {
    let url = "https://dup.example/page";
    let harness = HarnessBuilder::new()
        .light(ScriptedFetcher::new(Reply::Slow(Duration::from_millis(100))))
        .bookmarks(vec![
            BookmarkDescriptor::new(url, "A", "First copy"),
            BookmarkDescriptor::new(url, "B", "Second copy"),
        ])
        .build();

    let summary = harness.archiver.run_all(force).await.unwrap();
    (harness, summary)
}

#[tokio::test]
async fn test_duplicate_url_in_one_run_is_fetched_once() {
    let (harness, summary) = run_with_duplicate_url(false).await;

    assert_eq!(harness.light.calls(), 1);
    assert_eq!(summary.archived, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.completed(), summary.total);
    assert_eq!(stored(&harness, "https://dup.example/page").folder, "A");
}

#[tokio::test]
async fn test_duplicate_url_is_fetched_once_when_forced() {
    let (harness, summary) = run_with_duplicate_url(true).await;

    assert_eq!(harness.light.calls(), 1);
    assert_eq!(summary.archived, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(stored(&harness, "https://dup.example/page").folder, "A");
}

#[tokio::test]
async fn test_malformed_url_aborts_run() {
    let harness = HarnessBuilder::new()
        .bookmarks(vec![
            bookmark("https://a.example/first"),
            bookmark("not a url"),
            bookmark("https://a.example/never"),
        ])
        .build();

    let err = harness.archiver.run_all(false).await.unwrap_err();

    assert!(matches!(err, ArchiveError::InvalidBookmarkUrl { ref url, .. } if url == "not a url"));
    assert_eq!(harness.light.calls_for("https://a.example/never"), 0);
}

#[tokio::test]
async fn test_same_host_requests_are_spaced() {
    let config = ArchiverConfig {
        host_rate_limit: 5,
        ..fast_config()
    };
    let harness = HarnessBuilder::new()
        .config(config)
        .bookmarks(vec![
            bookmark("https://slow.example/1"),
            bookmark("https://slow.example/2"),
            bookmark("https://slow.example/3"),
            bookmark("https://other.example/1"),
        ])
        .build();

    let summary = harness.archiver.run_all(false).await.unwrap();
    assert_eq!(summary.archived, 4);

    let calls = harness.light.timestamps();
    let first = *calls.iter().min().unwrap();
    let last = *calls.iter().max().unwrap();
    // Three same-host requests at 5 req/s need two 200ms intervals.
    assert!(last.duration_since(first) >= Duration::from_millis(380));
    assert_eq!(harness.light.calls_for("https://other.example/1"), 1);
}

#[tokio::test]
async fn test_cancellation_interrupts_backoff() {
    let config = ArchiverConfig {
        max_lightweight_attempts: 10,
        backoff_initial_ms: 10_000,
        backoff_max_ms: 60_000,
        ..fast_config()
    };
    let light = ScriptedFetcher::new(Reply::Status(503, "busy"));
    let harness = HarnessBuilder::new().config(config).light(light).build();

    let cancel = harness.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let err = harness
        .archiver
        .archive(&bookmark(URL), false)
        .await
        .unwrap_err();

    assert!(matches!(err, ArchiveError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(harness.light.calls(), 1);
    assert_eq!(harness.heavy.calls(), 0);
}

#[tokio::test]
async fn test_cancellation_stops_bulk_run() {
    let config = ArchiverConfig {
        pool_size: 2,
        host_rate_limit: 1,
        ..fast_config()
    };
    let bookmarks = (0..20)
        .map(|i| bookmark(&format!("https://one.example/{}", i)))
        .collect();
    let harness = HarnessBuilder::new()
        .config(config)
        .bookmarks(bookmarks)
        .build();

    let cancel = harness.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let summary = harness.archiver.run_all(false).await.unwrap();

    assert!(summary.cancelled);
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(summary.completed() < summary.total);
    assert!(harness.light.calls() < 20);

    let calls_at_return = harness.light.calls();
    tokio::time::sleep(Duration::from_millis(1_200)).await;
    assert_eq!(harness.light.calls(), calls_at_return);
}

#[tokio::test]
async fn test_schedule_timeout_counts_as_failure() {
    let config = ArchiverConfig {
        pool_size: 1,
        schedule_timeout_ms: 20,
        ..fast_config()
    };
    let light = ScriptedFetcher::new(Reply::Slow(Duration::from_millis(400)));
    let harness = HarnessBuilder::new()
        .config(config)
        .light(light)
        .bookmarks(vec![
            bookmark("https://a.example/"),
            bookmark("https://b.example/"),
            bookmark("https://c.example/"),
        ])
        .build();

    let summary = harness.archiver.run_all(false).await.unwrap();

    assert_eq!(summary.archived, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(harness.light.calls(), 1);
}

#[tokio::test]
async fn test_run_from_json_export() {
    let export = r#"{"folders": [
        {"type": "folder", "title": "Reading", "items": [
            {"type": "folder", "title": "Rust", "items": [
                {"type": "link", "title": "Post", "href": "https://blog.example.com/post"}
            ]}
        ]}
    ]}"#;
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(export.as_bytes()).unwrap();

    let harness =
        HarnessBuilder::new().build_with_source(Some(Arc::new(JsonBookmarkFile::new(file.path()))));

    let summary = harness.archiver.run_all(false).await.unwrap();

    assert_eq!(summary.archived, 1);
    assert_eq!(stored(&harness, URL).folder, "Reading::Rust");

    // A second run finds everything stored.
    let summary = harness.archiver.run_all(false).await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(harness.light.calls(), 1);
}
