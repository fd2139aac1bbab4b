//! Archive runs against a local HTTP server
//!
//! The lightweight tier is the real `HttpFetcher`; the browser tier stays
//! scripted.

use crate::support::*;
use nate_archive::archive::ArchiveOutcome;
use nate_archive::config::FetcherConfig;
use nate_archive::content::{ArchivedDocument, WhatlangDetector};
use nate_archive::fetch::{HttpFetcher, Tier};
use nate_archive::storage::DocumentStore;
use nate_archive::{BookmarkDescriptor, Language};
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTICLE: &str = r#"<html><head>
<title>Fallback</title>
<meta property="og:title" content="Understanding ownership in systems programming">
<meta name="description" content="A long look at how ownership and borrowing keep memory safe without a garbage collector.">
<meta name="author" content="Jane Doe">
<meta property="og:site_name" content="Example Blog">
</head><body>
<nav>Home | About</nav>
<article>
<h1>Understanding ownership</h1>
<p>Ownership is a set of rules that govern how a program manages memory.</p>
<p>Every value has a single owner, and the value is dropped when the owner goes out of scope.</p>
</article>
</body></html>"#;

fn create_test_config() -> FetcherConfig {
    FetcherConfig {
        request_timeout_secs: 5,
        connect_timeout_secs: 2,
        ..FetcherConfig::default()
    }
}

fn http_harness(bookmarks: Vec<BookmarkDescriptor>) -> Harness {
    let fetcher = Arc::new(HttpFetcher::new(&create_test_config()).unwrap());
    HarnessBuilder::new()
        .bookmarks(bookmarks)
        .network(fetcher)
        .detector(WhatlangDetector)
        .build()
}

#[tokio::test]
async fn test_full_archive_single_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ownership"))
        .and(header("user-agent", "Agent/Test"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/ownership", server.uri());
    let harness = http_harness(vec![BookmarkDescriptor::new(&url, "Reading", "Ownership")]);

    let summary = harness.archiver.run_all(false).await.unwrap();
    assert_eq!(summary.archived, 1);
    assert_eq!(summary.failed, 0);

    let document =
        ArchivedDocument::from_json(&harness.store.get(url.as_bytes()).unwrap()).unwrap();
    assert_eq!(document.lang, Language::English);
    assert_eq!(
        document.title,
        "Understanding ownership in systems programming"
    );
    assert_eq!(document.author, "Jane Doe");
    assert_eq!(document.site_name, "Example Blog");
    assert_eq!(document.folder, "Reading");
    assert!(document.text.contains("single owner"));
    assert!(!document.text.contains("Home | About"));
    assert!(document.html.contains("<p>Ownership is a set of rules"));
    assert_eq!(harness.heavy.calls(), 0);
}

#[tokio::test]
async fn test_server_busy_then_available() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE))
        .mount(&server)
        .await;

    let url = format!("{}/busy", server.uri());
    let harness = http_harness(Vec::new());

    let outcome = harness
        .archiver
        .archive(&BookmarkDescriptor::new(&url, "", ""), false)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ArchiveOutcome::Archived {
            lang: Language::English,
            tier: Tier::Lightweight,
            attempts: 3,
        }
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(harness.heavy.calls(), 0);
}

#[tokio::test]
async fn test_missing_page_uses_browser_tier() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/spa"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/spa", server.uri());
    let harness = http_harness(vec![BookmarkDescriptor::new(&url, "Apps", "Single page app")]);

    let summary = harness.archiver.run_all(false).await.unwrap();

    assert_eq!(summary.archived, 1);
    assert_eq!(harness.heavy.calls_for(&url), 1);

    let document =
        ArchivedDocument::from_json(&harness.store.get(url.as_bytes()).unwrap()).unwrap();
    assert_eq!(document.title, "Scripted page");
}

#[tokio::test]
async fn test_unreachable_host_fails_bookmark_only() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE))
        .mount(&server)
        .await;

    let ok = format!("{}/ok", server.uri());
    // Port 9 (discard) is closed on test machines.
    let unreachable = "http://127.0.0.1:9/page".to_string();
    let harness = http_harness(vec![
        BookmarkDescriptor::new(&unreachable, "", ""),
        BookmarkDescriptor::new(&ok, "", ""),
    ]);

    let summary = harness.archiver.run_all(false).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.archived, 1);
    assert!(!harness.store.exists(unreachable.as_bytes()).unwrap());
    assert!(harness.store.exists(ok.as_bytes()).unwrap());
}
