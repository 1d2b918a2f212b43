//! Integration tests for the crawler
//!
//! These tests use wiremock to serve small documentation sites and run
//! the full crawl cycle end-to-end against them.

use docsweep::cache::cache_key;
use docsweep::config::{BasicAuth, CrawlConfig};
use docsweep::crawler::{CrawlOutcome, Crawler};
use docsweep::output::write_outputs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fast settings for a local mock server
fn test_config(cache_dir: &Path) -> CrawlConfig {
    CrawlConfig {
        workers: 2,
        cache_dir: cache_dir.to_path_buf(),
        min_content_length: 20,
        rate_limit_interval_ms: 10,
        retry_base_delay_ms: 10,
        max_backoff_ms: 50,
        request_timeout_secs: 5,
        stall_timeout_secs: 10,
        ..CrawlConfig::default()
    }
}

/// A server-rendered documentation page linking to `links`
fn doc_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<a href="{}">{}</a>"#, link, link))
        .collect();
    format!(
        r#"<html><head><title>{title} - Docs</title></head><body>
        <nav>{anchors}</nav>
        <main><h1>{title}</h1>
        <p>This page explains {title} in enough words to pass the size filter.</p>
        <h2>Details</h2><p>More text about {title}.</p></main>
        </body></html>"#
    )
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into().into_bytes(), "text/html; charset=utf-8")
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, route: &str, body: String, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(expected_hits)
        .mount(server)
        .await;
}

/// Five pages, one of them disallowed by robots.txt
async fn mount_small_site(server: &MockServer) {
    mount_robots(server, "User-agent: *\nDisallow: /private/\n").await;
    mount_page(
        server,
        "/",
        doc_page("Home", &["/guide/", "/api/", "/faq/", "/private/"]),
        1,
    )
    .await;
    mount_page(server, "/guide/", doc_page("Guide", &["/", "/api/"]), 1).await;
    mount_page(server, "/api/", doc_page("API", &["/guide/", "/faq/"]), 1).await;
    mount_page(server, "/faq/", doc_page("FAQ", &["/"]), 1).await;
    mount_page(server, "/private/", doc_page("Private", &[]), 0).await;
}

#[tokio::test]
async fn test_scenario_small_site_with_robots_denial() {
    let server = MockServer::start().await;
    mount_small_site(&server).await;
    let cache = TempDir::new().unwrap();

    let base = format!("{}/", server.uri());
    let report = Crawler::new(&base, test_config(cache.path()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(report.outcome.is_completed());
    assert_eq!(report.stats.fetched, 4);
    assert_eq!(report.stats.blocked_by_robots, 1);
    assert_eq!(report.stats.failed, 0);
    assert_eq!(report.stats.pages_included, 4);

    // Disallowed pages are never cached
    let private = Url::parse(&format!("{}/private/", server.uri())).unwrap();
    let cached = cache.path().join(format!("{}.html", cache_key(&private)));
    assert!(!cached.exists());

    // Discovery order: home first, then its links in document order
    let titles: Vec<_> = report
        .document
        .sections
        .iter()
        .map(|s| s.title.clone().unwrap_or_default())
        .collect();
    assert_eq!(titles, vec!["Home", "Guide", "API", "FAQ"]);

    assert!(report.markdown.contains("## Table of Contents"));
    assert!(report.markdown.contains("- [Guide](#guide)"));
    assert!(report.markdown.contains("    - [Details](#details-1)"));
}

#[tokio::test]
async fn test_scenario_spa_shell_aborts_crawl() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_page(
        &server,
        "/",
        r#"<html><head><title>App</title></head><body><div id="root"></div><a href="/next/">Next</a></body></html>"#
            .to_string(),
        1,
    )
    .await;
    mount_page(&server, "/next/", doc_page("Next", &[]), 0).await;
    let cache = TempDir::new().unwrap();

    let report = Crawler::new(&format!("{}/", server.uri()), test_config(cache.path()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(matches!(report.outcome, CrawlOutcome::SpaAborted(_)));
    assert_eq!(report.outcome.exit_code(), 2);
    assert!(report.stats.spa_detected);
    assert_eq!(report.stats.fetched, 1);
    assert_eq!(report.stats.pages_included, 0);
}

#[tokio::test]
async fn test_scenario_stall_preserves_completed_pages() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_page(&server, "/", doc_page("Home", &["/slow/"]), 1).await;
    Mock::given(method("GET"))
        .and(path("/slow/"))
        .respond_with(html(doc_page("Slow", &[])).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    let cache = TempDir::new().unwrap();

    let config = CrawlConfig {
        stall_timeout_secs: 1,
        ..test_config(cache.path())
    };
    let report = Crawler::new(&format!("{}/", server.uri()), config)
        .unwrap()
        .run()
        .await
        .unwrap();

    let CrawlOutcome::Stalled { in_flight, .. } = &report.outcome else {
        panic!("expected a stall, got {}", report.outcome);
    };
    assert_eq!(in_flight.len(), 1);
    assert!(in_flight[0].ends_with("/slow/"));
    assert_eq!(report.outcome.exit_code(), 3);
    assert_eq!(report.document.sections[0].title.as_deref(), Some("Home"));

    // Partial output is flushed like a completed run
    let out = TempDir::new().unwrap();
    let md_path = out.path().join("docs.md");
    let meta_path = write_outputs(&report.markdown, &report.metadata(), &md_path)
        .await
        .unwrap();
    assert!(std::fs::read_to_string(&md_path).unwrap().contains("# Home"));
    assert!(std::fs::read_to_string(meta_path)
        .unwrap()
        .contains("\"outcome\": \"stalled\""));
}

#[tokio::test]
async fn test_scenario_rerun_is_served_from_cache() {
    let server = MockServer::start().await;
    // Each page expects exactly one request across both runs
    mount_small_site(&server).await;
    let cache = TempDir::new().unwrap();
    let base = format!("{}/", server.uri());

    let first = Crawler::new(&base, test_config(cache.path()))
        .unwrap()
        .run()
        .await
        .unwrap();
    let second = Crawler::new(&base, test_config(cache.path()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(first.stats.fetched, 4);
    assert_eq!(second.stats.fetched, 0);
    assert_eq!(second.stats.cache_hits, first.stats.fetched);
    assert_eq!(second.stats.blocked_by_robots, 1);

    let bodies = |report: &docsweep::CrawlReport| {
        report
            .document
            .sections
            .iter()
            .map(|s| s.body.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(bodies(&first), bodies(&second));
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_page(&server, "/", doc_page("Home", &["/broken/"]), 1).await;
    Mock::given(method("GET"))
        .and(path("/broken/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    let cache = TempDir::new().unwrap();

    let config = CrawlConfig {
        retry_limit: 2,
        ..test_config(cache.path())
    };
    let report = Crawler::new(&format!("{}/", server.uri()), config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(report.outcome.is_completed());
    assert_eq!(report.stats.fetched, 1);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.retries, 2);
}

#[tokio::test]
async fn test_transient_failure_recovers() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/", doc_page("Home", &[]), 1).await;
    let cache = TempDir::new().unwrap();

    let report = Crawler::new(&format!("{}/", server.uri()), test_config(cache.path()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.stats.fetched, 1);
    assert_eq!(report.stats.failed, 0);
    assert_eq!(report.stats.retries, 1);
    assert_eq!(report.stats.pages_included, 1);
}

#[tokio::test]
async fn test_url_variants_are_fetched_once() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_page(
        &server,
        "/",
        doc_page(
            "Home",
            &[
                "/guide",
                "/guide/",
                "/guide#install",
                "/guide/?utm_source=newsletter",
                "/docs/../guide",
                "https://example.org/elsewhere",
            ],
        ),
        1,
    )
    .await;
    mount_page(&server, "/guide/", doc_page("Guide", &["/", "/guide"]), 1).await;
    let cache = TempDir::new().unwrap();

    let report = Crawler::new(&format!("{}/", server.uri()), test_config(cache.path()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.stats.fetched, 2);
    assert_eq!(report.stats.links_external, 1);
    assert!(report.stats.links_duplicate >= 4);
}

#[tokio::test]
async fn test_page_budget_is_respected() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    let links: Vec<String> = (0..10).map(|i| format!("/p{}/", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    mount_page(&server, "/", doc_page("Home", &link_refs), 1).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/p\d+/$"))
        .respond_with(html(doc_page("Child", &[])))
        .expect(2)
        .mount(&server)
        .await;
    let cache = TempDir::new().unwrap();

    let config = CrawlConfig {
        max_pages: 3,
        ..test_config(cache.path())
    };
    let report = Crawler::new(&format!("{}/", server.uri()), config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(report.outcome.is_completed());
    assert_eq!(report.stats.fetched, 3);
    assert_eq!(report.stats.links_over_budget, 8);
}

#[tokio::test]
async fn test_interrupt_stops_the_run() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_page(&server, "/", doc_page("Home", &["/slow/", "/later/"]), 1).await;
    Mock::given(method("GET"))
        .and(path("/slow/"))
        .respond_with(html(doc_page("Slow", &[])).set_delay(Duration::from_secs(1)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/later/"))
        .respond_with(html(doc_page("Later", &[])).set_delay(Duration::from_secs(1)))
        .mount(&server)
        .await;
    let cache = TempDir::new().unwrap();

    let crawler = Crawler::new(&format!("{}/", server.uri()), test_config(cache.path())).unwrap();
    let shutdown = crawler.shutdown_handle();
    let run = tokio::spawn(crawler.run());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(shutdown.interrupt());

    let report = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("run did not stop after interrupt")
        .unwrap()
        .unwrap();

    assert!(matches!(report.outcome, CrawlOutcome::Interrupted));
    assert_eq!(report.outcome.exit_code(), 130);
    assert!(report.stats.pages_included >= 1);
}

#[tokio::test]
async fn test_auth_and_custom_headers_are_sent() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("authorization", "Basic YWxpY2U6c2VjcmV0"))
        .and(header("x-docs-token", "abc123"))
        .respond_with(html(doc_page("Private docs", &[])))
        .expect(1)
        .mount(&server)
        .await;
    let cache = TempDir::new().unwrap();

    let mut config = test_config(cache.path());
    config.auth = Some(BasicAuth {
        username: "alice".to_string(),
        password: "secret".to_string(),
    });
    config
        .headers
        .insert("X-Docs-Token".to_string(), "abc123".to_string());

    let report = Crawler::new(&format!("{}/", server.uri()), config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.stats.fetched, 1);
    assert_eq!(report.stats.failed, 0);

    let metadata = serde_json::to_string(&report.metadata()).unwrap();
    assert!(!metadata.contains("secret"));
    assert!(!metadata.contains("abc123"));
}

#[tokio::test]
async fn test_directory_pages_are_requested_with_trailing_slash() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_page(
        &server,
        "/",
        doc_page("Home", &["/guide", "/reference/index.html"]),
        1,
    )
    .await;
    // Served only in directory form; the bare path would 404
    mount_page(&server, "/guide/", doc_page("Guide", &[]), 1).await;
    mount_page(&server, "/reference/index.html", doc_page("Reference", &[]), 1).await;
    let cache = TempDir::new().unwrap();

    let report = Crawler::new(&format!("{}/", server.uri()), test_config(cache.path()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(report.outcome.is_completed());
    assert_eq!(report.stats.fetched, 3);
    assert_eq!(report.stats.failed, 0);
}

#[tokio::test]
async fn test_crawl_delay_as_long_as_stall_timeout_completes() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nCrawl-delay: 2\n").await;
    mount_page(&server, "/", doc_page("Home", &["/guide/"]), 1).await;
    mount_page(&server, "/guide/", doc_page("Guide", &[]), 1).await;
    let cache = TempDir::new().unwrap();

    let config = CrawlConfig {
        stall_timeout_secs: 2,
        ..test_config(cache.path())
    };
    let report = Crawler::new(&format!("{}/", server.uri()), config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(
        report.outcome.is_completed(),
        "expected completion, got {}",
        report.outcome
    );
    assert_eq!(report.stats.fetched, 2);
    assert_eq!(report.stats.pages_included, 2);
}

#[tokio::test]
async fn test_queued_pages_count_as_abandoned_on_abort() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    let links: Vec<String> = (0..4).map(|i| format!("/p{}/", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    mount_page(&server, "/", doc_page("Home", &link_refs), 1).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/p\d+/$"))
        .respond_with(html(doc_page("Child", &[])).set_delay(Duration::from_secs(1)))
        .mount(&server)
        .await;
    let cache = TempDir::new().unwrap();

    let config = CrawlConfig {
        workers: 1,
        ..test_config(cache.path())
    };
    let crawler = Crawler::new(&format!("{}/", server.uri()), config).unwrap();
    let shutdown = crawler.shutdown_handle();
    let run = tokio::spawn(crawler.run());

    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown.interrupt();
    let report = run.await.unwrap().unwrap();

    // Root plus the one child in flight; the other three never left the queue
    assert_eq!(report.stats.fetched, 2);
    assert_eq!(report.stats.abandoned, 3);
    let disposed = report.stats.fetched
        + report.stats.cache_hits
        + report.stats.failed
        + report.stats.blocked_by_robots
        + report.stats.junk_filtered
        + report.stats.abandoned;
    assert_eq!(disposed, 5);
}
