//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tidemark::config::{
    Config, CrawlerConfig, OutputConfig, PolitenessDelay, ScopeConfig, UserAgentConfig,
};
use tidemark::crawler::{
    Coordinator, FetchError, FetchResponse, PageFetcher, RobotsFetcher,
};
use tidemark::output::{
    emit_all, read_snapshot, CsvRecordWriter, ReportHeader, ReportWriter,
};
use tidemark::robots::ParsedRobots;
use tidemark::url::UrlScope;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling the mock server from `/`
fn create_test_config(base_url: &str, max_pages: usize, max_depth: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_pages,
            max_depth,
            worker_count: 4,
            politeness_delay_ms: PolitenessDelay::Fixed(0),
            include_binary_content: true,
            request_timeout_secs: 5,
            crawl_timeout_secs: None,
            honor_crawl_delay: false,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        scope: ScopeConfig {
            seeds: vec![format!("{}/", base_url)],
            allowed_domains: vec!["127.0.0.1".to_string()],
            excluded_extensions: vec![".css".to_string(), ".js".to_string()],
        },
        output: OutputConfig {
            directory: "./out".to_string(),
            site_label: "test".to_string(),
        },
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

fn links(base_url: &str, paths: &[&str]) -> String {
    paths
        .iter()
        .map(|p| format!(r#"<a href="{}{}">{}</a>"#, base_url, p, p))
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_depth_zero_records_discovered_links_without_fetching_them() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        format!(
            r#"<html><body>{}<a href="https://elsewhere.test/x">x</a></body></html>"#,
            links(&base_url, &["/a", "/b"])
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html("never".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 100, 0);
    let snapshot = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(snapshot.fetches.len(), 1);
    assert_eq!(snapshot.fetch_status(&format!("{}/", base_url)), Some(200));

    let visit = snapshot
        .visit(&format!("{}/", base_url))
        .expect("seed should have a visit record");
    assert_eq!(visit.outlinks, 3);
    assert_eq!(visit.content_type, "text/html");

    assert_eq!(snapshot.urls.len(), 3);
    assert_eq!(
        snapshot.url_scope(&format!("{}/a", base_url)),
        Some(UrlScope::InScope)
    );
    assert_eq!(
        snapshot.url_scope(&format!("{}/b", base_url)),
        Some(UrlScope::InScope)
    );
    assert_eq!(
        snapshot.url_scope("https://elsewhere.test/x"),
        Some(UrlScope::OutOfScope)
    );
}

#[tokio::test]
async fn test_robots_disallowed_urls_are_never_requested() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_robots(&mock_server, "User-agent: *\nDisallow: /private").await;
    mount_page(
        &mock_server,
        "/",
        links(&base_url, &["/private/page", "/public"]),
    )
    .await;
    mount_page(&mock_server, "/public", "<p>public</p>".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(html("secret".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 100, 2);
    let snapshot = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert!(snapshot
        .fetch_status(&format!("{}/private/page", base_url))
        .is_none());
    assert_eq!(
        snapshot.fetch_status(&format!("{}/public", base_url)),
        Some(200)
    );
    assert_eq!(
        snapshot.url_scope(&format!("{}/private/page", base_url)),
        Some(UrlScope::InScope)
    );
}

#[tokio::test]
async fn test_robots_fetched_once_per_host() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/", links(&base_url, &["/1", "/2", "/3"])).await;
    for p in ["/1", "/2", "/3"] {
        mount_page(&mock_server, p, "<p>leaf</p>".to_string()).await;
    }

    let config = create_test_config(&base_url, 100, 1);
    let snapshot = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(snapshot.fetches.len(), 4);
}

#[tokio::test]
async fn test_page_budget_caps_fetches() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let children: Vec<String> = (0..10).map(|i| format!("/p{}", i)).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
    mount_page(&mock_server, "/", links(&base_url, &child_refs)).await;
    Mock::given(method("GET"))
        .respond_with(html("<p>leaf</p>".to_string()))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 5, 3);
    let snapshot = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(snapshot.fetches.len(), 5);
    // every discovered link is still recorded
    assert_eq!(snapshot.urls.len(), 10);
}

#[tokio::test]
async fn test_excluded_extension_recorded_but_not_fetched() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        links(&base_url, &["/style.css", "/next"]),
    )
    .await;
    mount_page(&mock_server, "/next", "<p>next</p>".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/style.css"))
        .respond_with(ResponseTemplate::new(200).set_body_string("body{}"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 100, 2);
    let snapshot = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    let css = format!("{}/style.css", base_url);
    assert_eq!(snapshot.url_scope(&css), Some(UrlScope::InScope));
    assert!(snapshot.fetch_status(&css).is_none());
    assert_eq!(
        snapshot.fetch_status(&format!("{}/next", base_url)),
        Some(200)
    );
}

#[tokio::test]
async fn test_depth_limit_stops_descent() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", links(&base_url, &["/d1"])).await;
    mount_page(&mock_server, "/d1", links(&base_url, &["/d2"])).await;
    mount_page(&mock_server, "/d2", links(&base_url, &["/d3"])).await;
    Mock::given(method("GET"))
        .and(path("/d3"))
        .respond_with(html("too deep".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 100, 2);
    let snapshot = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(snapshot.fetches.len(), 3);
    assert_eq!(
        snapshot.url_scope(&format!("{}/d3", base_url)),
        Some(UrlScope::InScope)
    );
}

#[tokio::test]
async fn test_each_url_fetched_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        format!(
            "{}{}",
            links(&base_url, &["/shared", "/other"]),
            r##"<a href="/shared#frag">again</a>"##
        ),
    )
    .await;
    mount_page(&mock_server, "/other", links(&base_url, &["/shared", "/"])).await;
    Mock::given(method("GET"))
        .and(path("/shared"))
        .respond_with(html("<p>shared</p>".to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 100, 3);
    let snapshot = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(snapshot.fetches.len(), 3);
}

#[tokio::test]
async fn test_error_statuses_recorded_verbatim() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", links(&base_url, &["/missing", "/broken"])).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 100, 2);
    let snapshot = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(
        snapshot.fetch_status(&format!("{}/missing", base_url)),
        Some(404)
    );
    assert_eq!(
        snapshot.fetch_status(&format!("{}/broken", base_url)),
        Some(500)
    );
    assert!(snapshot.visit(&format!("{}/missing", base_url)).is_none());
    assert_eq!(snapshot.visits.len(), 1);
}

#[tokio::test]
async fn test_unreachable_seed_records_sentinel() {
    // nothing listens on the discard port
    let mut config = create_test_config("http://127.0.0.1:9", 10, 1);
    config.crawler.request_timeout_secs = 2;

    let snapshot = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(snapshot.fetch_status("http://127.0.0.1:9/"), Some(0));
    assert!(snapshot.visits.is_empty());
}

#[tokio::test]
async fn test_redirect_recorded_and_target_followed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/moved"))
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/moved", "<p>moved</p>".to_string()).await;

    let config = create_test_config(&base_url, 100, 0);
    let snapshot = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(snapshot.fetch_status(&format!("{}/", base_url)), Some(301));
    assert_eq!(
        snapshot.fetch_status(&format!("{}/moved", base_url)),
        Some(200)
    );
    assert!(snapshot.visit(&format!("{}/", base_url)).is_none());
}

#[tokio::test]
async fn test_binary_content_excluded_from_visits_when_disabled() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", links(&base_url, &["/photo.png"])).await;
    Mock::given(method("GET"))
        .and(path("/photo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47])
                .insert_header("content-type", "image/png"),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url, 100, 1);
    config.crawler.include_binary_content = false;
    let snapshot = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    let photo = format!("{}/photo.png", base_url);
    assert_eq!(snapshot.fetch_status(&photo), Some(200));
    assert!(snapshot.visit(&photo).is_none());
}

#[tokio::test]
async fn test_binary_content_recorded_when_enabled() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", links(&base_url, &["/doc.pdf"])).await;
    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0u8; 2048])
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 100, 1);
    let snapshot = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    let visit = snapshot
        .visit(&format!("{}/doc.pdf", base_url))
        .expect("pdf should have a visit record");
    assert_eq!(visit.size, 2048);
    assert_eq!(visit.outlinks, 0);
    assert_eq!(visit.content_type, "application/pdf");
}

/// Fetcher that serves a fan-out site and remembers when each request started,
/// robots.txt included
struct TimedSite {
    children: usize,
    starts: Mutex<Vec<Instant>>,
}

impl TimedSite {
    fn new(children: usize) -> Self {
        Self {
            children,
            starts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PageFetcher for TimedSite {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        self.starts.lock().unwrap().push(Instant::now());
        let body = if url.path() == "/" {
            (0..self.children)
                .map(|i| format!(r#"<a href="/c{}">c</a>"#, i))
                .collect::<String>()
        } else {
            "<p>leaf</p>".to_string()
        };
        Ok(FetchResponse {
            status: 200,
            content_type: Some("text/html".to_string()),
            location: None,
            body: body.into_bytes(),
        })
    }
}

#[async_trait]
impl RobotsFetcher for TimedSite {
    async fn fetch_robots(&self, _robots_url: &Url) -> Option<ParsedRobots> {
        self.starts.lock().unwrap().push(Instant::now());
        None
    }
}

#[tokio::test]
async fn test_politeness_delay_spaces_requests_to_one_host() {
    let site = Arc::new(TimedSite::new(3));
    let mut config = create_test_config("https://example.com", 100, 1);
    config.scope.allowed_domains = vec!["example.com".to_string()];
    config.crawler.politeness_delay_ms = PolitenessDelay::Fixed(150);

    let coordinator = Coordinator::with_transport(config, site.clone(), site.clone())
        .expect("Failed to create coordinator");
    let snapshot = coordinator.run().await.expect("Crawl failed");
    assert_eq!(snapshot.fetches.len(), 4);

    // robots.txt plus four pages
    let mut starts = site.starts.lock().unwrap().clone();
    assert_eq!(starts.len(), 5);
    starts.sort();
    for pair in starts.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(
            gap >= Duration::from_millis(140),
            "requests only {:?} apart",
            gap
        );
    }
}

#[tokio::test]
async fn test_stop_before_run_fetches_nothing() {
    let site = Arc::new(TimedSite::new(3));
    let mut config = create_test_config("https://example.com", 100, 1);
    config.scope.allowed_domains = vec!["example.com".to_string()];

    let coordinator = Coordinator::with_transport(config, site.clone(), site.clone())
        .expect("Failed to create coordinator");
    let stop = coordinator.stop_handle();
    stop.stop();
    assert!(stop.is_stopped());

    let snapshot = coordinator.run().await.expect("Crawl failed");
    assert!(snapshot.fetches.is_empty());
    assert!(site.starts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_crawl_timeout_ends_run_early() {
    let site = Arc::new(TimedSite::new(30));
    let mut config = create_test_config("https://example.com", 100, 1);
    config.scope.allowed_domains = vec!["example.com".to_string()];
    config.crawler.worker_count = 2;
    config.crawler.politeness_delay_ms = PolitenessDelay::Fixed(300);
    config.crawler.crawl_timeout_secs = Some(1);

    let started = Instant::now();
    let coordinator = Coordinator::with_transport(config, site.clone(), site.clone())
        .expect("Failed to create coordinator");
    let snapshot = coordinator.run().await.expect("Crawl failed");

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!snapshot.fetches.is_empty());
    assert!(snapshot.fetches.len() < 31);
}

#[tokio::test]
async fn test_output_files_round_trip_through_report() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        format!(
            "{}{}",
            links(&base_url, &["/a", "/gone"]),
            r#"<a href="https://elsewhere.test/">out</a>"#
        ),
    )
    .await;
    mount_page(&mock_server, "/a", "<p>a</p>".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 100, 1);
    let snapshot = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    let dir = TempDir::new().expect("Failed to create temp dir");
    let header = ReportHeader {
        site_label: "mock".to_string(),
        worker_count: 4,
        config_hash: None,
    };
    let records = CsvRecordWriter::new(dir.path(), "mock");
    let report = ReportWriter::new(dir.path(), header);
    emit_all(&[&records, &report], &snapshot).expect("Failed to write output");

    assert!(dir.path().join("fetch_mock.csv").exists());
    assert!(dir.path().join("visit_mock.csv").exists());
    assert!(dir.path().join("urls_mock.csv").exists());

    let restored = read_snapshot(dir.path(), "mock").expect("Failed to read records");
    assert_eq!(restored, snapshot);

    let text = std::fs::read_to_string(report.path()).expect("Failed to read report");
    assert!(text.contains("Site crawled: mock"));
    assert!(text.contains("Fetch Statistics"));
    assert!(text.contains("404"));
}
