//! Integration tests for the search crawl
//!
//! These tests use wiremock to stand in for a search backend and run the
//! full keyword-to-output cycle end-to-end with the real HTTP fetcher.

use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::BufReader;
use url_harvester::config::{parse_config, Config};
use url_harvester::{CrawlScheduler, CrawlSummary};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches requests that do not carry the given query parameter
struct NoQueryParam(&'static str);

impl Match for NoQueryParam {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(key, _)| key == self.0)
    }
}

/// Creates a test configuration pointing the Google backend at the mock server
fn create_test_config(server: &MockServer, format: &str, extra: &str) -> Config {
    let toml = format!(
        r#"
[search]
engine = "google"
base-url = "{uri}/search?q=$keyword"
routine-count = 3
format = "{format}"

[queue]
work-capacity = 64
result-capacity = 16

[output]
sink-delay-ms = 0
progress-interval-ms = 50

[filter]
redirect-prefixes = ["{uri}/link?url="]

{extra}
"#,
        uri = server.uri(),
        format = format,
        extra = extra
    );
    parse_config(&toml).expect("test config should be valid")
}

/// A results page in the Google layout
fn results_page(results: &[&str], next: Option<&str>) -> String {
    let mut body = String::from("<html><body><div id=\"search\">");
    for link in results {
        body.push_str(&format!(
            "<div class=\"g\"><a href=\"{}\" data-ved=\"x\"><h3>Result</h3></a></div>\n",
            link
        ));
    }
    if let Some(next) = next {
        body.push_str(&format!(
            "<a href=\"{}\" id=\"pnnext\" style=\"text-align:left\">Next</a>",
            next
        ));
    }
    body.push_str("</div></body></html>");
    body
}

async fn mount_page(server: &MockServer, keyword: &str, start: Option<&str>, body: String) {
    let mock = Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", keyword));
    let mock = match start {
        Some(start) => mock.and(query_param("start", start)),
        None => mock.and(NoQueryParam("start")),
    };
    mock.respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Runs a crawl over `keywords` and returns the summary and output lines
async fn run_crawl(config: &Config, keywords: &str) -> (CrawlSummary, Vec<String>) {
    let out = NamedTempFile::new().expect("Failed to create temp file");
    let file = tokio::fs::File::create(out.path())
        .await
        .expect("Failed to open output");
    let input = BufReader::new(std::io::Cursor::new(keywords.as_bytes().to_vec()));

    let scheduler = CrawlScheduler::from_config(config).expect("Failed to build scheduler");
    let summary = tokio::time::timeout(Duration::from_secs(10), scheduler.run(input, file))
        .await
        .expect("Crawl should terminate")
        .expect("Crawl failed");

    let lines = std::fs::read_to_string(out.path())
        .expect("Failed to read output")
        .lines()
        .map(str::to_string)
        .collect();
    (summary, lines)
}

#[tokio::test]
async fn test_full_crawl_follows_pagination() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "inurl:php",
        None,
        results_page(
            &["http://one.example.com/a.php?id=1", "http://two.example.com/"],
            Some("/search?q=inurl:php&amp;start=10"),
        ),
    )
    .await;
    mount_page(
        &server,
        "inurl:php",
        Some("10"),
        results_page(&["http://three.example.com/b.php?id=2"], None),
    )
    .await;

    let config = create_test_config(&server, "raw", "");
    let (summary, mut lines) = run_crawl(&config, "inurl:php\n").await;
    lines.sort();

    assert_eq!(summary.submitted, 1);
    assert_eq!(summary.finished, 1);
    assert_eq!(summary.outstanding, 0);
    assert_eq!(summary.results_written, 3);
    assert_eq!(summary.workers_alive_at_close, 0);
    assert_eq!(
        lines,
        vec![
            "inurl:php\thttp://one.example.com/a.php?id=1",
            "inurl:php\thttp://three.example.com/b.php?id=2",
            "inurl:php\thttp://two.example.com/",
        ]
    );
}

#[tokio::test]
async fn test_multiple_keywords_share_dedup_and_blacklist() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "alpha",
        None,
        results_page(
            &[
                "http://shared.example.com/x",
                "http://alpha.example.com/",
                "https://ads.blocked.org/track",
            ],
            None,
        ),
    )
    .await;
    mount_page(
        &server,
        "beta",
        None,
        results_page(&["http://shared.example.com/y", "http://beta.example.com/"], None),
    )
    .await;

    let config = create_test_config(
        &server,
        "domain",
        r#"
[[blacklist]]
domain = "*.blocked.org"
"#,
    );
    let (summary, lines) = run_crawl(&config, "alpha\nbeta\n").await;

    assert_eq!(summary.finished, 2);
    assert_eq!(summary.results_written, 3);
    assert_eq!(summary.results_dropped, 2);

    let mut domains: Vec<&str> = lines
        .iter()
        .map(|l| l.split('\t').nth(1).unwrap_or_default())
        .collect();
    domains.sort();
    assert_eq!(
        domains,
        vec!["alpha.example.com", "beta.example.com", "shared.example.com"]
    );
}

#[tokio::test]
async fn test_pagination_with_rewritten_query_terminates() {
    let server = MockServer::start().await;

    // The backend lowercases the keyword in its own pagination links
    mount_page(
        &server,
        "Rust Lang",
        None,
        results_page(
            &["http://first.example.com/"],
            Some("/search?q=rust+lang&amp;start=10"),
        ),
    )
    .await;
    mount_page(
        &server,
        "rust lang",
        Some("10"),
        results_page(&["http://second.example.com/"], None),
    )
    .await;

    let config = create_test_config(&server, "raw", "");
    let (summary, mut lines) = run_crawl(&config, "Rust Lang\n").await;
    lines.sort();

    assert_eq!(summary.finished, 1);
    assert_eq!(summary.outstanding, 0);
    assert_eq!(
        lines,
        vec![
            "Rust Lang\thttp://first.example.com/",
            "Rust Lang\thttp://second.example.com/",
        ]
    );
}

#[tokio::test]
async fn test_redirected_search_is_followed() {
    let server = MockServer::start().await;

    let moved_to = format!("{}/search?q=moved&hl=en", server.uri());
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "moved"))
        .and(NoQueryParam("hl"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", moved_to.as_str()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "moved"))
        .and(query_param("hl", "en"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(results_page(&["http://landed.example.com/"], None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, "raw", "");
    let (summary, lines) = run_crawl(&config, "moved\n").await;

    assert_eq!(summary.finished, 1);
    assert_eq!(lines, vec!["moved\thttp://landed.example.com/"]);
}

#[tokio::test]
async fn test_soft_failure_page_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "busy"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<script>window.location.href='/sorry'</script>"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "busy",
        None,
        results_page(&["http://patient.example.com/"], None),
    )
    .await;

    let config = create_test_config(&server, "raw", "");
    let (summary, lines) = run_crawl(&config, "busy\n").await;

    assert_eq!(summary.finished, 1);
    assert_eq!(lines, vec!["busy\thttp://patient.example.com/"]);
}

#[tokio::test]
async fn test_jump_links_resolve_to_targets() {
    let server = MockServer::start().await;

    let jump = format!("{}/link?url=abc123", server.uri());
    mount_page(&server, "jump", None, results_page(&[jump.as_str()], None)).await;
    Mock::given(method("GET"))
        .and(path("/link"))
        .and(query_param("url", "abc123"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "https://real.example.com/page"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, "raw", "");
    let (_, lines) = run_crawl(&config, "jump\n").await;

    assert_eq!(lines, vec!["jump\thttps://real.example.com/page"]);
}

#[tokio::test]
async fn test_unreachable_backend_still_terminates() {
    let config = parse_config(
        r#"
[search]
engine = "google"
base-url = "http://127.0.0.1:1/search?q=$keyword"
routine-count = 2

[output]
sink-delay-ms = 0
progress-interval-ms = 50
"#,
    )
    .expect("test config should be valid");

    let (summary, lines) = run_crawl(&config, "one\ntwo\nthree\n").await;

    assert_eq!(summary.submitted, 3);
    assert_eq!(summary.finished, 3);
    assert_eq!(summary.outstanding, 0);
    assert!(lines.is_empty());
}
