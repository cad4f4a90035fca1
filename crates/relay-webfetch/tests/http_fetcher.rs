//! `HttpFetcher` against a local mock server.
//!
//! The fetcher itself does not re-validate the starting URL (tools do that),
//! so it can talk to the loopback mock server directly.

use relay_core::error::ToolError;
use relay_webfetch::options::FetchOptions;
use relay_webfetch::{HttpFetcher, PageFetcher};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn url(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{p}", server.uri())).unwrap()
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

#[tokio::test]
async fn plain_text_body_is_returned_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notes.md"))
        .and(header("user-agent", "test-agent/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# Notes\n\n- one\n"))
        .mount(&server)
        .await;

    let options = FetchOptions {
        user_agent: "test-agent/1.0".into(),
        ..FetchOptions::default()
    };
    let fetcher = HttpFetcher::new().unwrap();
    let text = fetcher.fetch_text(&url(&server, "/notes.md"), &options).await.unwrap();
    assert_eq!(text, "# Notes\n\n- one\n");
}

#[tokio::test]
async fn non_success_status_is_an_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let err = fetcher
        .fetch_text(&url(&server, "/missing.txt"), &FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Http { status: 404, .. }), "{err}");
}

#[tokio::test]
async fn html_is_extracted_when_robots_allows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(html(
            "<html><head><title>Docs</title></head><body><p>Hello <b>there</b></p>\
             <a href=\"/docs/next\">next</a></body></html>",
        ))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let page = fetcher
        .extract_page(&url(&server, "/docs"), &FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(page.title.as_deref(), Some("Docs"));
    assert!(page.markdown.contains("Hello **there**"));
    assert_eq!(page.links, vec![url(&server, "/docs/next")]);
}

#[tokio::test]
async fn robots_disallow_blocks_extraction() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(html("<p>secret</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let err = fetcher
        .extract_page(&url(&server, "/private/page"), &FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::RobotsDisallowed { .. }), "{err}");
}

#[tokio::test]
async fn robots_is_skipped_when_not_respected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html("<p>open</p>"))
        .mount(&server)
        .await;

    let options = FetchOptions {
        respect_robots: false,
        ..FetchOptions::default()
    };
    let fetcher = HttpFetcher::new().unwrap();
    let page = fetcher.extract_page(&url(&server, "/page"), &options).await.unwrap();
    assert_eq!(page.markdown, "open");
}

#[tokio::test]
async fn missing_robots_allows_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html("<p>fine</p>"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let page = fetcher
        .extract_page(&url(&server, "/page"), &FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(page.markdown, "fine");
}

#[tokio::test]
async fn page_without_text_is_empty_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blank"))
        .respond_with(html("<html><body><script>var x = 1;</script></body></html>"))
        .mount(&server)
        .await;

    let options = FetchOptions {
        respect_robots: false,
        ..FetchOptions::default()
    };
    let fetcher = HttpFetcher::new().unwrap();
    let err = fetcher
        .extract_page(&url(&server, "/blank"), &options)
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::EmptyContent { .. }), "{err}");
}

#[tokio::test]
async fn redirect_to_loopback_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/moved.txt"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/target.txt"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/target.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("should not be read"))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let result = fetcher
        .fetch_text(&url(&server, "/moved.txt"), &FetchOptions::default())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let options = FetchOptions {
        timeout_ms: 50,
        ..FetchOptions::default()
    };
    let fetcher = HttpFetcher::new().unwrap();
    let err = fetcher
        .fetch_text(&url(&server, "/slow.txt"), &options)
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Timeout { ms: 50 }), "{err}");
}
