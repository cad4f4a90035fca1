//! Page fetching: the [`PageFetcher`] seam and its HTTP implementation.
//!
//! [`HttpFetcher`] has two modes:
//!
//! - **plain text**: one GET, body decoded with the response charset;
//! - **extraction**: optional robots.txt check, HTML GET, title and
//!   same-origin links read with `scraper`, body converted to Markdown with
//!   `htmd`.
//!
//! Redirects are followed (at most [`MAX_REDIRECTS`]) only while every hop
//! passes the same public-host check as the original URL.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use relay_core::error::ToolError;
use reqwest::header::{ACCEPT, USER_AGENT};
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::options::FetchOptions;
use crate::robots::RobotsRules;
use crate::validate::check_url;

pub const MAX_REDIRECTS: usize = 5;

const PLAIN_TEXT_ACCEPT: &str = "text/plain, text/markdown, application/json, text/*, */*";
const HTML_ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

/// Boxed future returned by [`PageFetcher`] methods.
pub type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ToolError>> + Send + 'a>>;

/// A page reduced to Markdown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPage {
    pub title: Option<String>,
    pub markdown: String,
    /// Same-origin links found on the page, fragments removed, in document
    /// order without duplicates.
    pub links: Vec<Url>,
}

/// Turns URLs into text.
///
/// Implementations do no caching and no truncation; the
/// [`Dispatcher`](crate::dispatch::Dispatcher) handles both.
pub trait PageFetcher: Send + Sync {
    /// Fetch a plain-text resource verbatim.
    fn fetch_text<'a>(&'a self, url: &'a Url, options: &'a FetchOptions) -> FetchFuture<'a, String>;

    /// Fetch an HTML page and extract its content as Markdown.
    fn extract_page<'a>(
        &'a self,
        url: &'a Url,
        options: &'a FetchOptions,
    ) -> FetchFuture<'a, ExtractedPage>;
}

// ── HttpFetcher ────────────────────────────────────────────────────

/// [`PageFetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, ToolError> {
        let policy = reqwest::redirect::Policy::custom(|attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error(format!("more than {MAX_REDIRECTS} redirects"))
            } else if let Err(e) = check_url(attempt.url()) {
                attempt.error(format!("redirect rejected: {e}"))
            } else {
                attempt.follow()
            }
        });
        let client = reqwest::Client::builder()
            .redirect(policy)
            .build()
            .map_err(|e| ToolError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn get(
        &self,
        url: &Url,
        options: &FetchOptions,
        accept: &str,
    ) -> Result<reqwest::Response, ToolError> {
        let start = Instant::now();
        let resp = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &options.user_agent)
            .header(ACCEPT, accept)
            .timeout(Duration::from_millis(options.timeout_ms))
            .send()
            .await
            .map_err(|e| ToolError::from_reqwest(e, options.timeout_ms))?;

        let status = resp.status();
        debug!(
            "GET {url}: HTTP {} in {:.2}s",
            status,
            start.elapsed().as_secs_f64()
        );
        if !status.is_success() {
            return Err(ToolError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }
        Ok(resp)
    }

    async fn robots_allow(&self, url: &Url, options: &FetchOptions) -> Result<(), ToolError> {
        let Ok(robots_url) = url.join("/robots.txt") else {
            return Ok(());
        };
        let body = match self.get(&robots_url, options, "text/plain").await {
            Ok(resp) => resp.text().await.unwrap_or_default(),
            // No readable robots.txt means no restrictions.
            Err(e) => {
                debug!("No robots.txt at {robots_url}: {e}");
                return Ok(());
            }
        };
        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        if RobotsRules::parse(&body, &options.user_agent).is_allowed(&path) {
            Ok(())
        } else {
            warn!("robots.txt disallows {url}");
            Err(ToolError::RobotsDisallowed {
                url: url.to_string(),
            })
        }
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_text<'a>(&'a self, url: &'a Url, options: &'a FetchOptions) -> FetchFuture<'a, String> {
        Box::pin(async move {
            let resp = self.get(url, options, PLAIN_TEXT_ACCEPT).await?;
            let text = resp
                .text()
                .await
                .map_err(|e| ToolError::from_reqwest(e, options.timeout_ms))?;
            debug!("Plain-text fetch of {url}: {} chars", text.chars().count());
            Ok(text)
        })
    }

    fn extract_page<'a>(
        &'a self,
        url: &'a Url,
        options: &'a FetchOptions,
    ) -> FetchFuture<'a, ExtractedPage> {
        Box::pin(async move {
            if options.respect_robots {
                self.robots_allow(url, options).await?;
            }
            let resp = self.get(url, options, HTML_ACCEPT).await?;
            let final_url = resp.url().clone();
            let html = resp
                .text()
                .await
                .map_err(|e| ToolError::from_reqwest(e, options.timeout_ms))?;

            let page = extract_html(&html, &final_url)?;
            if page.markdown.trim().is_empty() {
                return Err(ToolError::EmptyContent {
                    url: url.to_string(),
                });
            }
            debug!(
                "Extracted {url}: {} chars, {} links",
                page.markdown.chars().count(),
                page.links.len()
            );
            Ok(page)
        })
    }
}

// ── Extraction ─────────────────────────────────────────────────────

/// Title, Markdown body and same-origin links of an HTML document.
pub fn extract_html(html: &str, base: &Url) -> Result<ExtractedPage, ToolError> {
    let document = Html::parse_document(html);
    let title = page_title(&document);
    let links = same_origin_links(&document, base);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "noscript", "template", "head"])
        .build();
    let markdown = converter
        .convert(html)
        .map_err(|e| ToolError::Network(format!("failed to convert HTML from {base}: {e}")))?;

    Ok(ExtractedPage {
        title,
        markdown: markdown.trim().to_string(),
        links,
    })
}

fn page_title(document: &Html) -> Option<String> {
    ["title", "h1"].iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        document
            .select(&selector)
            .map(|el| el.text().collect::<Vec<_>>().join(" "))
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .find(|t| !t.is_empty())
    })
}

fn same_origin_links(document: &Html, base: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let origin = base.origin();
    let mut links: Vec<Url> = Vec::new();
    for href in document.select(&selector).filter_map(|a| a.value().attr("href")) {
        let Ok(mut link) = base.join(href.trim()) else {
            continue;
        };
        link.set_fragment(None);
        if link.origin() == origin && !links.contains(&link) {
            links.push(link);
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<!doctype html>
<html>
<head><title>  Getting   Started </title><style>body { color: red }</style></head>
<body>
  <h1>Welcome</h1>
  <p>Install with <code>cargo add</code>.</p>
  <script>console.log("hidden")</script>
  <a href="/docs/a">A</a>
  <a href="b#section">B</a>
  <a href="/docs/a#again">A again</a>
  <a href="https://other.example.org/x">elsewhere</a>
  <a href="mailto:someone@example.com">mail</a>
</body>
</html>"##;

    #[test]
    fn extracts_title_markdown_and_links() {
        let base = Url::parse("https://example.com/docs/start").unwrap();
        let page = extract_html(PAGE, &base).unwrap();

        assert_eq!(page.title.as_deref(), Some("Getting Started"));
        assert!(page.markdown.contains("Welcome"));
        assert!(page.markdown.contains("cargo add"));
        assert!(!page.markdown.contains("console.log"));
        assert!(!page.markdown.contains("color: red"));

        let links: Vec<&str> = page.links.iter().map(Url::as_str).collect();
        assert_eq!(
            links,
            vec!["https://example.com/docs/a", "https://example.com/docs/b"]
        );
    }

    #[test]
    fn falls_back_to_first_heading_for_title() {
        let base = Url::parse("https://example.com/").unwrap();
        let page = extract_html("<html><body><h1>Only heading</h1></body></html>", &base).unwrap();
        assert_eq!(page.title.as_deref(), Some("Only heading"));
    }

    #[test]
    fn untitled_page_has_no_title() {
        let base = Url::parse("https://example.com/").unwrap();
        let page = extract_html("<html><body><p>text</p></body></html>", &base).unwrap();
        assert_eq!(page.title, None);
    }
}
