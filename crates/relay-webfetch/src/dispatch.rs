//! Strategy selection, truncation, and page caching.
//!
//! [`Dispatcher::fetch`] decides per URL whether to read it verbatim
//! (plain-text allow-list) or run extraction, truncates the result to the
//! caller's character ceiling, and memoizes the outcome in the shared
//! [`ResponseCache`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use relay_core::asset::FetchStrategy;
use relay_core::cache::{ResponseCache, cache_key};
use relay_core::error::ToolError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use crate::fetcher::PageFetcher;
use crate::options::FetchOptions;

pub const TRUNCATION_MARKER: &str = "\n\n[TRUNCATED]\n";
pub const UNTITLED: &str = "untitled";

/// One fetched page, ready for formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult {
    pub url: String,
    pub title: Option<String>,
    pub content: String,
    /// RFC 3339, UTC, millisecond precision.
    pub fetched_at: String,
    pub truncated: bool,
    pub strategy: FetchStrategy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    /// Set when this result was served from the cache.
    #[serde(skip)]
    pub from_cache: bool,
}

/// Fetches pages through a [`PageFetcher`], with caching.
#[derive(Clone)]
pub struct Dispatcher {
    fetcher: Arc<dyn PageFetcher>,
    cache: Arc<ResponseCache>,
}

impl Dispatcher {
    pub fn new(fetcher: Arc<dyn PageFetcher>, cache: Arc<ResponseCache>) -> Self {
        Self { fetcher, cache }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Fetch `url` (already validated) with the given options.
    pub async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<FetchResult, ToolError> {
        let strategy = FetchStrategy::for_url(url);
        let key = page_key(url, strategy, options);

        if let Some(raw) = self.cache.get(&key) {
            match serde_json::from_str::<FetchResult>(&raw) {
                Ok(mut hit) => {
                    info!("[cache] page hit for {url}");
                    hit.from_cache = true;
                    return Ok(hit);
                }
                Err(e) => debug!("Discarding unreadable page cache entry for {url}: {e}"),
            }
        }

        debug!("Fetching {url} via {strategy:?}");
        let (title, body, links) = match strategy {
            FetchStrategy::PlainText => {
                let text = self.fetcher.fetch_text(url, options).await?;
                (Some(plain_text_title(url)), text, Vec::new())
            }
            FetchStrategy::Extract => {
                let page = self.fetcher.extract_page(url, options).await?;
                let links = page.links.iter().map(|l| l.to_string()).collect();
                (page.title, page.markdown, links)
            }
        };

        let (content, truncated) = truncate_for_context(&body, options.max_chars);
        if truncated {
            debug!(
                "Truncated {url} from {} to {} chars",
                body.chars().count(),
                options.max_chars
            );
        }
        let result = FetchResult {
            url: url.to_string(),
            title,
            content,
            fetched_at: now_rfc3339(),
            truncated,
            strategy,
            links,
            from_cache: false,
        };

        match serde_json::to_string(&result) {
            Ok(raw) => self.cache.set(key, raw),
            Err(e) => debug!("Not caching page {url}: {e}"),
        }
        Ok(result)
    }
}

fn page_key(url: &Url, strategy: FetchStrategy, options: &FetchOptions) -> String {
    let digest = url_digest(url.as_str());
    let strategy = match strategy {
        FetchStrategy::PlainText => "plain-text",
        FetchStrategy::Extract => "extract",
    };
    let robots = options.respect_robots.to_string();
    let max_chars = options.max_chars.to_string();
    cache_key(
        "page",
        &[
            Some(digest.as_str()),
            Some(strategy),
            Some(robots.as_str()),
            Some(options.user_agent.as_str()),
            Some(max_chars.as_str()),
        ],
    )
}

/// Last non-empty path segment, or [`UNTITLED`].
fn plain_text_title(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| UNTITLED.to_string())
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ── Formatting helpers ─────────────────────────────────────────────

/// Keep the first `max_chars` characters, appending [`TRUNCATION_MARKER`]
/// when anything was cut.
pub fn truncate_for_context(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        None => (text.to_string(), false),
        Some((byte_end, _)) => {
            let head = text.get(..byte_end).unwrap_or_default();
            (format!("{head}{TRUNCATION_MARKER}"), true)
        }
    }
}

/// Lowercase hex SHA-256 of a URL.
pub fn url_digest(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// `<cache_dir>/<sha256(url)>.json`.
pub fn cache_path(cache_dir: &str, url: &str) -> PathBuf {
    Path::new(cache_dir).join(format!("{}.json", url_digest(url)))
}

/// Trailer appended to fetch results pointing at the cache file.
pub fn cache_message(path: &Path) -> String {
    format!("\n\n---\n\nCache: {}\n", path.display())
}

/// Markdown with a YAML-style metadata header, as written by the save tools.
pub fn frontmatter(url: &str, title: Option<&str>, fetch_time: &str, body: &str) -> String {
    format!(
        "---\nurl: {url}\ntitle: {}\nfetchTime: {fetch_time}\n---\n\n{body}",
        title.unwrap_or("N/A")
    )
}
