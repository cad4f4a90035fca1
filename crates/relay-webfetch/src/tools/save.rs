//! `saveWebFetch` and `crawlWebFetch`: write pages to Markdown files under
//! the output root.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use relay_core::ToolDef;
use relay_core::error::ToolError;
use relay_core::pipeline::Completion;
use relay_core::tools::{Tool, ToolFuture, ToolSpec, parse_tool_args};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use url::Url;

use super::{CRAWL_WEB_FETCH, FULL_WEB_FETCH, FetchContext, SAVE_WEB_FETCH, into_result, write_under_root};
use crate::dispatch::{FetchResult, cache_path, frontmatter};
use crate::options::{CrawlOptions, CrawlOptionsInput, FetchOptions, FetchOptionsInput};
use crate::validate::{sanitize_filename, validate_output_path, validate_url};

/// File stem for a page: its sanitized title, else host and path.
fn file_stem(page: &FetchResult, url: &Url) -> String {
    match page.title.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(title) => sanitize_filename(title),
        None => sanitize_filename(&format!("{}{}", url.host_str().unwrap_or_default(), url.path())),
    }
}

// ── saveWebFetch ───────────────────────────────────────────────────

/// Arguments for `saveWebFetch`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SaveArgs {
    /// The http(s) URL to fetch.
    pub url: String,
    /// Directory, relative to the server's output root, to save into.
    pub output_path: String,
    /// Fetch options; unset fields use the server defaults.
    #[serde(default)]
    pub options: Option<FetchOptionsInput>,
}

/// Fetch one page and save it with a metadata header.
pub struct SaveWebFetch {
    ctx: Arc<FetchContext>,
}

impl SaveWebFetch {
    pub fn new(ctx: Arc<FetchContext>) -> Self {
        Self { ctx }
    }

    async fn run(&self, arguments: Value) -> Result<Completion, ToolError> {
        let args: SaveArgs = parse_tool_args(arguments)?;
        let output_dir = validate_output_path(&args.output_path)?;
        let url = validate_url(&args.url)?;
        let options = self.ctx.options(args.options)?;

        let page = self.ctx.dispatcher.fetch(&url, &options).await?;
        let relative = output_dir.join(format!("{}.md", file_stem(&page, &url)));
        let document = frontmatter(&page.url, page.title.as_deref(), &page.fetched_at, &page.content);
        write_under_root(&self.ctx.output_root, &relative, &document).await?;

        let file_path = relative.display().to_string();
        info!("Saved {} to {file_path}", page.url);
        Ok(Completion::new(
            format!("Saved {} to {file_path}", page.url),
            json!({
                "url": page.url,
                "filePath": file_path,
                "title": page.title,
                "fetchTime": page.fetched_at,
                "cachePath": cache_path(&options.cache_dir, url.as_str()).display().to_string(),
            }),
        ))
    }
}

impl Tool for SaveWebFetch {
    fn definition(&self) -> ToolDef {
        ToolSpec::builder(SAVE_WEB_FETCH)
            .title("Save Web Fetch (File with Metadata)")
            .purpose("Fetch a web page and save it as a Markdown file with url, title and fetch time")
            .when_to_use("When a page should be kept on disk for later reading or indexing")
            .when_not_to_use("When you just want to read the page now")
            .parameters_for::<SaveArgs>()
            .example(
                "saveWebFetch(url=\"https://example.com/guide\", outputPath=\"docs\")",
                "Saved https://example.com/guide to docs/guide.md",
            )
            .output_format("One line naming the written file")
            .disambiguate("Reading the page inline", FULL_WEB_FETCH, "nothing is written to disk")
            .to_tool_def()
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move { into_result(SAVE_WEB_FETCH, self.run(arguments).await) })
    }
}

// ── crawlWebFetch ──────────────────────────────────────────────────

/// Arguments for `crawlWebFetch`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CrawlArgs {
    /// URL pattern with exactly one `*`, e.g. `https://docs.example.com/guide/*`.
    /// The part before `*` is both the start page and the link filter.
    pub pattern: String,
    /// Directory, relative to the server's output root, to save into.
    pub output_path: String,
    /// Crawl options; unset fields use the server defaults.
    #[serde(default)]
    pub options: Option<CrawlOptionsInput>,
}

/// The text before the single `*` of a crawl pattern.
pub fn crawl_prefix(pattern: &str) -> Result<&str, ToolError> {
    let stars = pattern.matches('*').count();
    if stars != 1 {
        return Err(ToolError::invalid(format!(
            "pattern must contain exactly one '*' (found {stars})"
        )));
    }
    let (prefix, _) = pattern
        .split_once('*')
        .ok_or_else(|| ToolError::invalid("pattern must contain '*'"))?;
    Ok(prefix)
}

/// `name`, or `name-2`, `name-3`, … if already taken in this crawl.
fn unique_stem(stem: String, used: &mut HashSet<String>) -> String {
    if used.insert(stem.clone()) {
        return stem;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{stem}-{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Fetch every page under a URL prefix and save each as Markdown.
pub struct CrawlWebFetch {
    ctx: Arc<FetchContext>,
}

impl CrawlWebFetch {
    pub fn new(ctx: Arc<FetchContext>) -> Self {
        Self { ctx }
    }

    async fn run(&self, arguments: Value) -> Result<Completion, ToolError> {
        let args: CrawlArgs = parse_tool_args(arguments)?;
        let output_dir = validate_output_path(&args.output_path)?;
        let root = validate_url(crawl_prefix(&args.pattern)?)?;
        let crawl = CrawlOptions::resolve(&self.ctx.defaults, args.options)?;
        let filter = root.as_str().to_string();

        let root_page = self.ctx.dispatcher.fetch(&root, &crawl.fetch).await?;
        let targets: Vec<Url> = root_page
            .links
            .iter()
            .filter(|link| link.starts_with(&filter) && link.as_str() != root.as_str())
            .filter_map(|link| Url::parse(link).ok())
            .take(crawl.max_pages.saturating_sub(1))
            .collect();
        info!(
            "Crawling {} pages under {filter} (concurrency {})",
            targets.len() + 1,
            crawl.max_concurrency
        );

        let fetched: Vec<(Url, Result<FetchResult, ToolError>)> =
            futures::stream::iter(targets)
                .map(|url| self.fetch_one(url, &crawl.fetch))
                .buffered(crawl.max_concurrency)
                .collect()
                .await;

        let mut pages = Vec::with_capacity(fetched.len() + 1);
        pages.push((root.clone(), Ok(root_page)));
        pages.extend(fetched);
        let total = pages.len();

        let mut used = HashSet::new();
        let mut saved_files = Vec::new();
        let mut errors = Vec::new();
        for (url, outcome) in pages {
            let saved = match outcome {
                Ok(page) => self.save(&output_dir, &url, &page, &mut used).await,
                Err(e) => Err(e),
            };
            match saved {
                Ok(path) => saved_files.push(path),
                Err(e) => {
                    warn!("crawl: {url} failed: {e}");
                    errors.push(format!("{url}: {e}"));
                }
            }
        }

        let saved = saved_files.len();
        let failed = total - saved;
        Ok(Completion::new(
            format!(
                "Crawl: {saved}/{total} saved to {}, {failed} failed",
                args.output_path
            ),
            json!({
                "totalPages": total,
                "saved": saved,
                "failed": failed,
                "savedFiles": saved_files,
                "errors": errors,
            }),
        ))
    }

    async fn fetch_one(&self, url: Url, options: &FetchOptions) -> (Url, Result<FetchResult, ToolError>) {
        let result = self.ctx.dispatcher.fetch(&url, options).await;
        (url, result)
    }

    async fn save(
        &self,
        output_dir: &Path,
        url: &Url,
        page: &FetchResult,
        used: &mut HashSet<String>,
    ) -> Result<String, ToolError> {
        let stem = unique_stem(file_stem(page, url), used);
        let relative: PathBuf = output_dir.join(format!("{stem}.md"));
        let document = frontmatter(&page.url, page.title.as_deref(), &page.fetched_at, &page.content);
        write_under_root(&self.ctx.output_root, &relative, &document).await?;
        Ok(relative.display().to_string())
    }
}

impl Tool for CrawlWebFetch {
    fn definition(&self) -> ToolDef {
        ToolSpec::builder(CRAWL_WEB_FETCH)
            .title("Crawl Web Fetch (Multi-URL Pattern)")
            .purpose(
                "Fetch the page at a URL prefix plus every same-site page it links to under that \
                 prefix, saving each as a Markdown file",
            )
            .when_to_use("When mirroring a documentation section or a set of related pages to disk")
            .when_not_to_use("When a single page is enough")
            .parameters_for::<CrawlArgs>()
            .example(
                "crawlWebFetch(pattern=\"https://docs.example.com/guide/*\", outputPath=\"guide\")",
                "Crawl: 12/13 saved to guide, 1 failed",
            )
            .output_format("Summary line; structured content lists saved files and per-URL errors")
            .disambiguate("Only one page is needed", SAVE_WEB_FETCH, "it fetches exactly one URL")
            .to_tool_def()
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move { into_result(CRAWL_WEB_FETCH, self.run(arguments).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_text_before_star() {
        assert_eq!(
            crawl_prefix("https://docs.example.com/guide/*").unwrap(),
            "https://docs.example.com/guide/"
        );
        assert!(crawl_prefix("https://docs.example.com/guide/").is_err());
        assert!(crawl_prefix("https://*.example.com/*").is_err());
    }

    #[test]
    fn stems_are_deduplicated() {
        let mut used = HashSet::new();
        assert_eq!(unique_stem("intro".into(), &mut used), "intro");
        assert_eq!(unique_stem("intro".into(), &mut used), "intro-2");
        assert_eq!(unique_stem("intro".into(), &mut used), "intro-3");
        assert_eq!(unique_stem("setup".into(), &mut used), "setup");
    }

    #[test]
    fn untitled_pages_use_host_and_path() {
        let url = Url::parse("https://example.com/docs/intro").unwrap();
        let page = FetchResult {
            url: url.to_string(),
            title: None,
            content: String::new(),
            fetched_at: String::new(),
            truncated: false,
            strategy: relay_core::asset::FetchStrategy::Extract,
            links: Vec::new(),
            from_cache: false,
        };
        assert_eq!(file_stem(&page, &url), "example-com-docs-intro");
    }
}
