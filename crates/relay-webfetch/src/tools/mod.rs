//! The web-fetch tools and the [`WebFetchToolsExt`] trait for registering
//! them on a [`ToolSet`].
//!
//! | Tool | Name | Purpose |
//! |------|------|---------|
//! | [`SimpleWebFetch`] | `simpleWebFetch` | Page content only |
//! | [`FullWebFetch`] | `fullWebFetch` | Page content with title heading |
//! | [`SaveWebFetch`] | `saveWebFetch` | Write one page to a Markdown file |
//! | [`CrawlWebFetch`] | `crawlWebFetch` | Fetch and save every page under a URL prefix |
//! | [`AskWebFetch`] | `askWebFetch` | Answer a question about a page with Perplexity |

pub mod ask;
pub mod fetch;
pub mod save;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use relay_core::cache::ResponseCache;
use relay_core::config::PERPLEXITY_API_KEY;
use relay_core::error::ToolError;
use relay_core::providers::PerplexityClient;
use relay_core::pipeline::Completion;
use relay_core::tools::{DisabledTool, ToolResult, ToolSet};
use tracing::debug;

use crate::dispatch::Dispatcher;
use crate::options::{FetchOptions, FetchOptionsInput};

pub use ask::{AskWebFetch, ask_web_fetch_def};
pub use fetch::{FullWebFetch, SimpleWebFetch};
pub use save::{CrawlWebFetch, SaveWebFetch};

// ── Tool name constants ─────────────────────────────────────────────

pub const SIMPLE_WEB_FETCH: &str = "simpleWebFetch";
pub const FULL_WEB_FETCH: &str = "fullWebFetch";
pub const SAVE_WEB_FETCH: &str = "saveWebFetch";
pub const CRAWL_WEB_FETCH: &str = "crawlWebFetch";
pub const ASK_WEB_FETCH: &str = "askWebFetch";

// ── Shared state ───────────────────────────────────────────────────

/// Everything the web-fetch tools share.
pub struct FetchContext {
    pub dispatcher: Dispatcher,
    /// Options used for fields the caller leaves unset.
    pub defaults: FetchOptions,
    /// Directory that `outputPath` arguments are resolved against.
    pub output_root: PathBuf,
}

impl FetchContext {
    pub fn new(dispatcher: Dispatcher, defaults: FetchOptions, output_root: impl Into<PathBuf>) -> Self {
        Self {
            dispatcher,
            defaults,
            output_root: output_root.into(),
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        self.dispatcher.cache()
    }

    pub fn options(&self, input: Option<FetchOptionsInput>) -> Result<FetchOptions, ToolError> {
        self.defaults.merged(input)
    }
}

pub(crate) fn into_result(tool: &str, outcome: Result<Completion, ToolError>) -> ToolResult {
    match outcome {
        Ok(c) => ToolResult::success(c.text, c.structured),
        Err(e) => ToolResult::failure(tool, &e),
    }
}

/// Write `contents` to `output_root/relative`, creating parent directories.
pub(crate) async fn write_under_root(
    output_root: &Path,
    relative: &Path,
    contents: &str,
) -> Result<(), ToolError> {
    let target = output_root.join(relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ToolError::WriteFile {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(&target, contents)
        .await
        .map_err(|source| ToolError::WriteFile {
            path: target.clone(),
            source,
        })?;
    debug!("Wrote {} ({} bytes)", target.display(), contents.len());
    Ok(())
}

// ── Extension trait ─────────────────────────────────────────────────

/// Extension trait for registering the web-fetch tools on a [`ToolSet`].
///
/// Without a Perplexity client `askWebFetch` is still listed but answers
/// with a configuration error.
///
/// ```ignore
/// let ctx = Arc::new(FetchContext::new(dispatcher, FetchOptions::default(), "."));
/// let tools = ToolSet::new().with_webfetch_tools(ctx, None);
/// ```
pub trait WebFetchToolsExt {
    fn with_webfetch_tools(self, ctx: Arc<FetchContext>, perplexity: Option<PerplexityClient>) -> Self;
}

impl WebFetchToolsExt for ToolSet {
    fn with_webfetch_tools(self, ctx: Arc<FetchContext>, perplexity: Option<PerplexityClient>) -> Self {
        let tools = self
            .with(SimpleWebFetch::new(ctx.clone()))
            .with(FullWebFetch::new(ctx.clone()))
            .with(SaveWebFetch::new(ctx.clone()))
            .with(CrawlWebFetch::new(ctx.clone()));
        match perplexity {
            Some(client) => tools.with(AskWebFetch::new(ctx, client)),
            None => tools.with(DisabledTool::new(
                ask_web_fetch_def(),
                format!(
                    "askWebFetch requires {PERPLEXITY_API_KEY} environment variable. \
                     Please set it and try again."
                ),
            )),
        }
    }
}
