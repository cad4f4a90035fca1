//! `simpleWebFetch` and `fullWebFetch`: return one page to the caller.

use std::sync::Arc;

use relay_core::ToolDef;
use relay_core::asset::FetchStrategy;
use relay_core::error::ToolError;
use relay_core::pipeline::{Completion, mark_cached};
use relay_core::tools::{Tool, ToolFuture, ToolSpec, parse_tool_args};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{FULL_WEB_FETCH, FetchContext, SAVE_WEB_FETCH, SIMPLE_WEB_FETCH, into_result};
use crate::dispatch::{FetchResult, cache_message, cache_path};
use crate::options::FetchOptionsInput;
use crate::validate::validate_url;

/// Arguments for `simpleWebFetch` and `fullWebFetch`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchArgs {
    /// The http(s) URL to fetch.
    pub url: String,
    /// Fetch options; unset fields use the server defaults.
    #[serde(default)]
    pub options: Option<FetchOptionsInput>,
}

/// Whether the text block starts with a `# <title>` heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Bare,
    Titled,
}

async fn fetch_page(ctx: &FetchContext, arguments: Value, layout: Layout) -> Result<Completion, ToolError> {
    let args: FetchArgs = parse_tool_args(arguments)?;
    let url = validate_url(&args.url)?;
    let options = ctx.options(args.options)?;
    let page = ctx.dispatcher.fetch(&url, &options).await?;

    let cache_path = cache_path(&options.cache_dir, url.as_str());
    let heading = match (layout, page.title.as_deref()) {
        (Layout::Titled, Some(title)) => format!("# {title}\n\n"),
        _ => String::new(),
    };
    let text = format!("{heading}{}{}", page.content, cache_message(&cache_path));

    let mut structured = json!({
        "url": page.url,
        "markdown": page.content,
        "fetchTime": page.fetched_at,
        "cachePath": cache_path.display().to_string(),
        "truncated": page.truncated,
    });
    if layout == Layout::Titled {
        structured["title"] = json!(page.title);
    }
    tag_source(&mut structured, &page);
    if page.from_cache {
        structured = mark_cached(structured);
    }
    Ok(Completion::new(text, structured))
}

fn tag_source(structured: &mut Value, page: &FetchResult) {
    if page.strategy == FetchStrategy::PlainText {
        structured["source"] = json!("plain-text-fetch");
        structured["fileType"] = json!("plain-text");
    }
}

// ── simpleWebFetch ─────────────────────────────────────────────────

/// Page content as Markdown, nothing else.
pub struct SimpleWebFetch {
    ctx: Arc<FetchContext>,
}

impl SimpleWebFetch {
    pub fn new(ctx: Arc<FetchContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for SimpleWebFetch {
    fn definition(&self) -> ToolDef {
        ToolSpec::builder(SIMPLE_WEB_FETCH)
            .title("Simple Web Fetch (Raw Markdown)")
            .purpose("Fetch a web page and return its content as clean Markdown without metadata")
            .when_to_use(
                "When you only need the text of a page. Plain-text files (.md, .txt, .json, \
                 source code) are returned verbatim; HTML pages are converted to Markdown",
            )
            .when_not_to_use("When you need the page title or want the result written to disk")
            .parameters_for::<FetchArgs>()
            .example(
                "simpleWebFetch(url=\"https://docs.rs/tokio/latest/tokio/\")",
                "Markdown body followed by a cache pointer",
            )
            .output_format("Markdown, truncated to maxChars with a [TRUNCATED] marker")
            .disambiguate("Need the title as a heading", FULL_WEB_FETCH, "it prefixes '# <title>'")
            .to_tool_def()
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            into_result(
                SIMPLE_WEB_FETCH,
                fetch_page(&self.ctx, arguments, Layout::Bare).await,
            )
        })
    }
}

// ── fullWebFetch ───────────────────────────────────────────────────

/// Page content with its title as a heading.
pub struct FullWebFetch {
    ctx: Arc<FetchContext>,
}

impl FullWebFetch {
    pub fn new(ctx: Arc<FetchContext>) -> Self {
        Self { ctx }
    }
}

impl Tool for FullWebFetch {
    fn definition(&self) -> ToolDef {
        ToolSpec::builder(FULL_WEB_FETCH)
            .title("Full Web Fetch (Markdown with Metadata)")
            .purpose("Fetch a web page and return its Markdown content headed by the page title")
            .when_to_use("When you want to read a page together with its title and fetch metadata")
            .when_not_to_use("When the page should be stored on disk")
            .parameters_for::<FetchArgs>()
            .example(
                "fullWebFetch(url=\"https://www.rust-lang.org/learn\")",
                "# Learn Rust\\n\\n...",
            )
            .output_format("'# <title>' heading, Markdown body, cache pointer")
            .disambiguate("The page should be saved", SAVE_WEB_FETCH, "it writes a Markdown file")
            .to_tool_def()
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            into_result(
                FULL_WEB_FETCH,
                fetch_page(&self.ctx, arguments, Layout::Titled).await,
            )
        })
    }
}
