//! `askWebFetch`: fetch a page and have Perplexity answer a question about it.

use std::sync::Arc;

use relay_core::ToolDef;
use relay_core::cache::cache_key;
use relay_core::cost::calculate_cost;
use relay_core::error::ToolError;
use relay_core::pipeline::{Completion, cached_invoke};
use relay_core::providers::PerplexityClient;
use relay_core::providers::perplexity::SONAR_PRO;
use relay_core::tools::{Tool, ToolFuture, ToolResult, ToolSpec, parse_tool_args};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use super::{ASK_WEB_FETCH, FULL_WEB_FETCH, FetchContext};
use crate::dispatch::{cache_message, cache_path, url_digest};
use crate::options::{FetchOptions, FetchOptionsInput};
use crate::validate::validate_url;

/// Most page characters forwarded to the model.
pub const MAX_ANALYSIS_CHARS: usize = 80_000;
pub const ANALYSIS_TRUNCATION_NOTE: &str = "\n\n[Content truncated for API analysis...]";

pub const DEFAULT_ASK_PROMPT: &str = "Extract and summarize the key information from this webpage \
     content. Provide extensive key points covering the main topics, important details, and \
     actionable information.";

const ANALYST_SYSTEM_PROMPT: &str = "You are an expert analyst. Analyze the provided webpage \
     content and respond to the user's query. Be thorough, accurate, and cite specific \
     information from the content.";

/// Arguments for `askWebFetch`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AskArgs {
    /// The http(s) URL to analyze.
    pub url: String,
    /// Question or instruction about the page. Blank asks for a summary.
    #[serde(default)]
    pub prompt: String,
    /// Fetch options; unset fields use the server defaults.
    #[serde(default)]
    pub options: Option<FetchOptionsInput>,
}

/// Cap page content before sending it to the model.
pub fn cap_for_analysis(content: &str) -> String {
    match content.char_indices().nth(MAX_ANALYSIS_CHARS) {
        None => content.to_string(),
        Some((byte_end, _)) => format!(
            "{}{ANALYSIS_TRUNCATION_NOTE}",
            content.get(..byte_end).unwrap_or_default()
        ),
    }
}

/// Response-cache key for one question about one page.
fn ask_key(url: &Url, prompt: &str, max_chars: usize) -> String {
    let digest = url_digest(url.as_str());
    let max_chars = max_chars.to_string();
    cache_key(
        "ask-webfetch",
        &[Some(digest.as_str()), Some(prompt), Some(max_chars.as_str())],
    )
}

pub fn ask_web_fetch_def() -> ToolDef {
    ToolSpec::builder(ASK_WEB_FETCH)
        .title("Ask Web Fetch (AI-Powered Analysis)")
        .purpose("Fetch a web page and answer a question about its content with Perplexity sonar-pro")
        .when_to_use(
            "When you need a summary or a targeted answer from a long page rather than the \
             page itself. Requires PERPLEXITY_API_KEY",
        )
        .when_not_to_use("When you need the exact page text")
        .parameters_for::<AskArgs>()
        .example(
            "askWebFetch(url=\"https://blog.rust-lang.org/\", prompt=\"What was announced most recently?\")",
            "Analysis text followed by a cache pointer",
        )
        .output_format("Model answer; structured content includes cost")
        .disambiguate("Need the raw page", FULL_WEB_FETCH, "no model call is made")
        .to_tool_def()
}

/// Perplexity-backed page analysis.
pub struct AskWebFetch {
    ctx: Arc<FetchContext>,
    client: PerplexityClient,
}

struct Prepared {
    url: Url,
    prompt: String,
    options: FetchOptions,
    key: String,
}

impl AskWebFetch {
    pub fn new(ctx: Arc<FetchContext>, client: PerplexityClient) -> Self {
        Self { ctx, client }
    }

    fn prepare(&self, arguments: Value) -> Result<Prepared, ToolError> {
        let args: AskArgs = parse_tool_args(arguments)?;
        let url = validate_url(&args.url)?;
        let options = self.ctx.options(args.options)?;
        let prompt = if args.prompt.trim().is_empty() {
            DEFAULT_ASK_PROMPT.to_string()
        } else {
            args.prompt
        };
        let key = ask_key(&url, &prompt, options.max_chars);
        Ok(Prepared {
            url,
            prompt,
            options,
            key,
        })
    }

    async fn analyze(&self, p: &Prepared) -> Result<Completion, ToolError> {
        let page = self.ctx.dispatcher.fetch(&p.url, &p.options).await?;
        let content = cap_for_analysis(&page.content);
        let user = format!(
            "URL: {}\n\nContent:\n\n{content}\n\nQuery: {}",
            page.url, p.prompt
        );
        let answer = self
            .client
            .ask(SONAR_PRO, &user, Some(ANALYST_SYSTEM_PROMPT))
            .await?;
        let cost = calculate_cost(SONAR_PRO, answer.usage.input_tokens, answer.usage.output_tokens);

        let cache_path = cache_path(&p.options.cache_dir, p.url.as_str());
        let text = format!("{}{}", answer.text, cache_message(&cache_path));
        let structured = json!({
            "url": page.url,
            "analysis": answer.text,
            "fetchTime": page.fetched_at,
            "model": SONAR_PRO,
            "cachePath": cache_path.display().to_string(),
            "cost": cost,
        });
        Ok(Completion::new(text, structured).with_cost(cost))
    }
}

impl Tool for AskWebFetch {
    fn definition(&self) -> ToolDef {
        ask_web_fetch_def()
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let prepared = match self.prepare(arguments) {
                Ok(p) => p,
                Err(e) => return ToolResult::failure(ASK_WEB_FETCH, &e),
            };
            cached_invoke(ASK_WEB_FETCH, self.ctx.cache(), &prepared.key, || {
                self.analyze(&prepared)
            })
            .await
        })
    }
}
