//! Perplexity tools.
//!
//! | Tool | Name | Purpose |
//! |------|------|---------|
//! | [`AskPerplexity`] | `ask_perplexity` | Web-grounded chat answer |
//! | [`SearchPerplexity`] | `search_perplexity` | Raw ranked search results |
//! | [`AskPerplexityWithAssets`] | `ask_perplexity_with_assets` | Chat answer over images and documents |

use std::sync::Arc;

use futures::future::try_join_all;
use relay_core::ToolDef;
use relay_core::asset::process_asset;
use relay_core::cache::{ResponseCache, cache_key};
use relay_core::cost::calculate_cost;
use relay_core::error::ToolError;
use relay_core::pipeline::{Completion, cached_invoke};
use relay_core::providers::perplexity::{
    SONAR_DEEP_RESEARCH, SONAR_PRO, SearchQuery, SearchRequest, format_search_results,
};
use relay_core::providers::{PerplexityClient, ProviderAnswer};
use relay_core::tools::{Tool, ToolFuture, ToolResult, ToolSpec, parse_tool_args};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use super::{ASK_GEMINI_PRO, ASK_PERPLEXITY, ASK_PERPLEXITY_WITH_ASSETS, SEARCH_PERPLEXITY};

// ── Shared types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
pub enum SonarModel {
    #[default]
    #[serde(rename = "sonar-pro")]
    SonarPro,
    #[serde(rename = "sonar-deep-research")]
    SonarDeepResearch,
}

impl SonarModel {
    pub fn id(self) -> &'static str {
        match self {
            SonarModel::SonarPro => SONAR_PRO,
            SonarModel::SonarDeepResearch => SONAR_DEEP_RESEARCH,
        }
    }
}

fn answer_completion(model: &str, answer: ProviderAnswer, extra: Option<(&str, Value)>) -> Completion {
    let cost = calculate_cost(model, answer.usage.input_tokens, answer.usage.output_tokens);
    let mut structured = json!({
        "answer": answer.text,
        "model": model,
        "usage": answer.usage,
        "cost": cost,
    });
    if let (Some((key, value)), Some(obj)) = (extra, structured.as_object_mut()) {
        obj.insert(key.to_string(), value);
    }
    Completion::new(answer.text, structured).with_cost(cost)
}

// ── ask_perplexity ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AskPerplexityArgs {
    /// The question to answer.
    #[schemars(length(min = 1))]
    pub query: String,
    /// `sonar-pro` (default) or `sonar-deep-research` for exhaustive reports.
    #[serde(default)]
    pub model: SonarModel,
    /// Optional system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

pub fn ask_perplexity_def() -> ToolDef {
    ToolSpec::builder(ASK_PERPLEXITY)
        .title("Ask Perplexity (Web-Grounded Answers)")
        .purpose("Ask Perplexity Sonar a question answered from live web search")
        .when_to_use("For current events, documentation lookups, and questions that need citations")
        .when_not_to_use("When you only need links and snippets, not a written answer")
        .parameters_for::<AskPerplexityArgs>()
        .example(
            "ask_perplexity(query=\"What changed in Rust 1.85?\")",
            "Summary of the release with cited sources",
        )
        .output_format("Markdown answer")
        .disambiguate("You want raw result links to read yourself", SEARCH_PERPLEXITY, "it skips summarization")
        .disambiguate("The question needs long multi-step reasoning", ASK_GEMINI_PRO, "Pro reasons more deeply")
        .to_tool_def()
}

pub struct AskPerplexity {
    client: PerplexityClient,
    cache: Arc<ResponseCache>,
}

impl AskPerplexity {
    pub fn new(client: PerplexityClient, cache: Arc<ResponseCache>) -> Self {
        Self { client, cache }
    }

    async fn ask(&self, args: &AskPerplexityArgs) -> Result<Completion, ToolError> {
        let model = args.model.id();
        let answer = self
            .client
            .ask(model, &args.query, args.system_prompt.as_deref())
            .await?;
        Ok(answer_completion(model, answer, None))
    }
}

impl Tool for AskPerplexity {
    fn definition(&self) -> ToolDef {
        ask_perplexity_def()
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: AskPerplexityArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return ToolResult::failure(ASK_PERPLEXITY, &e),
            };
            if args.query.trim().is_empty() {
                return ToolResult::failure(ASK_PERPLEXITY, &ToolError::invalid("query must not be empty"));
            }
            let key = cache_key(
                "pplx",
                &[
                    Some(args.model.id()),
                    args.system_prompt.as_deref(),
                    Some(args.query.as_str()),
                ],
            );
            cached_invoke(ASK_PERPLEXITY, &self.cache, &key, || self.ask(&args)).await
        })
    }
}

// ── search_perplexity ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Recency {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Recency {
    fn as_str(self) -> &'static str {
        match self {
            Recency::Hour => "hour",
            Recency::Day => "day",
            Recency::Week => "week",
            Recency::Month => "month",
            Recency::Year => "year",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Web,
    Academic,
    Sec,
}

impl SearchMode {
    fn as_str(self) -> &'static str {
        match self {
            SearchMode::Web => "web",
            SearchMode::Academic => "academic",
            SearchMode::Sec => "sec",
        }
    }
}

fn default_max_results() -> u32 {
    10
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchPerplexityArgs {
    /// One query, or several queries searched together.
    pub query: SearchQuery,
    /// Number of results, 1 to 50. Default: 10.
    #[serde(default = "default_max_results")]
    #[schemars(range(min = 1, max = 50))]
    pub max_results: u32,
    /// Restrict results to these domains (prefix with `-` to exclude).
    #[serde(default)]
    pub search_domain_filter: Option<Vec<String>>,
    /// Only results published within this window.
    #[serde(default)]
    pub search_recency_filter: Option<Recency>,
    /// Only results published after this date (`MM/DD/YYYY`).
    #[serde(default)]
    pub search_after_date_filter: Option<String>,
    /// Only results published before this date (`MM/DD/YYYY`).
    #[serde(default)]
    pub search_before_date_filter: Option<String>,
    /// Index to search. Default: `web`.
    #[serde(default)]
    pub search_mode: SearchMode,
}

impl SearchPerplexityArgs {
    fn validate(&self) -> Result<(), ToolError> {
        if self.query.is_blank() {
            return Err(ToolError::invalid("query must not be empty"));
        }
        if !(1..=50).contains(&self.max_results) {
            return Err(ToolError::invalid(format!(
                "maxResults must be between 1 and 50, got {}",
                self.max_results
            )));
        }
        Ok(())
    }

    fn to_request(&self) -> SearchRequest {
        SearchRequest {
            query: self.query.clone(),
            max_results: self.max_results,
            search_domain_filter: self.search_domain_filter.clone().filter(|d| !d.is_empty()),
            search_recency_filter: self.search_recency_filter.map(|r| r.as_str().to_string()),
            search_after_date_filter: self.search_after_date_filter.clone(),
            search_before_date_filter: self.search_before_date_filter.clone(),
            search_mode: Some(self.search_mode.as_str().to_string()),
        }
    }
}

pub fn search_perplexity_def() -> ToolDef {
    ToolSpec::builder(SEARCH_PERPLEXITY)
        .title("Search Perplexity (Raw Web Results)")
        .purpose("Run a Perplexity web search and return ranked results without an LLM summary")
        .when_to_use("When you want titles, URLs, and snippets to pick sources from yourself")
        .when_not_to_use("When you want a synthesized answer")
        .parameters_for::<SearchPerplexityArgs>()
        .example(
            "search_perplexity(query=[\"tokio select\", \"tokio join\"], maxResults=5)",
            "## Search Results\n\n1. [tokio::select](https://docs.rs/...)\n   ...",
        )
        .output_format("`## Search Results` followed by a numbered list of links with snippets")
        .disambiguate("You need an answer, not links", ASK_PERPLEXITY, "it summarizes the results")
        .to_tool_def()
}

pub struct SearchPerplexity {
    client: PerplexityClient,
    cache: Arc<ResponseCache>,
}

impl SearchPerplexity {
    pub fn new(client: PerplexityClient, cache: Arc<ResponseCache>) -> Self {
        Self { client, cache }
    }

    async fn search(&self, args: &SearchPerplexityArgs) -> Result<Completion, ToolError> {
        let hits = self.client.search(&args.to_request()).await?;
        let structured = json!({
            "results": hits,
            "query": args.query,
            "resultCount": hits.len(),
        });
        Ok(Completion::new(format_search_results(&hits), structured))
    }
}

impl Tool for SearchPerplexity {
    fn definition(&self) -> ToolDef {
        search_perplexity_def()
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: SearchPerplexityArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return ToolResult::failure(SEARCH_PERPLEXITY, &e),
            };
            if let Err(e) = args.validate() {
                return ToolResult::failure(SEARCH_PERPLEXITY, &e);
            }
            let query = args.query.joined();
            let max_results = args.max_results.to_string();
            let domains = args.search_domain_filter.as_ref().map(|d| d.join(","));
            let key = cache_key(
                "pplx-search",
                &[
                    Some(query.as_str()),
                    Some(max_results.as_str()),
                    domains.as_deref(),
                    args.search_recency_filter.map(Recency::as_str),
                    args.search_after_date_filter.as_deref(),
                    args.search_before_date_filter.as_deref(),
                    Some(args.search_mode.as_str()),
                ],
            );
            cached_invoke(SEARCH_PERPLEXITY, &self.cache, &key, || self.search(&args)).await
        })
    }
}

// ── ask_perplexity_with_assets ─────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    Image,
    Document,
}

impl AttachmentType {
    fn as_str(self) -> &'static str {
        match self {
            AttachmentType::Image => "image",
            AttachmentType::Document => "document",
        }
    }

    fn fallback_mime(self) -> &'static str {
        match self {
            AttachmentType::Image => "image/jpeg",
            AttachmentType::Document => "application/pdf",
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssetInput {
    #[serde(rename = "type")]
    pub kind: AttachmentType,
    /// Mime type; guessed from the path or URL when omitted.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// File path, http(s) URL, or base64 content.
    pub data: String,
}

impl AssetInput {
    fn cache_fragment(&self) -> String {
        let head: String = self.data.chars().take(50).collect();
        format!(
            "{}:{}:{head}",
            self.kind.as_str(),
            self.mime_type.as_deref().unwrap_or("")
        )
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AskWithAssetsArgs {
    /// The question about the attached assets.
    #[schemars(length(min = 1))]
    pub query: String,
    #[serde(default)]
    pub model: SonarModel,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Images and documents to attach. Default: none.
    #[serde(default)]
    pub assets: Vec<AssetInput>,
}

pub fn ask_with_assets_def() -> ToolDef {
    ToolSpec::builder(ASK_PERPLEXITY_WITH_ASSETS)
        .title("Ask Perplexity with Assets (Multimodal)")
        .purpose("Ask Perplexity a question about attached images or documents, grounded with web search")
        .when_to_use("When the answer depends on a screenshot, photo, or PDF plus current web knowledge")
        .when_not_to_use("For video or audio; use analyze_media instead")
        .parameters_for::<AskWithAssetsArgs>()
        .example(
            "ask_perplexity_with_assets(query=\"What product is this?\", assets=[{\"type\":\"image\",\"data\":\"./photo.jpg\"}])",
            "Identification with sources",
        )
        .output_format("Markdown answer")
        .to_tool_def()
}

pub struct AskPerplexityWithAssets {
    client: PerplexityClient,
    cache: Arc<ResponseCache>,
}

impl AskPerplexityWithAssets {
    pub fn new(client: PerplexityClient, cache: Arc<ResponseCache>) -> Self {
        Self { client, cache }
    }

    async fn ask(&self, args: &AskWithAssetsArgs) -> Result<Completion, ToolError> {
        let assets = try_join_all(args.assets.iter().map(|a| async move {
            let asset = process_asset(&a.data, a.mime_type.as_deref()).await?;
            Ok::<_, ToolError>(asset.or_mime(a.kind.fallback_mime()))
        }))
        .await?;
        debug!("Resolved {} assets for Perplexity", assets.len());

        let model = args.model.id();
        let answer = self
            .client
            .ask_with_assets(model, &args.query, args.system_prompt.as_deref(), &assets)
            .await?;
        Ok(answer_completion(model, answer, Some(("assetCount", json!(assets.len())))))
    }
}

impl Tool for AskPerplexityWithAssets {
    fn definition(&self) -> ToolDef {
        ask_with_assets_def()
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: AskWithAssetsArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return ToolResult::failure(ASK_PERPLEXITY_WITH_ASSETS, &e),
            };
            if args.query.trim().is_empty() {
                return ToolResult::failure(
                    ASK_PERPLEXITY_WITH_ASSETS,
                    &ToolError::invalid("query must not be empty"),
                );
            }
            let asset_key = args
                .assets
                .iter()
                .map(AssetInput::cache_fragment)
                .collect::<Vec<_>>()
                .join("|");
            let key = cache_key(
                "pplx-assets",
                &[
                    Some(args.model.id()),
                    args.system_prompt.as_deref(),
                    Some(args.query.as_str()),
                    Some(asset_key.as_str()),
                ],
            );
            cached_invoke(ASK_PERPLEXITY_WITH_ASSETS, &self.cache, &key, || self.ask(&args)).await
        })
    }
}
