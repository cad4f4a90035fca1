//! Gemini tools.
//!
//! | Tool | Name | Purpose |
//! |------|------|---------|
//! | [`AskGemini`] (Pro) | `ask_gemini_pro` | Grounded answers from Gemini 3 Pro |
//! | [`AskGemini`] (Flash) | `ask_gemini_flash` | Grounded answers from Gemini 3 Flash |
//! | [`AnalyzeMedia`] | `analyze_media` | Image, video, audio, or document analysis |

use std::sync::Arc;

use relay_core::ToolDef;
use relay_core::asset::{AssetKind, ProcessedAsset, process_asset};
use relay_core::cache::{ResponseCache, cache_key};
use relay_core::cost::calculate_cost;
use relay_core::error::ToolError;
use relay_core::pipeline::{Completion, cached_invoke};
use relay_core::providers::GeminiClient;
use relay_core::providers::gemini::{GEMINI_FLASH, GEMINI_PRO};
use relay_core::tools::{Tool, ToolFuture, ToolResult, ToolSpec, parse_tool_args};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ANALYZE_MEDIA, ASK_GEMINI_FLASH, ASK_GEMINI_PRO, ASK_PERPLEXITY};

// ── Shared types ───────────────────────────────────────────────────

/// Which Gemini model a tool uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GeminiModel {
    #[default]
    Flash,
    Pro,
}

impl GeminiModel {
    pub fn id(self) -> &'static str {
        match self {
            GeminiModel::Flash => GEMINI_FLASH,
            GeminiModel::Pro => GEMINI_PRO,
        }
    }

    fn label(self) -> &'static str {
        match self {
            GeminiModel::Flash => "flash",
            GeminiModel::Pro => "pro",
        }
    }
}

// ── ask_gemini_pro / ask_gemini_flash ──────────────────────────────

/// Arguments for `ask_gemini_pro` and `ask_gemini_flash`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AskGeminiArgs {
    /// The question to answer.
    #[schemars(length(min = 1))]
    pub query: String,
    /// Optional system instruction.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Answer from model knowledge only, without Google Search grounding.
    #[serde(default)]
    pub disable_web_search: bool,
}

pub fn ask_gemini_def(model: GeminiModel) -> ToolDef {
    match model {
        GeminiModel::Pro => ToolSpec::builder(ASK_GEMINI_PRO)
            .title("Ask Gemini 3 Pro with web research")
            .purpose("Ask Gemini 3 Pro a question, grounded with Google Search by default")
            .when_to_use("For complex reasoning or research questions that benefit from current web sources")
            .when_not_to_use("For quick factual lookups where cost matters more than depth")
            .parameters_for::<AskGeminiArgs>()
            .example(
                "ask_gemini_pro(query=\"Compare tokio and async-std scheduling\")",
                "Answer followed by **Sources:** links",
            )
            .output_format("Markdown answer with a **Sources:** list when grounded")
            .disambiguate("A cheap quick answer is enough", ASK_GEMINI_FLASH, "it costs a fraction of Pro")
            .to_tool_def(),
        GeminiModel::Flash => ToolSpec::builder(ASK_GEMINI_FLASH)
            .title("Ask Gemini 3 Flash (Cost-Efficient)")
            .purpose("Ask Gemini 3 Flash a question, grounded with Google Search by default")
            .when_to_use("For fast, inexpensive answers and simple lookups")
            .when_not_to_use("For multi-step reasoning over many sources")
            .parameters_for::<AskGeminiArgs>()
            .example(
                "ask_gemini_flash(query=\"Latest stable Rust version\", disable_web_search=false)",
                "Answer followed by **Sources:** links",
            )
            .output_format("Markdown answer with a **Sources:** list when grounded")
            .disambiguate("Answers must cite web results", ASK_PERPLEXITY, "Perplexity is search-first")
            .to_tool_def(),
    }
}

/// Text question to a Gemini model.
pub struct AskGemini {
    model: GeminiModel,
    client: GeminiClient,
    cache: Arc<ResponseCache>,
}

impl AskGemini {
    pub fn pro(client: GeminiClient, cache: Arc<ResponseCache>) -> Self {
        Self {
            model: GeminiModel::Pro,
            client,
            cache,
        }
    }

    pub fn flash(client: GeminiClient, cache: Arc<ResponseCache>) -> Self {
        Self {
            model: GeminiModel::Flash,
            client,
            cache,
        }
    }

    fn tool_name(&self) -> &'static str {
        match self.model {
            GeminiModel::Pro => ASK_GEMINI_PRO,
            GeminiModel::Flash => ASK_GEMINI_FLASH,
        }
    }

    async fn ask(&self, args: &AskGeminiArgs) -> Result<Completion, ToolError> {
        let model = self.model.id();
        let answer = self
            .client
            .ask(
                model,
                &args.query,
                args.system_prompt.as_deref(),
                !args.disable_web_search,
            )
            .await?;
        let cost = calculate_cost(model, answer.usage.input_tokens, answer.usage.output_tokens);
        let structured = json!({
            "answer": answer.text,
            "model": model,
            "usage": answer.usage,
            "cost": cost,
        });
        Ok(Completion::new(answer.text, structured).with_cost(cost))
    }
}

impl Tool for AskGemini {
    fn definition(&self) -> ToolDef {
        ask_gemini_def(self.model)
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let name = self.tool_name();
            let args: AskGeminiArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return ToolResult::failure(name, &e),
            };
            if args.query.trim().is_empty() {
                return ToolResult::failure(name, &ToolError::invalid("query must not be empty"));
            }
            let disable = args.disable_web_search.to_string();
            let prefix = format!("gemini-{}", self.model.label());
            let key = cache_key(
                &prefix,
                &[
                    Some(disable.as_str()),
                    args.system_prompt.as_deref(),
                    Some(args.query.as_str()),
                ],
            );
            cached_invoke(name, &self.cache, &key, || self.ask(&args)).await
        })
    }
}

// ── analyze_media ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaType {
    fn as_str(self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Document => "document",
        }
    }

    /// Mime type assumed when none is declared or guessable.
    pub fn fallback_mime(self) -> &'static str {
        match self {
            MediaType::Image => "image/jpeg",
            MediaType::Video => "video/mp4",
            MediaType::Audio => "audio/mpeg",
            MediaType::Document => "application/pdf",
        }
    }
}

/// Arguments for `analyze_media`.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnalyzeMediaArgs {
    /// What to analyze or extract.
    #[schemars(length(min = 1))]
    pub prompt: String,
    /// Kind of media.
    pub media_type: MediaType,
    /// Mime type, e.g. `image/png`. Guessed from the path or URL when omitted.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// File path (absolute, `./` or `../`), http(s) URL, or base64 content.
    #[serde(default)]
    pub data: Option<String>,
    /// Remote file URI, used when `data` is absent.
    #[serde(default)]
    pub uri: Option<String>,
    /// `flash` (default) for cost efficiency, `pro` for harder reasoning.
    #[serde(default)]
    pub model: GeminiModel,
}

impl AnalyzeMediaArgs {
    fn source(&self) -> Option<&str> {
        self.data
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| self.uri.as_deref().filter(|u| !u.trim().is_empty()))
    }
}

pub fn analyze_media_def() -> ToolDef {
    ToolSpec::builder(ANALYZE_MEDIA)
        .title("Analyze Image, Video, Audio, or Document")
        .purpose("Analyze an image, video, audio clip, or document with Gemini")
        .when_to_use(
            "When you need multimodal analysis. Accepts file paths (absolute or relative), URLs, \
             and inline base64. Flash for cost efficiency, Pro for complex reasoning",
        )
        .when_not_to_use("When the content is plain text you can read directly")
        .parameters_for::<AnalyzeMediaArgs>()
        .example(
            "analyze_media(prompt=\"Describe the chart\", mediaType=\"image\", data=\"./chart.png\")",
            "Description of the chart",
        )
        .output_format("Analysis text")
        .to_tool_def()
}

/// Multimodal analysis with Gemini.
pub struct AnalyzeMedia {
    client: GeminiClient,
    cache: Arc<ResponseCache>,
}

impl AnalyzeMedia {
    pub fn new(client: GeminiClient, cache: Arc<ResponseCache>) -> Self {
        Self { client, cache }
    }

    async fn resolve_asset(args: &AnalyzeMediaArgs, source: &str) -> Result<ProcessedAsset, ToolError> {
        let declared = args.mime_type.as_deref();
        let from_uri = args.data.as_deref().filter(|d| !d.trim().is_empty()).is_none();
        let asset = if from_uri && !source.starts_with("http://") && !source.starts_with("https://") {
            // Provider-side URIs (e.g. gs://) are passed through untouched.
            let mime = declared.unwrap_or(args.media_type.fallback_mime()).to_string();
            ProcessedAsset {
                kind: AssetKind::for_mime(&mime),
                mime_type: mime,
                payload: source.to_string(),
                is_remote: true,
            }
        } else {
            process_asset(source, declared).await?
        };
        Ok(asset.or_mime(args.media_type.fallback_mime()))
    }

    async fn analyze(&self, args: &AnalyzeMediaArgs, source: &str) -> Result<Completion, ToolError> {
        let asset = Self::resolve_asset(args, source).await?;
        let model = args.model.id();
        let answer = self.client.analyze(model, &args.prompt, &asset).await?;
        let cost = calculate_cost(model, answer.usage.input_tokens, answer.usage.output_tokens);
        let structured = json!({
            "analysis": answer.text,
            "model": model,
            "mediaType": args.media_type,
            "usage": answer.usage,
            "cost": cost,
        });
        Ok(Completion::new(answer.text, structured).with_cost(cost))
    }
}

impl Tool for AnalyzeMedia {
    fn definition(&self) -> ToolDef {
        analyze_media_def()
    }

    fn execute(&self, arguments: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let args: AnalyzeMediaArgs = match parse_tool_args(arguments) {
                Ok(a) => a,
                Err(e) => return ToolResult::failure(ANALYZE_MEDIA, &e),
            };
            let Some(source) = args.source().map(str::to_string) else {
                return ToolResult::failure(
                    ANALYZE_MEDIA,
                    &ToolError::invalid("Either data or uri parameter is required"),
                );
            };
            let prompt_head: String = args.prompt.chars().take(50).collect();
            let length = source.len().to_string();
            let key = cache_key(
                "vision",
                &[
                    Some(args.model.label()),
                    Some(args.media_type.as_str()),
                    Some(prompt_head.as_str()),
                    Some(source.as_str()),
                    Some(length.as_str()),
                ],
            );
            cached_invoke(ANALYZE_MEDIA, &self.cache, &key, || self.analyze(&args, &source)).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_defaults_to_flash() {
        let args: AnalyzeMediaArgs = serde_json::from_value(json!({
            "prompt": "describe",
            "mediaType": "image",
            "data": "./a.png"
        }))
        .unwrap();
        assert_eq!(args.model, GeminiModel::Flash);
        assert_eq!(args.model.id(), "gemini-3-flash-preview");
    }

    #[test]
    fn data_wins_over_uri() {
        let args: AnalyzeMediaArgs = serde_json::from_value(json!({
            "prompt": "p",
            "mediaType": "video",
            "data": "https://x.test/v.mp4",
            "uri": "gs://bucket/v.mp4"
        }))
        .unwrap();
        assert_eq!(args.source(), Some("https://x.test/v.mp4"));
    }

    #[test]
    fn blank_sources_count_as_missing() {
        let args: AnalyzeMediaArgs = serde_json::from_value(json!({
            "prompt": "p",
            "mediaType": "audio",
            "data": "  "
        }))
        .unwrap();
        assert_eq!(args.source(), None);
    }

    #[tokio::test]
    async fn provider_uris_pass_through() {
        let args: AnalyzeMediaArgs = serde_json::from_value(json!({
            "prompt": "p",
            "mediaType": "video",
            "uri": "gs://bucket/clip"
        }))
        .unwrap();
        let asset = AnalyzeMedia::resolve_asset(&args, "gs://bucket/clip").await.unwrap();
        assert!(asset.is_remote);
        assert_eq!(asset.mime_type, "video/mp4");
    }

    #[test]
    fn definitions_carry_titles() {
        assert_eq!(
            ask_gemini_def(GeminiModel::Pro).title.as_deref(),
            Some("Ask Gemini 3 Pro with web research")
        );
        assert_eq!(ask_gemini_def(GeminiModel::Flash).name, "ask_gemini_flash");
        let required = analyze_media_def().input_schema["required"].clone();
        let required = required.as_array().unwrap();
        assert!(required.contains(&json!("mediaType")));
        assert!(required.contains(&json!("prompt")));
        assert!(!required.contains(&json!("model")));
    }
}
