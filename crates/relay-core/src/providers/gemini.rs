//! Gemini `generateContent` client.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ProviderAnswer, RetryConfig, Usage, build_http_client, parse_body, retry_call, send};
use crate::asset::ProcessedAsset;
use crate::error::ToolError;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub const GEMINI_PRO: &str = "gemini-3-pro-preview";
pub const GEMINI_FLASH: &str = "gemini-3-flash-preview";

const TEMPERATURE: f64 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 2048;
const NO_RESPONSE: &str = "No response from Gemini";

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<serde_json::Value>,
    pub generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One part of a message. Exactly one field is set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_data: Option<FileData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// A media part: remote assets by reference, everything else inline.
    pub fn media(asset: &ProcessedAsset) -> Self {
        if asset.is_remote {
            Self {
                file_data: Some(FileData {
                    mime_type: asset.mime_type.clone(),
                    file_uri: asset.payload.clone(),
                }),
                ..Default::default()
            }
        } else {
            Self {
                inline_data: Some(InlineData {
                    mime_type: asset.mime_type.clone(),
                    data: asset.payload.clone(),
                }),
                ..Default::default()
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize, Debug, Default)]
struct GroundingChunk {
    web: Option<WebSource>,
}

/// A web page Gemini grounded its answer on.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct WebSource {
    pub uri: Option<String>,
    pub title: Option<String>,
}

/// Render grounding sources as a Markdown list appended to the answer.
///
/// Sources without a URI are skipped; a missing title falls back to the URI.
/// Returns an empty string when nothing remains.
pub fn format_sources(sources: &[WebSource]) -> String {
    let lines: Vec<String> = sources
        .iter()
        .filter_map(|s| {
            let uri = s.uri.as_deref()?;
            let title = s.title.as_deref().unwrap_or(uri);
            Some(format!("- [{title}]({uri})"))
        })
        .collect();
    if lines.is_empty() {
        String::new()
    } else {
        format!("\n\n**Sources:**\n{}", lines.join("\n"))
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// Client for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    retry: RetryConfig,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ToolError> {
        Ok(Self {
            client: build_http_client()?,
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Answer a text query, optionally grounded with Google Search.
    pub async fn ask(
        &self,
        model: &str,
        query: &str,
        system_prompt: Option<&str>,
        grounding: bool,
    ) -> Result<ProviderAnswer, ToolError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part::text(query)],
            }],
            system_instruction: system_prompt
                .filter(|s| !s.trim().is_empty())
                .map(|s| Content {
                    role: None,
                    parts: vec![Part::text(s)],
                }),
            tools: if grounding {
                vec![serde_json::json!({ "googleSearch": {} })]
            } else {
                Vec::new()
            },
            generation_config: GenerationConfig::default(),
        };
        self.generate(model, &request, query, grounding).await
    }

    /// Answer a prompt about a single media asset.
    pub async fn analyze(
        &self,
        model: &str,
        prompt: &str,
        asset: &ProcessedAsset,
    ) -> Result<ProviderAnswer, ToolError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part::media(asset), Part::text(prompt)],
            }],
            system_instruction: None,
            tools: Vec::new(),
            generation_config: GenerationConfig::default(),
        };
        self.generate(model, &request, prompt, false).await
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
        prompt: &str,
        with_sources: bool,
    ) -> Result<ProviderAnswer, ToolError> {
        let url = format!("{}/v1beta/models/{model}:generateContent", self.base_url);
        debug!(
            "Gemini request: model={model}, parts={}, grounding={}",
            request.contents.iter().map(|c| c.parts.len()).sum::<usize>(),
            !request.tools.is_empty(),
        );

        let body = retry_call(&self.retry, "Gemini", || {
            send(
                self.client
                    .post(&url)
                    .header("x-goog-api-key", &self.api_key)
                    .json(request),
                "Gemini",
            )
        })
        .await
        .map_err(|e| provider_error(&e))?;

        let parsed: GenerateResponse = parse_body(&body).map_err(|e| provider_error(&e))?;
        Ok(answer_from(parsed, prompt, with_sources))
    }
}

fn provider_error(e: &ToolError) -> ToolError {
    ToolError::Provider {
        provider: "Gemini",
        operation: "generateContent",
        message: e.to_string(),
    }
}

fn answer_from(parsed: GenerateResponse, prompt: &str, with_sources: bool) -> ProviderAnswer {
    let candidate = parsed.candidates.into_iter().next().unwrap_or_default();
    let text: String = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    let text = if text.is_empty() {
        NO_RESPONSE.to_string()
    } else {
        text
    };

    let usage = match parsed.usage_metadata {
        Some(u) => Usage {
            input_tokens: u.prompt_token_count.unwrap_or(0),
            output_tokens: u.candidates_token_count.unwrap_or(0),
        },
        None => Usage::estimated(prompt, &text),
    };

    let sources = if with_sources {
        let web: Vec<WebSource> = candidate
            .grounding_metadata
            .map(|g| g.grounding_chunks.into_iter().filter_map(|c| c.web).collect())
            .unwrap_or_default();
        format_sources(&web)
    } else {
        String::new()
    };

    ProviderAnswer {
        text: text + &sources,
        usage,
    }
}
