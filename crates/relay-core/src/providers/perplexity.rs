//! Perplexity chat completions and search client.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ProviderAnswer, RetryConfig, Usage, build_http_client, parse_body, retry_call, send};
use crate::asset::{AssetKind, ProcessedAsset};
use crate::error::ToolError;

pub const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";

pub const SONAR_PRO: &str = "sonar-pro";
pub const SONAR_DEEP_RESEARCH: &str = "sonar-deep-research";

/// Default retry budget for Perplexity calls.
pub const DEFAULT_RETRIES: u32 = 3;

const NO_RESPONSE: &str = "No response from Perplexity";

// ── Chat wire types ────────────────────────────────────────────────

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UrlRef {
    pub url: String,
}

/// One element of a multimodal user message.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatContent {
    Text { text: String },
    ImageUrl { image_url: UrlRef },
    PdfUrl { pdf_url: UrlRef },
    FileUrl { file_url: UrlRef },
}

impl ChatContent {
    pub fn text(text: impl Into<String>) -> Self {
        ChatContent::Text { text: text.into() }
    }

    /// Attach an asset: images as `image_url`, PDFs as `pdf_url`, anything
    /// else as `file_url`.
    pub fn attachment(asset: &ProcessedAsset) -> Self {
        let url = UrlRef { url: asset.to_url() };
        if asset.kind == AssetKind::Image {
            ChatContent::ImageUrl { image_url: url }
        } else if asset.mime_type.eq_ignore_ascii_case("application/pdf") {
            ChatContent::PdfUrl { pdf_url: url }
        } else {
            ChatContent::FileUrl { file_url: url }
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ChatContent>),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: MessageContent,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// A single-turn request with an optional system prompt.
    pub fn new(model: &str, system_prompt: Option<&str>, user: MessageContent) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(system.to_string()),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });
        Self {
            model: model.to_string(),
            messages,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<RawUsage>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
struct RawUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

// ── Search wire types ──────────────────────────────────────────────

/// One query or a batch of queries.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SearchQuery {
    One(String),
    Many(Vec<String>),
}

impl SearchQuery {
    /// All queries joined with `|`.
    pub fn joined(&self) -> String {
        match self {
            SearchQuery::One(q) => q.clone(),
            SearchQuery::Many(qs) => qs.join("|"),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            SearchQuery::One(q) => q.trim().is_empty(),
            SearchQuery::Many(qs) => qs.is_empty() || qs.iter().all(|q| q.trim().is_empty()),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: SearchQuery,
    pub max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_domain_filter: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_recency_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_after_date_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_before_date_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_mode: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawSearchHit>,
}

#[derive(Deserialize, Debug)]
struct RawSearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    snippet: String,
    date: Option<String>,
    last_updated: Option<String>,
}

/// One ranked search result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub date: Option<String>,
}

/// Render hits as a numbered Markdown list under a `## Search Results` heading.
pub fn format_search_results(hits: &[SearchHit]) -> String {
    let body = hits
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let date = h
                .date
                .as_deref()
                .map(|d| format!("\n   Date: {d}"))
                .unwrap_or_default();
            format!("{}. [{}]({})\n   {}{date}", i + 1, h.title, h.url, h.snippet)
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("## Search Results\n\n{body}")
}

// ── Client ─────────────────────────────────────────────────────────

/// Client for the Perplexity REST API.
#[derive(Debug, Clone)]
pub struct PerplexityClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    retry: RetryConfig,
}

impl PerplexityClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ToolError> {
        Ok(Self {
            client: build_http_client()?,
            api_key: api_key.into(),
            base_url: PERPLEXITY_BASE_URL.to_string(),
            retry: RetryConfig::with_retries(DEFAULT_RETRIES),
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

    /// Plain text question.
    pub async fn ask(
        &self,
        model: &str,
        query: &str,
        system_prompt: Option<&str>,
    ) -> Result<ProviderAnswer, ToolError> {
        let request = ChatRequest::new(model, system_prompt, MessageContent::Text(query.to_string()));
        self.chat(&request, query).await
    }

    /// Question with image/document attachments following the query text.
    pub async fn ask_with_assets(
        &self,
        model: &str,
        query: &str,
        system_prompt: Option<&str>,
        assets: &[ProcessedAsset],
    ) -> Result<ProviderAnswer, ToolError> {
        let mut parts = Vec::with_capacity(assets.len() + 1);
        parts.push(ChatContent::text(query));
        parts.extend(assets.iter().map(ChatContent::attachment));
        let request = ChatRequest::new(model, system_prompt, MessageContent::Parts(parts));
        self.chat(&request, query).await
    }

    pub async fn chat(&self, request: &ChatRequest, prompt: &str) -> Result<ProviderAnswer, ToolError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            "Perplexity chat request: model={}, messages={}",
            request.model,
            request.messages.len()
        );
        let body = retry_call(&self.retry, "Perplexity chat", || {
            send(
                self.client.post(&url).bearer_auth(&self.api_key).json(request),
                "Perplexity chat",
            )
        })
        .await
        .map_err(|e| provider_error("chat", &e))?;

        let parsed: ChatResponse = parse_body(&body).map_err(|e| provider_error("chat", &e))?;
        Ok(answer_from(parsed, prompt))
    }

    /// Ranked web search without summarization.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, ToolError> {
        let url = format!("{}/search", self.base_url);
        let body = retry_call(&self.retry, "Perplexity search", || {
            send(
                self.client.post(&url).bearer_auth(&self.api_key).json(request),
                "Perplexity search",
            )
        })
        .await
        .map_err(|e| provider_error("search", &e))?;

        let parsed: SearchResponse = parse_body(&body).map_err(|e| provider_error("search", &e))?;
        debug!("Perplexity search returned {} results", parsed.results.len());
        Ok(parsed
            .results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r.snippet,
                date: r.date.or(r.last_updated),
            })
            .collect())
    }
}

fn provider_error(operation: &'static str, e: &ToolError) -> ToolError {
    ToolError::Provider {
        provider: "Perplexity",
        operation,
        message: e.to_string(),
    }
}

fn answer_from(parsed: ChatResponse, prompt: &str) -> ProviderAnswer {
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content);
    let text = match content {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Array(parts)) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join(""),
        _ => NO_RESPONSE.to_string(),
    };
    let usage = match parsed.usage {
        Some(u) => Usage {
            input_tokens: u.prompt_tokens.unwrap_or(0),
            output_tokens: u.completion_tokens.unwrap_or(0),
        },
        None => Usage::estimated(prompt, &text),
    };
    ProviderAnswer { text, usage }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> PerplexityClient {
        PerplexityClient::new("pplx-key")
            .unwrap()
            .with_base_url(server.uri())
            .with_retry(RetryConfig {
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                ..RetryConfig::with_retries(DEFAULT_RETRIES)
            })
    }

    fn asset(mime: &str, payload: &str, is_remote: bool) -> ProcessedAsset {
        ProcessedAsset {
            kind: AssetKind::for_mime(mime),
            mime_type: mime.into(),
            payload: payload.into(),
            is_remote,
        }
    }

    #[test]
    fn attachments_map_to_content_types() {
        let img = serde_json::to_value(ChatContent::attachment(&asset(
            "image/png",
            "https://x.test/a.png",
            true,
        )))
        .unwrap();
        assert_eq!(img, json!({"type": "image_url", "image_url": {"url": "https://x.test/a.png"}}));

        let pdf = serde_json::to_value(ChatContent::attachment(&asset("application/pdf", "JVBER", false)))
            .unwrap();
        assert_eq!(
            pdf,
            json!({"type": "pdf_url", "pdf_url": {"url": "data:application/pdf;base64,JVBER"}})
        );

        let doc = serde_json::to_value(ChatContent::attachment(&asset("text/csv", "YSxi", false)))
            .unwrap();
        assert_eq!(doc["type"], "file_url");
    }

    #[test]
    fn search_results_format() {
        let hits = vec![
            SearchHit {
                title: "One".into(),
                url: "https://one.test".into(),
                snippet: "first".into(),
                date: Some("2025-01-02".into()),
            },
            SearchHit {
                title: "Two".into(),
                url: "https://two.test".into(),
                snippet: "second".into(),
                date: None,
            },
        ];
        assert_eq!(
            format_search_results(&hits),
            "## Search Results\n\n1. [One](https://one.test)\n   first\n   Date: 2025-01-02\n\n2. [Two](https://two.test)\n   second"
        );
    }

    #[test]
    fn search_query_join() {
        assert_eq!(SearchQuery::One("a".into()).joined(), "a");
        assert_eq!(SearchQuery::Many(vec!["a".into(), "b".into()]).joined(), "a|b");
        assert!(SearchQuery::Many(vec![]).is_blank());
    }

    #[tokio::test]
    async fn ask_sends_system_and_user_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer pplx-key"))
            .and(body_partial_json(json!({
                "model": "sonar-pro",
                "messages": [
                    {"role": "system", "content": "cite sources"},
                    {"role": "user", "content": "what is tokio?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "An async runtime."}}],
                "usage": {"prompt_tokens": 1000, "completion_tokens": 500}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = client(&server)
            .ask(SONAR_PRO, "what is tokio?", Some("cite sources"))
            .await
            .unwrap();
        assert_eq!(answer.text, "An async runtime.");
        assert_eq!(answer.usage.input_tokens, 1000);
        assert_eq!(answer.usage.output_tokens, 500);
    }

    #[tokio::test]
    async fn rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": [{"type": "text", "text": "ok"}]}}]
            })))
            .mount(&server)
            .await;

        let answer = client(&server).ask(SONAR_PRO, "q", None).await.unwrap();
        assert_eq!(answer.text, "ok");
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).ask(SONAR_PRO, "q", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Perplexity chat failed: HTTP 401: Unauthorized");
    }

    #[tokio::test]
    async fn search_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(json!({
                "query": ["rust", "tokio"],
                "max_results": 5,
                "search_mode": "academic"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"title": "T", "url": "https://t.test", "snippet": "s", "last_updated": "2025-03-01"}
                ]
            })))
            .mount(&server)
            .await;

        let hits = client(&server)
            .search(&SearchRequest {
                query: SearchQuery::Many(vec!["rust".into(), "tokio".into()]),
                max_results: 5,
                search_domain_filter: None,
                search_recency_filter: None,
                search_after_date_filter: None,
                search_before_date_filter: None,
                search_mode: Some("academic".into()),
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].date.as_deref(), Some("2025-03-01"));
    }
}
