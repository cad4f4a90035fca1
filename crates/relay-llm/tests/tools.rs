//! Provider tools end to end against mocked Gemini and Perplexity APIs.

use std::sync::Arc;

use relay_core::cache::ResponseCache;
use relay_core::providers::{GeminiClient, PerplexityClient, RetryConfig};
use relay_core::tools::ToolSet;
use relay_llm::LlmConfig;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const FLASH_PATH: &str = "/v1beta/models/gemini-3-flash-preview:generateContent";
const PRO_PATH: &str = "/v1beta/models/gemini-3-pro-preview:generateContent";

fn tools_for(server: &MockServer) -> ToolSet {
    let gemini = GeminiClient::new("g-key").unwrap().with_base_url(server.uri());
    let perplexity = PerplexityClient::new("p-key")
        .unwrap()
        .with_base_url(server.uri())
        .with_retry(RetryConfig::default());
    LlmConfig::default().build_tool_set_with(
        Some(gemini),
        Some(perplexity),
        Arc::new(ResponseCache::default()),
    )
}

fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "groundingMetadata": {
                "groundingChunks": [
                    { "web": { "uri": "https://blog.rust-lang.org/", "title": "Rust Blog" } }
                ]
            }
        }],
        "usageMetadata": { "promptTokenCount": 1000, "candidatesTokenCount": 200 }
    })
}

fn chat_reply(text: &str) -> Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }],
        "usage": { "prompt_tokens": 1000, "completion_tokens": 500 }
    })
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r: &Request| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

fn approx(value: &Value, expected: f64) -> bool {
    value.as_f64().is_some_and(|v| (v - expected).abs() < 1e-9)
}

// ── Gemini ─────────────────────────────────────────────────────────

#[tokio::test]
async fn gemini_flash_answers_with_sources_and_caches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FLASH_PATH))
        .and(header("x-goog-api-key", "g-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Rust 1.85 shipped.")))
        .expect(1)
        .mount(&server)
        .await;

    let tools = tools_for(&server);
    let args = json!({ "query": "latest rust release" });
    let first = tools.execute("ask_gemini_flash", args.clone()).await;
    assert!(!first.is_error, "{}", first.text());
    assert_eq!(
        first.text(),
        "Rust 1.85 shipped.\n\n**Sources:**\n- [Rust Blog](https://blog.rust-lang.org/)"
    );
    let structured = first.structured_content.clone().unwrap();
    assert_eq!(structured["model"], "gemini-3-flash-preview");
    assert_eq!(structured["usage"]["inputTokens"], 1000);
    assert!(approx(&structured["cost"]["estimatedCostUsd"], 0.0011));

    let second = tools.execute("ask_gemini_flash", args).await;
    assert_eq!(second.text(), first.text());
    assert_eq!(second.structured_content.unwrap()["cached"], true);

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["tools"], json!([{ "googleSearch": {} }]));
}

#[tokio::test]
async fn disabling_web_search_drops_grounding() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("From memory.")))
        .mount(&server)
        .await;

    let tools = tools_for(&server);
    let result = tools
        .execute(
            "ask_gemini_pro",
            json!({
                "query": "explain ownership",
                "system_prompt": "Be brief.",
                "disable_web_search": true
            }),
        )
        .await;
    assert_eq!(result.text(), "From memory.");

    let bodies = request_bodies(&server).await;
    assert!(bodies[0].get("tools").is_none());
    assert_eq!(bodies[0]["systemInstruction"]["parts"][0]["text"], "Be brief.");
}

#[tokio::test]
async fn analyze_media_sends_local_files_inline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FLASH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("A red square.")))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("square.png");
    std::fs::write(&file, b"png-bytes").unwrap();

    let tools = tools_for(&server);
    let result = tools
        .execute(
            "analyze_media",
            json!({
                "prompt": "What is this?",
                "mediaType": "image",
                "data": file.to_string_lossy()
            }),
        )
        .await;
    assert!(!result.is_error, "{}", result.text());
    assert_eq!(result.text(), "A red square.");
    assert_eq!(result.structured_content.unwrap()["mediaType"], "image");

    let bodies = request_bodies(&server).await;
    let parts = &bodies[0]["contents"][0]["parts"];
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
    assert_eq!(parts[0]["inlineData"]["data"], "cG5nLWJ5dGVz");
    assert_eq!(parts[1]["text"], "What is this?");
}

#[tokio::test]
async fn analyze_media_references_remote_files() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("A talk.")))
        .mount(&server)
        .await;

    let tools = tools_for(&server);
    let result = tools
        .execute(
            "analyze_media",
            json!({
                "prompt": "Summarize",
                "mediaType": "video",
                "uri": "https://cdn.example.com/talk.mp4?sig=1",
                "model": "pro"
            }),
        )
        .await;
    assert!(!result.is_error, "{}", result.text());

    let bodies = request_bodies(&server).await;
    let media = &bodies[0]["contents"][0]["parts"][0]["fileData"];
    assert_eq!(media["fileUri"], "https://cdn.example.com/talk.mp4?sig=1");
    assert_eq!(media["mimeType"], "video/mp4");
}

#[tokio::test]
async fn analyze_media_needs_data_or_uri() {
    let server = MockServer::start().await;
    let tools = tools_for(&server);
    let result = tools
        .execute("analyze_media", json!({ "prompt": "p", "mediaType": "audio" }))
        .await;
    assert!(result.is_error);
    assert_eq!(
        result.text(),
        "analyze_media failed: Either data or uri parameter is required"
    );
    assert!(request_bodies(&server).await.is_empty());
}

#[tokio::test]
async fn unreadable_local_file_is_reported() {
    let server = MockServer::start().await;
    let tools = tools_for(&server);
    let result = tools
        .execute(
            "analyze_media",
            json!({ "prompt": "p", "mediaType": "document", "data": "./definitely/missing.pdf" }),
        )
        .await;
    assert!(result.is_error);
    assert!(result.text().contains("failed to read"), "{}", result.text());
}

// ── Perplexity ─────────────────────────────────────────────────────

#[tokio::test]
async fn perplexity_answer_carries_cost() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer p-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("Answer.")))
        .mount(&server)
        .await;

    let tools = tools_for(&server);
    let result = tools
        .execute("ask_perplexity", json!({ "query": "what is new?" }))
        .await;
    assert_eq!(result.text(), "Answer.");
    let structured = result.structured_content.unwrap();
    assert_eq!(structured["model"], "sonar-pro");
    assert!(approx(&structured["cost"]["estimatedCostUsd"], 0.0225));

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies[0]["model"], "sonar-pro");
}

#[tokio::test]
async fn perplexity_http_errors_become_tool_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": { "message": "invalid key" } })),
        )
        .mount(&server)
        .await;

    let tools = tools_for(&server);
    let result = tools
        .execute("ask_perplexity", json!({ "query": "q", "model": "sonar-deep-research" }))
        .await;
    assert!(result.is_error);
    assert_eq!(
        result.text(),
        "ask_perplexity failed: Perplexity chat failed: HTTP 401: invalid key"
    );
}

#[tokio::test]
async fn search_returns_numbered_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "title": "Tokio", "url": "https://tokio.rs/", "snippet": "Async runtime", "date": "2025-01-02" },
                { "title": "Docs", "url": "https://docs.rs/tokio", "snippet": "API docs" }
            ]
        })))
        .mount(&server)
        .await;

    let tools = tools_for(&server);
    let result = tools
        .execute(
            "search_perplexity",
            json!({ "query": ["tokio", "async rust"], "maxResults": 5, "searchRecencyFilter": "month" }),
        )
        .await;
    assert!(!result.is_error, "{}", result.text());
    assert_eq!(
        result.text(),
        "## Search Results\n\n\
         1. [Tokio](https://tokio.rs/)\n   Async runtime\n   Date: 2025-01-02\n\n\
         2. [Docs](https://docs.rs/tokio)\n   API docs"
    );
    assert_eq!(result.structured_content.unwrap()["resultCount"], 2);

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies[0]["query"], json!(["tokio", "async rust"]));
    assert_eq!(bodies[0]["max_results"], 5);
    assert_eq!(bodies[0]["search_recency_filter"], "month");
    assert_eq!(bodies[0]["search_mode"], "web");
}

#[tokio::test]
async fn search_rejects_out_of_range_limits_before_calling() {
    let server = MockServer::start().await;
    let tools = tools_for(&server);
    let result = tools
        .execute("search_perplexity", json!({ "query": "x", "maxResults": 0 }))
        .await;
    assert!(result.is_error);
    assert!(request_bodies(&server).await.is_empty());
}

#[tokio::test]
async fn assets_are_attached_by_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("A chart and a paper.")))
        .mount(&server)
        .await;

    let tools = tools_for(&server);
    let result = tools
        .execute(
            "ask_perplexity_with_assets",
            json!({
                "query": "Relate these",
                "assets": [
                    { "type": "image", "mimeType": "image/png", "data": "iVBORw0KGgo=" },
                    { "type": "document", "data": "https://arxiv.org/pdf/1234.pdf" }
                ]
            }),
        )
        .await;
    assert!(!result.is_error, "{}", result.text());
    assert_eq!(result.structured_content.unwrap()["assetCount"], 2);

    let bodies = request_bodies(&server).await;
    let content = &bodies[0]["messages"].as_array().unwrap().last().unwrap()["content"];
    assert_eq!(content[0], json!({ "type": "text", "text": "Relate these" }));
    assert_eq!(content[1]["type"], "image_url");
    assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,iVBORw0KGgo=");
    assert_eq!(content[2]["type"], "pdf_url");
    assert_eq!(content[2]["pdf_url"]["url"], "https://arxiv.org/pdf/1234.pdf");
}
