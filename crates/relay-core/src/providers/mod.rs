//! HTTP clients for the external model providers.
//!
//! Each client wraps a `reqwest::Client` with a 30 second timeout, retries
//! transient failures per its [`RetryConfig`], and reports failures as
//! [`ToolError::Provider`] naming the provider and operation. Base URLs are
//! overridable so tests can point a client at a local mock server.

pub mod gemini;
pub mod perplexity;
pub mod retry;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ToolError;

pub use gemini::GeminiClient;
pub use perplexity::PerplexityClient;
pub use retry::{RetryConfig, retry_call};

/// Request timeout for provider calls.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("relay/", env!("CARGO_PKG_VERSION"));

/// Token usage reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    /// Character counts stand in when the provider omits usage metadata.
    pub fn estimated(prompt: &str, response: &str) -> Self {
        Self {
            input_tokens: prompt.chars().count() as u64,
            output_tokens: response.chars().count() as u64,
        }
    }
}

/// Text answer plus usage from one provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderAnswer {
    pub text: String,
    pub usage: Usage,
}

pub(crate) fn build_http_client() -> Result<reqwest::Client, ToolError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(PROVIDER_TIMEOUT)
        .build()
        .map_err(|e| ToolError::Network(format!("failed to build HTTP client: {e}")))
}

/// Send a request and return the body of a 2xx response.
///
/// Non-2xx statuses become [`ToolError::Http`] carrying the provider's own
/// error message when the body has one.
pub(crate) async fn send(request: reqwest::RequestBuilder, label: &str) -> Result<String, ToolError> {
    let timeout_ms = PROVIDER_TIMEOUT.as_millis() as u64;
    let start = Instant::now();
    let resp = request
        .send()
        .await
        .map_err(|e| ToolError::from_reqwest(e, timeout_ms))?;

    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| ToolError::from_reqwest(e, timeout_ms))?;

    debug!(
        "{label} response: HTTP {} in {:.1}s ({} bytes)",
        status,
        start.elapsed().as_secs_f64(),
        text.len()
    );

    if !status.is_success() {
        return Err(ToolError::Http {
            status: status.as_u16(),
            reason: error_reason(status, &text),
        });
    }
    Ok(text)
}

/// Pull `error.message` (or a bare `error` string) out of an error body.
fn error_reason(status: reqwest::StatusCode, body: &str) -> String {
    let from_body = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            let err = v.get("error")?;
            err.get("message")
                .and_then(|m| m.as_str())
                .or_else(|| err.as_str())
                .map(str::to_string)
        });
    match from_body {
        Some(msg) if !msg.trim().is_empty() => msg.chars().take(300).collect(),
        _ => status.canonical_reason().unwrap_or("Unknown").to_string(),
    }
}

pub(crate) fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ToolError> {
    serde_json::from_str(body).map_err(|e| ToolError::Network(format!("failed to parse response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_reason_prefers_provider_message() {
        let status = reqwest::StatusCode::BAD_REQUEST;
        assert_eq!(
            error_reason(status, r#"{"error":{"message":"API key not valid"}}"#),
            "API key not valid"
        );
        assert_eq!(error_reason(status, r#"{"error":"quota"}"#), "quota");
        assert_eq!(error_reason(status, "<html>"), "Bad Request");
    }

    #[test]
    fn estimated_usage_counts_chars() {
        let u = Usage::estimated("héllo", "ok");
        assert_eq!(u.input_tokens, 5);
        assert_eq!(u.output_tokens, 2);
    }
}
