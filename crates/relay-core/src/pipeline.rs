//! The cached invocation pipeline shared by provider-backed tools.
//!
//! A tool validates its arguments, builds a cache key, and hands the
//! expensive part to [`cached_invoke`]:
//!
//! ```text
//! cache lookup ─ hit ──────────────────────────────→ envelope (cached: true)
//!      │
//!      └ miss → invoke → cost log → cache store → envelope
//! ```
//!
//! Any error short-circuits into an error envelope and nothing is cached.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::ResponseCache;
use crate::cost::{CostMetrics, log_cost};
use crate::error::ToolError;
use crate::tools::ToolResult;

/// What a successful invocation produced.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Human-readable text block.
    pub text: String,
    /// `structuredContent` object.
    pub structured: Value,
    /// Usage accounting, for provider-backed calls.
    pub cost: Option<CostMetrics>,
}

impl Completion {
    pub fn new(text: impl Into<String>, structured: Value) -> Self {
        Self {
            text: text.into(),
            structured,
            cost: None,
        }
    }

    pub fn with_cost(mut self, cost: CostMetrics) -> Self {
        self.cost = Some(cost);
        self
    }
}

/// The serialized form stored in the cache.
#[derive(Debug, Serialize, Deserialize)]
struct CachedEnvelope {
    text: String,
    structured: Value,
    #[serde(default)]
    cost: Option<CostMetrics>,
}

/// Serve `key` from `cache`, or run `invoke` and cache its result.
pub async fn cached_invoke<F, Fut>(
    tool: &str,
    cache: &ResponseCache,
    key: &str,
    invoke: F,
) -> ToolResult
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Completion, ToolError>>,
{
    if let Some(hit) = lookup(cache, key) {
        info!(tool, "[cache] hit for {}", key.chars().take(50).collect::<String>());
        if let Some(cost) = &hit.cost {
            log_cost(cost, true);
        }
        return ToolResult::success(hit.text, mark_cached(hit.structured));
    }

    match invoke().await {
        Ok(completion) => {
            if let Some(cost) = &completion.cost {
                log_cost(cost, false);
            }
            store(cache, key, &completion);
            ToolResult::success(completion.text, completion.structured)
        }
        Err(e) => ToolResult::failure(tool, &e),
    }
}

fn lookup(cache: &ResponseCache, key: &str) -> Option<CachedEnvelope> {
    let raw = cache.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            debug!("Discarding unreadable cache entry {key}: {e}");
            None
        }
    }
}

fn store(cache: &ResponseCache, key: &str, completion: &Completion) {
    let envelope = CachedEnvelope {
        text: completion.text.clone(),
        structured: completion.structured.clone(),
        cost: completion.cost.clone(),
    };
    match serde_json::to_string(&envelope) {
        Ok(raw) => cache.set(key, raw),
        Err(e) => debug!("Not caching {key}: {e}"),
    }
}

/// Set `cached: true` on a structured object.
pub fn mark_cached(mut structured: Value) -> Value {
    if let Value::Object(map) = &mut structured {
        map.insert("cached".into(), Value::Bool(true));
    }
    structured
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::calculate_cost;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let cache = ResponseCache::default();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = cached_invoke("ask", &cache, "ask:q", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Completion::new("answer", json!({"answer": "answer"}))
                    .with_cost(calculate_cost("sonar-pro", 10, 10)))
            })
            .await;
            assert_eq!(result.text(), "answer");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let hit = cached_invoke("ask", &cache, "ask:q", || async {
            Err(ToolError::invalid("must not run"))
        })
        .await;
        assert_eq!(hit.field("cached"), Some(&json!(true)));
        assert_eq!(hit.field("answer"), Some(&json!("answer")));
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = ResponseCache::default();
        let result = cached_invoke("ask", &cache, "k", || async {
            Err(ToolError::Http {
                status: 500,
                reason: "Internal Server Error".into(),
            })
        })
        .await;
        assert!(result.is_error);
        assert_eq!(result.text(), "ask failed: HTTP 500: Internal Server Error");
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn fresh_result_is_not_marked_cached() {
        let cache = ResponseCache::default();
        let result = cached_invoke("t", &cache, "k", || async {
            Ok(Completion::new("x", json!({"a": 1})))
        })
        .await;
        assert!(result.field("cached").is_none());
    }
}
