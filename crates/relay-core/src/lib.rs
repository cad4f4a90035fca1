//! Shared runtime for relay MCP servers.
//!
//! `relay-core` holds everything the tool servers have in common: the
//! TTL/LRU [`ResponseCache`](cache::ResponseCache) injected into every tool,
//! the asset classifier for multimodal inputs, per-model cost accounting,
//! the error taxonomy, the [`Tool`](tools::Tool) trait with its
//! [`ToolSet`](tools::ToolSet), provider clients for Gemini and Perplexity,
//! and an `rmcp`-backed stdio [`McpServer`](server::McpServer).
//!
//! # Getting started
//!
//! ```ignore
//! use relay_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     init_logging("info");
//!     let cache = Arc::new(ResponseCache::default());
//!     let tools = ToolSet::new()
//!         .with_arg_validation(true)
//!         .with(MyTool::new(cache.clone()));
//!
//!     McpServer::new("my-server", "0.1.0", tools)
//!         .serve_stdio()
//!         .await
//!         .map_err(|e| e.to_string())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | [`ResponseCache`](cache::ResponseCache) and [`cache_key`](cache::cache_key) |
//! | [`asset`] | Remote/local/inline asset resolution, plain-text fetch allow-list |
//! | [`cost`] | Pricing table, [`CostMetrics`](cost::CostMetrics), cost logging |
//! | [`error`] | [`ToolError`](error::ToolError) and [`ErrorKind`](error::ErrorKind) |
//! | [`tools`] | [`Tool`](tools::Tool), [`ToolSet`](tools::ToolSet), [`ToolResult`](tools::ToolResult), [`ToolSpec`](tools::ToolSpec) |
//! | [`pipeline`] | Cache-lookup → invoke → cost → store wrapper for tools |
//! | [`providers`] | Gemini and Perplexity HTTP clients with retry |
//! | [`server`] | [`McpServer`](server::McpServer): a [`ToolSet`](tools::ToolSet) served through `rmcp` |
//! | [`config`] | API keys from the environment |
//! | [`logging`] | stderr `tracing` subscriber |

pub mod asset;
pub mod cache;
pub mod config;
pub mod cost;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod providers;
pub mod server;
pub mod tools;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// Re-export schemars for downstream crates.
pub use schemars;

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`.
///
/// # Example
///
/// ```
/// use relay_core::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct FetchArgs {
///     url: String,
///     #[serde(default)]
///     max_chars: Option<u32>,
/// }
///
/// let schema = json_schema_for::<FetchArgs>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"url".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Tool definitions ───────────────────────────────────────────────

/// A tool as advertised by `tools/list`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl ToolDef {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: description.into(),
            input_schema,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
