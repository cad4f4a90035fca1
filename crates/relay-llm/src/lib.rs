//! Gemini and Perplexity as MCP tools.
//!
//! `relay-llm` exposes six tools over two providers. Gemini answers
//! questions (grounded with Google Search unless disabled) and analyzes
//! images, video, audio, and documents. Perplexity answers from live web
//! search, returns raw ranked results, and answers over attached images or
//! PDFs. Every answer carries token usage and an estimated cost, and repeated
//! calls are served from a shared [`ResponseCache`](relay_core::cache::ResponseCache).
//!
//! # Library usage
//!
//! ```ignore
//! use relay_core::prelude::*;
//! use relay_llm::LlmConfig;
//!
//! let cache = Arc::new(ResponseCache::default());
//! let tools = LlmConfig::default().build_tool_set(&ProviderKeys::from_env(), cache)?;
//! McpServer::new("relay-llm", "0.3.0", tools).serve_stdio().await?;
//! ```

pub mod config;
pub mod tools;

pub use config::LlmConfig;
pub use tools::LlmToolsExt;

/// Server name reported in `initialize`.
pub const SERVER_NAME: &str = "relay-llm";

/// Instructions reported in `initialize`.
pub const INSTRUCTIONS: &str = "Ask Gemini or Perplexity. Use ask_perplexity or search_perplexity \
     for current web information, ask_gemini_pro for deep reasoning, ask_gemini_flash for cheap \
     answers, and analyze_media or ask_perplexity_with_assets for images, audio, video, and documents.";
