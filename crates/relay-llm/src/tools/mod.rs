//! Model-provider tools and the [`LlmToolsExt`] trait for registering them
//! on a [`ToolSet`].
//!
//! Every tool answers through [`cached_invoke`](relay_core::pipeline::cached_invoke),
//! so a repeated call with the same arguments is served from the shared
//! [`ResponseCache`] without reaching the provider.

pub mod gemini;
pub mod perplexity;

use std::sync::Arc;

use relay_core::cache::ResponseCache;
use relay_core::config::{GOOGLE_API_KEY, PERPLEXITY_API_KEY};
use relay_core::providers::{GeminiClient, PerplexityClient};
use relay_core::tools::{DisabledTool, ToolSet};

pub use gemini::{AnalyzeMedia, AskGemini, GeminiModel, analyze_media_def, ask_gemini_def};
pub use perplexity::{
    AskPerplexity, AskPerplexityWithAssets, SearchPerplexity, ask_perplexity_def, ask_with_assets_def,
    search_perplexity_def,
};

// ── Tool name constants ─────────────────────────────────────────────

pub const ASK_GEMINI_PRO: &str = "ask_gemini_pro";
pub const ASK_GEMINI_FLASH: &str = "ask_gemini_flash";
pub const ANALYZE_MEDIA: &str = "analyze_media";
pub const ASK_PERPLEXITY: &str = "ask_perplexity";
pub const SEARCH_PERPLEXITY: &str = "search_perplexity";
pub const ASK_PERPLEXITY_WITH_ASSETS: &str = "ask_perplexity_with_assets";

// ── Extension trait ─────────────────────────────────────────────────

/// Extension trait for registering the provider tools on a [`ToolSet`].
///
/// A missing client keeps the provider's tools listed; calling one reports
/// which environment variable to set.
///
/// ```ignore
/// let cache = Arc::new(ResponseCache::default());
/// let tools = ToolSet::new()
///     .with_gemini_tools(Some(GeminiClient::new(key)?), cache.clone())
///     .with_perplexity_tools(None, cache);
/// ```
pub trait LlmToolsExt {
    fn with_gemini_tools(self, client: Option<GeminiClient>, cache: Arc<ResponseCache>) -> Self;
    fn with_perplexity_tools(self, client: Option<PerplexityClient>, cache: Arc<ResponseCache>) -> Self;
}

impl LlmToolsExt for ToolSet {
    fn with_gemini_tools(self, client: Option<GeminiClient>, cache: Arc<ResponseCache>) -> Self {
        match client {
            Some(client) => self
                .with(AskGemini::pro(client.clone(), cache.clone()))
                .with(AskGemini::flash(client.clone(), cache.clone()))
                .with(AnalyzeMedia::new(client, cache)),
            None => self
                .with(DisabledTool::missing_config(ask_gemini_def(GeminiModel::Pro), GOOGLE_API_KEY))
                .with(DisabledTool::missing_config(ask_gemini_def(GeminiModel::Flash), GOOGLE_API_KEY))
                .with(DisabledTool::missing_config(analyze_media_def(), GOOGLE_API_KEY)),
        }
    }

    fn with_perplexity_tools(self, client: Option<PerplexityClient>, cache: Arc<ResponseCache>) -> Self {
        match client {
            Some(client) => self
                .with(AskPerplexity::new(client.clone(), cache.clone()))
                .with(SearchPerplexity::new(client.clone(), cache.clone()))
                .with(AskPerplexityWithAssets::new(client, cache)),
            None => self
                .with(DisabledTool::missing_config(ask_perplexity_def(), PERPLEXITY_API_KEY))
                .with(DisabledTool::missing_config(search_perplexity_def(), PERPLEXITY_API_KEY))
                .with(DisabledTool::missing_config(ask_with_assets_def(), PERPLEXITY_API_KEY)),
        }
    }
}
