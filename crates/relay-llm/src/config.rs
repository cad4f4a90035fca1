//! Server configuration with defaults.
//!
//! [`LlmConfig`] turns provider keys into a ready [`ToolSet`] via
//! [`build_tool_set`](LlmConfig::build_tool_set). Tests and embedders that
//! need a mock provider pass pre-built clients to
//! [`build_tool_set_with`](LlmConfig::build_tool_set_with).

use std::sync::Arc;

use relay_core::cache::ResponseCache;
use relay_core::config::ProviderKeys;
use relay_core::error::ToolError;
use relay_core::providers::perplexity::DEFAULT_RETRIES;
use relay_core::providers::{GeminiClient, PerplexityClient, RetryConfig};
use relay_core::tools::ToolSet;

use crate::tools::LlmToolsExt;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Retries for transient Gemini failures. Default: `0`.
    pub gemini_retries: u32,
    /// Retries for transient Perplexity failures. Default: `3`.
    pub perplexity_retries: u32,
    /// Validate arguments against each tool's JSON schema. Default: `true`.
    pub arg_validation: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            gemini_retries: 0,
            perplexity_retries: DEFAULT_RETRIES,
            arg_validation: true,
        }
    }
}

impl LlmConfig {
    /// Build clients for every key that is set and register all six tools.
    pub fn build_tool_set(&self, keys: &ProviderKeys, cache: Arc<ResponseCache>) -> Result<ToolSet, ToolError> {
        let gemini = match &keys.google {
            Some(key) => Some(GeminiClient::new(key)?.with_retry(RetryConfig::with_retries(self.gemini_retries))),
            None => None,
        };
        let perplexity = match &keys.perplexity {
            Some(key) => Some(
                PerplexityClient::new(key)?.with_retry(RetryConfig::with_retries(self.perplexity_retries)),
            ),
            None => None,
        };
        Ok(self.build_tool_set_with(gemini, perplexity, cache))
    }

    /// Register all six tools around the given clients.
    pub fn build_tool_set_with(
        &self,
        gemini: Option<GeminiClient>,
        perplexity: Option<PerplexityClient>,
        cache: Arc<ResponseCache>,
    ) -> ToolSet {
        ToolSet::new()
            .with_arg_validation(self.arg_validation)
            .with_gemini_tools(gemini, cache.clone())
            .with_perplexity_tools(perplexity, cache)
    }
}
