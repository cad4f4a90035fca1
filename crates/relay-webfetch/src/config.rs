//! Server configuration with defaults.
//!
//! [`WebFetchConfig`] captures what the binary's flags control and turns it
//! into a ready [`ToolSet`] via [`build_tool_set`](WebFetchConfig::build_tool_set).

use std::path::PathBuf;
use std::sync::Arc;

use relay_core::cache::ResponseCache;
use relay_core::config::ProviderKeys;
use relay_core::error::ToolError;
use relay_core::providers::{PerplexityClient, RetryConfig};
use relay_core::tools::ToolSet;

use crate::dispatch::Dispatcher;
use crate::fetcher::{HttpFetcher, PageFetcher};
use crate::options::FetchOptions;
use crate::tools::{FetchContext, WebFetchToolsExt};

/// Retries for the `askWebFetch` Perplexity call.
pub const ASK_RETRIES: u32 = 2;

#[derive(Debug, Clone)]
pub struct WebFetchConfig {
    /// Directory `saveWebFetch`/`crawlWebFetch` write under. Default: `"."`.
    pub output_root: PathBuf,
    /// Options used when a call leaves a field unset.
    pub defaults: FetchOptions,
    /// Validate arguments against each tool's JSON schema. Default: `true`.
    pub arg_validation: bool,
}

impl Default for WebFetchConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            defaults: FetchOptions::default(),
            arg_validation: true,
        }
    }
}

impl WebFetchConfig {
    /// Tools backed by a real [`HttpFetcher`].
    pub fn build_tool_set(&self, keys: &ProviderKeys, cache: Arc<ResponseCache>) -> Result<ToolSet, ToolError> {
        self.build_tool_set_with(Arc::new(HttpFetcher::new()?), keys, cache)
    }

    /// Tools backed by any [`PageFetcher`].
    pub fn build_tool_set_with(
        &self,
        fetcher: Arc<dyn PageFetcher>,
        keys: &ProviderKeys,
        cache: Arc<ResponseCache>,
    ) -> Result<ToolSet, ToolError> {
        self.defaults.validate()?;
        let ctx = Arc::new(FetchContext::new(
            Dispatcher::new(fetcher, cache),
            self.defaults.clone(),
            self.output_root.clone(),
        ));
        let perplexity = match &keys.perplexity {
            Some(key) => Some(PerplexityClient::new(key)?.with_retry(RetryConfig::with_retries(ASK_RETRIES))),
            None => None,
        };
        Ok(ToolSet::new()
            .with_arg_validation(self.arg_validation)
            .with_webfetch_tools(ctx, perplexity))
    }
}
