//! Per-call fetch options.
//!
//! Callers send a partial, strictly-typed `options` object; unset fields fall
//! back to the server defaults ([`FetchOptions::default`] or whatever the
//! binary was configured with).

use relay_core::error::ToolError;
use schemars::JsonSchema;
use serde::Deserialize;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const MAX_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_MAX_CHARS: usize = 120_000;
pub const MAX_MAX_CHARS: usize = 500_000;
pub const DEFAULT_CACHE_DIR: &str = ".cache/relay-webfetch";
pub const DEFAULT_USER_AGENT: &str = concat!("relay-webfetch/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_MAX_CONCURRENCY: usize = 3;
pub const MAX_MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_MAX_PAGES: usize = 50;
pub const MAX_MAX_PAGES: usize = 200;

/// Fully resolved options for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub respect_robots: bool,
    pub timeout_ms: u64,
    pub user_agent: String,
    pub cache_dir: String,
    pub max_chars: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            respect_robots: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_dir: DEFAULT_CACHE_DIR.to_string(),
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl FetchOptions {
    /// Range checks. The JSON schema enforces the same bounds when argument
    /// validation is on; this catches the rest.
    pub fn validate(&self) -> Result<(), ToolError> {
        if self.timeout_ms == 0 || self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ToolError::invalid(format!(
                "timeoutMs must be between 1 and {MAX_TIMEOUT_MS} (got {})",
                self.timeout_ms
            )));
        }
        if self.max_chars == 0 || self.max_chars > MAX_MAX_CHARS {
            return Err(ToolError::invalid(format!(
                "maxChars must be between 1 and {MAX_MAX_CHARS} (got {})",
                self.max_chars
            )));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ToolError::invalid("userAgent must not be empty"));
        }
        if self.cache_dir.trim().is_empty() {
            return Err(ToolError::invalid("cacheDir must not be empty"));
        }
        Ok(())
    }

    /// Overlay the fields set in `input` onto these defaults.
    pub fn merged(&self, input: Option<FetchOptionsInput>) -> Result<FetchOptions, ToolError> {
        let input = input.unwrap_or_default();
        let resolved = FetchOptions {
            respect_robots: input.respect_robots.unwrap_or(self.respect_robots),
            timeout_ms: input.timeout_ms.unwrap_or(self.timeout_ms),
            user_agent: input.user_agent.unwrap_or_else(|| self.user_agent.clone()),
            cache_dir: input.cache_dir.unwrap_or_else(|| self.cache_dir.clone()),
            max_chars: input.max_chars.unwrap_or(self.max_chars),
        };
        resolved.validate()?;
        Ok(resolved)
    }
}

/// The `options` object accepted by the fetch tools.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FetchOptionsInput {
    /// Check robots.txt before extracting a page (default true).
    #[serde(default)]
    pub respect_robots: Option<bool>,
    /// Request timeout in milliseconds (default 30000).
    #[serde(default)]
    #[schemars(range(min = 1, max = 60000))]
    pub timeout_ms: Option<u64>,
    /// User-Agent header sent with every request.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Directory the cache pointer refers to.
    #[serde(default)]
    pub cache_dir: Option<String>,
    /// Maximum characters of content to return (default 120000).
    #[serde(default)]
    #[schemars(range(min = 1, max = 500000))]
    pub max_chars: Option<usize>,
}

/// The `options` object accepted by `crawlWebFetch`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CrawlOptionsInput {
    /// Check robots.txt before extracting each page (default true).
    #[serde(default)]
    pub respect_robots: Option<bool>,
    /// Per-request timeout in milliseconds (default 30000).
    #[serde(default)]
    #[schemars(range(min = 1, max = 60000))]
    pub timeout_ms: Option<u64>,
    /// User-Agent header sent with every request.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Directory the cache pointer refers to.
    #[serde(default)]
    pub cache_dir: Option<String>,
    /// Maximum characters saved per page (default 120000).
    #[serde(default)]
    #[schemars(range(min = 1, max = 500000))]
    pub max_chars: Option<usize>,
    /// Pages fetched at the same time (default 3).
    #[serde(default)]
    #[schemars(range(min = 1, max = 10))]
    pub max_concurrency: Option<usize>,
    /// Upper bound on pages fetched, root included (default 50).
    #[serde(default)]
    #[schemars(range(min = 1, max = 200))]
    pub max_pages: Option<usize>,
}

/// Resolved crawl settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOptions {
    pub fetch: FetchOptions,
    pub max_concurrency: usize,
    pub max_pages: usize,
}

impl CrawlOptions {
    pub fn resolve(defaults: &FetchOptions, input: Option<CrawlOptionsInput>) -> Result<Self, ToolError> {
        let input = input.unwrap_or_default();
        let fetch = defaults.merged(Some(FetchOptionsInput {
            respect_robots: input.respect_robots,
            timeout_ms: input.timeout_ms,
            user_agent: input.user_agent,
            cache_dir: input.cache_dir,
            max_chars: input.max_chars,
        }))?;
        let max_concurrency = input.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY);
        if max_concurrency == 0 || max_concurrency > MAX_MAX_CONCURRENCY {
            return Err(ToolError::invalid(format!(
                "maxConcurrency must be between 1 and {MAX_MAX_CONCURRENCY} (got {max_concurrency})"
            )));
        }
        let max_pages = input.max_pages.unwrap_or(DEFAULT_MAX_PAGES);
        if max_pages == 0 || max_pages > MAX_MAX_PAGES {
            return Err(ToolError::invalid(format!(
                "maxPages must be between 1 and {MAX_MAX_PAGES} (got {max_pages})"
            )));
        }
        Ok(Self {
            fetch,
            max_concurrency,
            max_pages,
        })
    }
}
