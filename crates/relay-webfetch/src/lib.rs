//! Web fetching as MCP tools.
//!
//! `relay-webfetch` turns URLs into text for a model: plain-text resources
//! (Markdown, JSON, source files, …) are read verbatim, everything else is
//! fetched as HTML and reduced to Markdown. Results are truncated to a
//! caller-chosen character ceiling and cached in a shared
//! [`ResponseCache`](relay_core::cache::ResponseCache).
//!
//! # Library usage
//!
//! ```ignore
//! use relay_core::prelude::*;
//! use relay_webfetch::WebFetchConfig;
//!
//! let cache = Arc::new(ResponseCache::default());
//! let tools = WebFetchConfig::default().build_tool_set(&ProviderKeys::from_env(), cache)?;
//! McpServer::new("relay-webfetch", "0.3.0", tools).serve_stdio().await?;
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`validate`] | URL, output path, and filename checks |
//! | [`options`] | Per-call `options` objects and their defaults |
//! | [`fetcher`] | [`PageFetcher`](fetcher::PageFetcher) seam and the `reqwest` implementation |
//! | [`robots`] | robots.txt rule evaluation |
//! | [`dispatch`] | Strategy choice, truncation, page cache |
//! | [`tools`] | The five MCP tools |
//! | [`config`] | [`WebFetchConfig`] |

pub mod config;
pub mod dispatch;
pub mod fetcher;
pub mod options;
pub mod robots;
pub mod tools;
pub mod validate;

pub use config::WebFetchConfig;
pub use dispatch::{Dispatcher, FetchResult};
pub use fetcher::{ExtractedPage, FetchFuture, HttpFetcher, PageFetcher};
pub use options::FetchOptions;
pub use tools::{FetchContext, WebFetchToolsExt};

/// Server name reported in `initialize`.
pub const SERVER_NAME: &str = "relay-webfetch";

/// Instructions reported in `initialize`.
pub const INSTRUCTIONS: &str = "Fetch web pages as Markdown. Use simpleWebFetch or fullWebFetch to \
     read a page, saveWebFetch or crawlWebFetch to write pages to disk, and askWebFetch to have a \
     model answer questions about a page.";
