//! Convenience re-exports for tool crates.
//!
//! ```ignore
//! use relay_core::prelude::*;
//! ```

pub use std::sync::Arc;

pub use crate::asset::{AssetKind, FetchStrategy, ProcessedAsset, process_asset};
pub use crate::cache::{ResponseCache, cache_key};
pub use crate::config::ProviderKeys;
pub use crate::cost::{CostMetrics, calculate_cost, log_cost};
pub use crate::error::{ErrorKind, ToolError};
pub use crate::logging::init_logging;
pub use crate::pipeline::{Completion, cached_invoke};
pub use crate::server::McpServer;
pub use crate::tools::{
    DisabledTool, Tool, ToolFuture, ToolResult, ToolSet, ToolSpec, parse_tool_args,
};
pub use crate::{ToolDef, json_schema_for};
