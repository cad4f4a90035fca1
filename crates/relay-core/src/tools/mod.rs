//! Tool abstractions for MCP servers.
//!
//! Every capability a server exposes is a [`Tool`] trait implementor. Tools
//! are collected into a [`ToolSet`] which handles dispatch, validation, and
//! timeouts.
//!
//! # Submodules
//!
//! - [`core`]: [`Tool`] trait, [`ToolSet`], [`DisabledTool`].
//! - [`result`]: the [`ToolResult`] envelope returned by every call.
//! - [`spec`]: [`ToolSpec`](spec::ToolSpec) builder for structured tool
//!   descriptions with `when_to_use` / `when_not_to_use` guidance.

pub mod core;
pub mod result;
pub mod spec;

pub use core::{DisabledTool, Tool, ToolFuture, ToolSet, parse_tool_args, validate_tool_arguments};
pub use result::{ContentBlock, ToolResult};
pub use spec::ToolSpec;
