//! The envelope every tool call returns.
//!
//! Mirrors the MCP `CallToolResult` shape: a list of text content blocks, an
//! optional machine-readable `structuredContent` object, and an `isError`
//! flag. Failures never propagate as Rust errors past a tool boundary; they
//! are rendered into an error envelope here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ToolError;

/// One block of tool output. Only text blocks are produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".into(),
            text: text.into(),
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Result of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolResult {
    /// A successful result with human-readable text and structured fields.
    pub fn success(text: impl Into<String>, structured: Value) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: Some(structured),
            is_error: false,
        }
    }

    /// An error result carrying `message` verbatim.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(message)],
            structured_content: None,
            is_error: true,
        }
    }

    /// Render a [`ToolError`] as `"<tool> failed: <message>"`.
    pub fn failure(tool: &str, err: &ToolError) -> Self {
        warn!(tool, kind = %err.kind(), "{tool} failed: {err}");
        Self::error(format!("{tool} failed: {err}"))
    }

    /// All text blocks concatenated.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Look up a field of the structured content.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.structured_content.as_ref().and_then(|s| s.get(name))
    }
}
