//! Tool abstraction for MCP servers.
//!
//! The [`Tool`] trait defines the interface that every tool must implement:
//! a static definition (name, title, description, JSON schema) and an async
//! `execute` method. Tools are collected into a [`ToolSet`] which handles
//! dispatch, definition export, argument validation, and timeouts.

use crate::ToolDef;
use crate::error::ToolError;
use crate::tools::result::ToolResult;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info, trace};

/// Boxed future returned by [`Tool::execute`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = ToolResult> + Send + 'a>>;

// ── Tool trait ─────────────────────────────────────────────────────

/// A tool exposed to MCP clients.
///
/// `execute` receives the raw JSON arguments object and always produces a
/// [`ToolResult`]: failures are rendered as error envelopes, never panics or
/// propagated errors.
///
/// # Example
///
/// ```ignore
/// struct Echo;
///
/// impl Tool for Echo {
///     fn definition(&self) -> ToolDef { /* ... */ }
///
///     fn execute(&self, arguments: Value) -> ToolFuture<'_> {
///         Box::pin(async move {
///             let text = arguments["text"].as_str().unwrap_or_default().to_string();
///             ToolResult::success(text.clone(), json!({ "text": text }))
///         })
///     }
/// }
/// ```
pub trait Tool: Send + Sync {
    /// The definition advertised by `tools/list`.
    fn definition(&self) -> ToolDef;

    /// Execute the tool with the given JSON arguments.
    ///
    /// Uses a boxed future so that the trait is dyn-compatible.
    fn execute(&self, arguments: Value) -> ToolFuture<'_>;

    /// The tool's name (delegates to definition).
    fn name(&self) -> String {
        self.definition().name
    }
}

// ── ToolSet ────────────────────────────────────────────────────────

/// A collection of tools that can be dispatched by name.
///
/// # Example
///
/// ```ignore
/// let tools = ToolSet::new()
///     .with_arg_validation(true)
///     .with(AskPerplexity::new(client.clone(), cache.clone()))
///     .with_if(keys.google.is_none(), DisabledTool::missing_config(
///         ask_gemini_pro_def(),
///         "GOOGLE_API_KEY",
///     ));
/// ```
pub struct ToolSet {
    tools: HashMap<String, Box<dyn Tool>>,
    /// Whether to validate tool arguments against JSON Schema before execution.
    validate_args: bool,
    /// Timeout for tool execution. `None` disables timeouts.
    default_timeout: Option<std::time::Duration>,
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.names())
            .field("validate_args", &self.validate_args)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl ToolSet {
    /// Create an empty tool set.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            validate_args: false,
            default_timeout: None,
        }
    }

    /// Enable JSON Schema argument validation before tool execution.
    pub fn with_arg_validation(mut self, enabled: bool) -> Self {
        self.validate_args = enabled;
        self
    }

    /// Set a timeout for every tool call. Pass `None` to disable timeouts.
    pub fn with_default_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name();
        self.tools.insert(name, Box::new(tool));
    }

    /// Register a tool (builder pattern).
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    /// Conditionally register a tool (builder pattern).
    pub fn with_if(self, condition: bool, tool: impl Tool + 'static) -> Self {
        if condition { self.with(tool) } else { self }
    }

    /// All tool definitions, sorted by name so `tools/list` is stable.
    pub fn definitions(&self) -> Vec<ToolDef> {
        let mut defs: Vec<ToolDef> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool call by name, with optional validation and timeout.
    ///
    /// Unknown tools, invalid arguments, and timeouts all come back as error
    /// envelopes.
    pub async fn execute(&self, name: &str, arguments: Value) -> ToolResult {
        let tool = match self.tools.get(name) {
            Some(t) => t,
            None => return ToolResult::error(format!("unknown tool '{name}'")),
        };

        if self.validate_args
            && let Err(e) = validate_tool_arguments(tool.as_ref(), &arguments)
        {
            return ToolResult::failure(name, &e);
        }

        log_tool_call(name, &arguments);
        let start = std::time::Instant::now();

        let result = if let Some(timeout_duration) = self.default_timeout {
            match tokio::time::timeout(timeout_duration, tool.execute(arguments)).await {
                Ok(r) => r,
                Err(_) => {
                    info!(
                        "Tool {name} timed out after {:.1}s",
                        start.elapsed().as_secs_f64()
                    );
                    ToolResult::failure(
                        name,
                        &ToolError::Timeout {
                            ms: timeout_duration.as_millis() as u64,
                        },
                    )
                }
            }
        } else {
            tool.execute(arguments).await
        };

        let text = result.text();
        debug!(
            "Tool {name} completed in {:.0}ms ({} bytes, error={})",
            start.elapsed().as_secs_f64() * 1000.0,
            text.len(),
            result.is_error,
        );
        trace!(
            "Tool {name} result preview: {}",
            text.chars().take(300).collect::<String>()
        );
        result
    }
}

impl Default for ToolSet {
    fn default() -> Self {
        Self::new()
    }
}

// ── DisabledTool ───────────────────────────────────────────────────

/// A tool that always fails with a fixed reason.
///
/// Keeps the tool visible in `tools/list` (same name, description and
/// schema) while explaining why it cannot run, e.g. a missing API key.
pub struct DisabledTool {
    def: ToolDef,
    reason: String,
}

impl DisabledTool {
    /// Create a disabled tool with the given definition and error reason.
    ///
    /// When executed, returns `"<name> failed: <reason>"`.
    pub fn new(def: ToolDef, reason: impl Into<String>) -> Self {
        Self {
            def,
            reason: reason.into(),
        }
    }

    /// Disabled because an environment variable is not set.
    pub fn missing_config(def: ToolDef, var: &'static str) -> Self {
        Self::new(def, ToolError::MissingConfig { var }.to_string())
    }
}

impl Tool for DisabledTool {
    fn definition(&self) -> ToolDef {
        self.def.clone()
    }

    fn execute(&self, _arguments: Value) -> ToolFuture<'_> {
        let result = ToolResult::error(format!("{} failed: {}", self.def.name, self.reason));
        Box::pin(async move { result })
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Validate tool arguments against the tool's declared JSON Schema.
///
/// Every violation is listed with its instance path.
pub fn validate_tool_arguments(tool: &dyn Tool, arguments: &Value) -> Result<(), ToolError> {
    let schema = tool.definition().input_schema;

    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(_) => return Ok(()), // If schema itself is invalid, skip validation.
    };

    let errors: Vec<String> = validator
        .iter_errors(arguments)
        .map(|e| format!("  - {}: {e}", e.instance_path()))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ToolError::invalid(format!(
            "argument validation failed:\n{}",
            errors.join("\n")
        )))
    }
}

/// Log a tool call at INFO level with a truncated preview of arguments.
pub fn log_tool_call(name: &str, arguments: &Value) {
    let raw = arguments.to_string();
    let args_preview: String = raw.chars().take(120).collect();
    info!(
        "[tool] {}({args_preview}{})",
        name,
        if raw.chars().count() > 120 { "..." } else { "" }
    );
    trace!("[tool] {name} arguments: {raw}");
}

/// Deserialize JSON arguments into a typed struct.
///
/// Unknown fields, missing required fields, and type mismatches come back as
/// [`ToolError::InvalidInput`] with serde's explanation.
pub fn parse_tool_args<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::invalid(format!("invalid arguments: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    impl Tool for EchoTool {
        fn definition(&self) -> ToolDef {
            ToolDef::new(
                "echo",
                "Echo the input",
                json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"],
                    "additionalProperties": false
                }),
            )
        }

        fn execute(&self, arguments: Value) -> ToolFuture<'_> {
            Box::pin(async move {
                let text = arguments["text"].as_str().unwrap_or_default().to_string();
                ToolResult::success(text.clone(), json!({ "text": text }))
            })
        }
    }

    struct SlowTool;

    impl Tool for SlowTool {
        fn definition(&self) -> ToolDef {
            ToolDef::new("slow", "Sleeps", json!({"type": "object"}))
        }

        fn execute(&self, _arguments: Value) -> ToolFuture<'_> {
            Box::pin(async {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                ToolResult::success("done", json!({}))
            })
        }
    }

    #[test]
    fn tool_name_from_definition() {
        assert_eq!(EchoTool.name(), "echo");
    }

    #[test]
    fn definitions_are_sorted() {
        let set = ToolSet::new().with(SlowTool).with(EchoTool);
        let names: Vec<String> = set.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["echo", "slow"]);
        assert_eq!(set.names(), names);
    }

    #[tokio::test]
    async fn execute_known_tool() {
        let set = ToolSet::new().with(EchoTool);
        let result = set.execute("echo", json!({"text": "hello"})).await;
        assert!(!result.is_error);
        assert_eq!(result.text(), "hello");
    }

    #[tokio::test]
    async fn execute_unknown_tool() {
        let set = ToolSet::new().with(EchoTool);
        let result = set.execute("nonexistent", json!({})).await;
        assert!(result.is_error);
        assert!(result.text().contains("unknown tool"));
    }

    #[tokio::test]
    async fn validation_rejects_bad_arguments() {
        let set = ToolSet::new().with_arg_validation(true).with(EchoTool);
        let result = set.execute("echo", json!({"text": 42})).await;
        assert!(result.is_error);
        assert!(result.text().starts_with("echo failed: argument validation failed"));

        let result = set.execute("echo", json!({"text": "ok", "extra": 1})).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn validation_disabled_passes_through() {
        let set = ToolSet::new().with(EchoTool);
        let result = set.execute("echo", json!({"text": 42})).await;
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn timeout_becomes_failure() {
        let set = ToolSet::new()
            .with_default_timeout(Some(std::time::Duration::from_millis(100)))
            .with(SlowTool);
        let result = set.execute("slow", json!({})).await;
        assert!(result.is_error);
        assert_eq!(result.text(), "slow failed: request timed out after 100ms");
    }

    #[test]
    fn with_if_respects_condition() {
        assert_eq!(ToolSet::new().with_if(true, EchoTool).len(), 1);
        assert!(ToolSet::new().with_if(false, EchoTool).is_empty());
    }

    #[tokio::test]
    async fn disabled_tool_keeps_definition_and_fails() {
        let disabled = DisabledTool::missing_config(EchoTool.definition(), "GOOGLE_API_KEY");
        assert_eq!(disabled.definition().description, "Echo the input");

        let result = disabled.execute(json!({"text": "x"})).await;
        assert!(result.is_error);
        assert_eq!(
            result.text(),
            "echo failed: GOOGLE_API_KEY environment variable not set"
        );
    }

    #[test]
    fn parse_tool_args_reports_serde_error() {
        #[derive(serde::Deserialize, Debug)]
        #[allow(dead_code)]
        struct Args {
            query: String,
        }
        let err = parse_tool_args::<Args>(json!({})).unwrap_err();
        assert!(err.to_string().contains("missing field `query`"));
    }
}
