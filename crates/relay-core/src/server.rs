//! MCP server over stdio.
//!
//! [`McpServer`] adapts a [`ToolSet`] to [`rmcp::ServerHandler`]: `tools/list`
//! advertises [`ToolSet::definitions`] and `tools/call` runs
//! [`ToolSet::execute`]. Framing, the `initialize` handshake, and concurrent
//! request handling belong to `rmcp`.
//!
//! Tool failures are ordinary results with `isError: true`. Only a call to a
//! tool that does not exist is reported as a protocol error.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult, PaginatedRequestParam,
    ServerCapabilities, ServerInfo, Tool as McpTool,
};
use rmcp::service::RequestContext;
use rmcp::transport::stdio;
use rmcp::{ErrorData, RoleServer, ServerHandler, ServiceExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::ToolDef;
use crate::tools::{ToolResult, ToolSet};

struct Inner {
    name: String,
    version: String,
    instructions: Option<String>,
    tools: ToolSet,
}

/// An MCP server exposing a [`ToolSet`].
#[derive(Clone)]
pub struct McpServer {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("name", &self.inner.name)
            .field("version", &self.inner.version)
            .field("tools", &self.inner.tools)
            .finish()
    }
}

impl McpServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>, tools: ToolSet) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                version: version.into(),
                instructions: None,
                tools,
            }),
        }
    }

    /// Attach usage instructions returned from `initialize`.
    ///
    /// Call before cloning the server.
    pub fn with_instructions(self, instructions: impl Into<String>) -> Self {
        let inner = match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                inner.instructions = Some(instructions.into());
                inner
            }
            Err(shared) => return Self { inner: shared },
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn tools(&self) -> &ToolSet {
        &self.inner.tools
    }

    /// Serve on the process's stdin/stdout until the client disconnects.
    pub async fn serve_stdio(self) -> std::io::Result<()> {
        info!(
            "{} v{} serving {} tools on stdio",
            self.inner.name,
            self.inner.version,
            self.inner.tools.len()
        );
        let running = self.serve(stdio()).await.map_err(std::io::Error::other)?;
        running.waiting().await.map_err(std::io::Error::other)?;
        Ok(())
    }

    /// Serve on arbitrary streams until the peer disconnects.
    pub async fn serve_streams<R, W>(self, reader: R, writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let running = self.serve((reader, writer)).await.map_err(std::io::Error::other)?;
        running.waiting().await.map_err(std::io::Error::other)?;
        Ok(())
    }

    /// Run one tool call, as `tools/call` does.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, Value>>,
    ) -> Result<CallToolResult, ErrorData> {
        if !self.inner.tools.contains(name) {
            return Err(ErrorData::invalid_params(format!("Unknown tool: {name}"), None));
        }
        let arguments = Value::Object(arguments.unwrap_or_default());
        Ok(to_call_result(self.inner.tools.execute(name, arguments).await))
    }

    /// The definitions advertised by `tools/list`.
    pub fn mcp_tools(&self) -> Vec<McpTool> {
        self.inner.tools.definitions().into_iter().map(to_mcp_tool).collect()
    }
}

// ── rmcp adapter ───────────────────────────────────────────────────

fn to_mcp_tool(def: ToolDef) -> McpTool {
    let schema = match def.input_schema {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    let mut tool = McpTool::new(def.name, def.description, Arc::new(schema));
    tool.title = def.title;
    tool
}

fn to_call_result(result: ToolResult) -> CallToolResult {
    let content: Vec<Content> = result.content.into_iter().map(|c| Content::text(c.text)).collect();
    let mut out = if result.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    };
    out.structured_content = result.structured_content;
    out
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.inner.name.clone(),
                version: self.inner.version.clone(),
                ..Implementation::from_build_env()
            },
            instructions: self.inner.instructions.clone(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = self.mcp_tools();
        debug!("Listing {} tools", tools.len());
        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        self.call(request.name.as_ref(), request.arguments).await
    }
}
