//! `relay-llm` MCP server.
//!
//! Speaks newline-delimited JSON-RPC on stdin/stdout with logs on stderr.
//! Gemini tools need `GOOGLE_API_KEY` and Perplexity tools need
//! `PERPLEXITY_API_KEY`. Tools whose key is missing stay listed and report
//! the missing variable when called.
//!
//! # Examples
//!
//! ```sh
//! relay-llm
//! relay-llm list-tools
//! relay-llm call search_perplexity --args '{"query": "rust 2024 edition"}'
//! ```

use std::sync::Arc;

use clap::{Parser, Subcommand};
use relay_core::prelude::*;
use relay_llm::{INSTRUCTIONS, LlmConfig, SERVER_NAME};

/// MCP server exposing Gemini and Perplexity.
#[derive(Parser)]
#[command(name = "relay-llm", version)]
struct Cli {
    /// Log filter used when RELAY_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Retries for transient Gemini failures.
    #[arg(long, default_value_t = 0)]
    gemini_retries: u32,

    /// Retries for transient Perplexity failures.
    #[arg(long, default_value_t = 3)]
    perplexity_retries: u32,

    /// Skip JSON-schema validation of tool arguments.
    #[arg(long)]
    no_arg_validation: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve MCP over stdio (default).
    Serve,
    /// Print the tool definitions as JSON.
    ListTools,
    /// Run a single tool call and print the result as JSON.
    Call {
        /// Tool name.
        tool: String,
        /// JSON arguments object.
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = LlmConfig {
        gemini_retries: cli.gemini_retries,
        perplexity_retries: cli.perplexity_retries,
        arg_validation: !cli.no_arg_validation,
    };
    let keys = ProviderKeys::from_env();
    if keys.google.is_none() {
        tracing::warn!("GOOGLE_API_KEY not set; Gemini tools will report a configuration error");
    }
    if keys.perplexity.is_none() {
        tracing::warn!("PERPLEXITY_API_KEY not set; Perplexity tools will report a configuration error");
    }

    let cache = Arc::new(ResponseCache::default());
    let tools = config
        .build_tool_set(&keys, cache)
        .map_err(|e| format!("failed to build tools: {e}"))?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => McpServer::new(SERVER_NAME, env!("CARGO_PKG_VERSION"), tools)
            .with_instructions(INSTRUCTIONS)
            .serve_stdio()
            .await
            .map_err(|e| format!("server stopped: {e}")),
        Command::ListTools => {
            let defs = serde_json::to_string_pretty(&tools.definitions()).map_err(|e| e.to_string())?;
            println!("{defs}");
            Ok(())
        }
        Command::Call { tool, args } => {
            let arguments: serde_json::Value =
                serde_json::from_str(&args).map_err(|e| format!("--args is not valid JSON: {e}"))?;
            let result = tools.execute(&tool, arguments).await;
            let out = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
            println!("{out}");
            if result.is_error {
                return Err(format!("{tool} returned an error"));
            }
            Ok(())
        }
    }
}
