//! `relay-webfetch` MCP server.
//!
//! Speaks newline-delimited JSON-RPC on stdin/stdout. Logs go to stderr,
//! filtered by `RELAY_LOG` (falling back to `--log-level`). `askWebFetch`
//! needs `PERPLEXITY_API_KEY`; the other tools need nothing.
//!
//! # Examples
//!
//! ```sh
//! # Serve over stdio (default)
//! relay-webfetch --output-root ~/notes
//!
//! # Inspect the advertised tools
//! relay-webfetch list-tools
//!
//! # Run one call without an MCP client
//! relay-webfetch call fullWebFetch --args '{"url": "https://www.rust-lang.org/"}'
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use relay_core::prelude::*;
use relay_webfetch::options::FetchOptions;
use relay_webfetch::{INSTRUCTIONS, SERVER_NAME, WebFetchConfig};

/// MCP server that fetches web pages as plain text or Markdown.
#[derive(Parser)]
#[command(name = "relay-webfetch", version)]
struct Cli {
    /// Log filter used when RELAY_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Directory that saveWebFetch and crawlWebFetch write under.
    #[arg(long, default_value = ".")]
    output_root: PathBuf,

    /// Default User-Agent header.
    #[arg(long)]
    user_agent: Option<String>,

    /// Default cache directory reported in cache pointers.
    #[arg(long)]
    cache_dir: Option<String>,

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
    let mut defaults = FetchOptions::default();
    if let Some(ua) = cli.user_agent {
        defaults.user_agent = ua;
    }
    if let Some(dir) = cli.cache_dir {
        defaults.cache_dir = dir;
    }
    let config = WebFetchConfig {
        output_root: cli.output_root,
        defaults,
        arg_validation: !cli.no_arg_validation,
    };

    let cache = Arc::new(ResponseCache::default());
    let tools = config
        .build_tool_set(&ProviderKeys::from_env(), cache)
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
