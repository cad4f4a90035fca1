//! Error taxonomy shared by every tool.
//!
//! Each failure a tool can hit maps onto one [`ToolError`] variant. The
//! variants group into four [`ErrorKind`]s so callers can tell "fix your
//! input" apart from "the upstream is down" or "set an environment variable".
//! Errors never escape a tool call: the pipeline renders them into an
//! error envelope with [`ToolResult::failure`](crate::tools::ToolResult::failure).

use std::path::PathBuf;

/// Coarse classification of a [`ToolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any external call (bad URL, bad path, bad arguments).
    Validation,
    /// Network, HTTP status, or provider API failure.
    External,
    /// Local filesystem failure (missing input file, unwritable output).
    Resource,
    /// Required configuration (API key) is absent.
    Configuration,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::External => write!(f, "external"),
            ErrorKind::Resource => write!(f, "resource"),
            ErrorKind::Configuration => write!(f, "configuration"),
        }
    }
}

/// Every way a tool invocation can fail.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{var} environment variable not set")]
    MissingConfig { var: &'static str },

    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("request failed: {0}")]
    Network(String),

    #[error("no extractable content at {url}")]
    EmptyContent { url: String },

    #[error("fetching {url} is disallowed by robots.txt")]
    RobotsDisallowed { url: String },

    #[error("{provider} {operation} failed: {message}")]
    Provider {
        provider: &'static str,
        operation: &'static str,
        message: String,
    },

    #[error("failed to read '{}': {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{}': {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Shorthand for [`ToolError::InvalidInput`].
    pub fn invalid(message: impl Into<String>) -> Self {
        ToolError::InvalidInput(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::InvalidInput(_) => ErrorKind::Validation,
            ToolError::MissingConfig { .. } => ErrorKind::Configuration,
            ToolError::Http { .. }
            | ToolError::Timeout { .. }
            | ToolError::Network(_)
            | ToolError::EmptyContent { .. }
            | ToolError::RobotsDisallowed { .. }
            | ToolError::Provider { .. } => ErrorKind::External,
            ToolError::ReadFile { .. } | ToolError::WriteFile { .. } => ErrorKind::Resource,
        }
    }

    /// Whether retrying the same call could plausibly succeed.
    ///
    /// Rate limits, server errors, timeouts, and connection failures are
    /// transient. Client errors (400, 401, 403, 404, 422) never are.
    pub fn is_transient(&self) -> bool {
        match self {
            ToolError::Http { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            ToolError::Timeout { .. } | ToolError::Network(_) => true,
            _ => false,
        }
    }

    /// Map a `reqwest` transport error, keeping timeouts distinguishable.
    pub fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            ToolError::Timeout { ms: timeout_ms }
        } else if let Some(status) = err.status() {
            ToolError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            }
        } else {
            ToolError::Network(err.to_string())
        }
    }
}
