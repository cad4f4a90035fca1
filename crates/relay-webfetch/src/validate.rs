//! Input validation that runs before any network or filesystem access.
//!
//! URLs must be `http`/`https` and must not name a local or private host.
//! The host check is literal: hostnames are never resolved, so a public name
//! pointing at a private address is not caught here.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Component, Path, PathBuf};

use relay_core::error::ToolError;
use url::{Host, Url};

/// Longest file stem produced by [`sanitize_filename`].
pub const MAX_FILENAME_CHARS: usize = 100;

// ── URLs ───────────────────────────────────────────────────────────

/// Parse `raw` and reject anything that is not a public http(s) URL.
pub fn validate_url(raw: &str) -> Result<Url, ToolError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ToolError::invalid("URL must not be empty"));
    }
    let url = Url::parse(trimmed).map_err(|e| ToolError::invalid(format!("invalid URL '{trimmed}': {e}")))?;
    check_url(&url)?;
    Ok(url)
}

/// Scheme and host checks on an already-parsed URL.
///
/// Also applied to every redirect hop.
pub fn check_url(url: &Url) -> Result<(), ToolError> {
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ToolError::invalid(format!(
                "unsupported URL scheme '{other}': only http and https are allowed"
            )));
        }
    }
    let host = url
        .host()
        .ok_or_else(|| ToolError::invalid(format!("URL '{url}' has no host")))?;
    if is_private_host(&host) {
        return Err(ToolError::invalid(format!(
            "refusing to fetch local or private address '{host}'"
        )));
    }
    Ok(())
}

/// Whether a host is localhost, loopback, link-local, private, or unspecified.
pub fn is_private_host<S: AsRef<str>>(host: &Host<S>) -> bool {
    match host {
        Host::Domain(name) => {
            let name = name.as_ref().trim_end_matches('.').to_ascii_lowercase();
            name == "localhost" || name.ends_with(".localhost")
        }
        Host::Ipv4(ip) => is_private_ipv4(ip),
        Host::Ipv6(ip) => is_private_ipv6(ip),
    }
}

fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()
}

fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(&v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00 // fc00::/7 unique local
        || (first & 0xffc0) == 0xfe80 // fe80::/10 link local
}

// ── Output paths ───────────────────────────────────────────────────

/// Accept only relative paths that stay inside the output root.
pub fn validate_output_path(raw: &str) -> Result<PathBuf, ToolError> {
    if raw.trim().is_empty() {
        return Err(ToolError::invalid("outputPath must not be empty"));
    }
    let path = Path::new(raw);
    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(ToolError::invalid(format!(
                    "outputPath '{raw}' must not contain '..'"
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ToolError::invalid(format!(
                    "outputPath '{raw}' must be a relative path"
                )));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(path.to_path_buf())
}

/// Lowercase, collapse every run of non-alphanumerics into `-`, trim dashes,
/// cap at [`MAX_FILENAME_CHARS`]. Never returns an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    let capped: String = out.chars().take(MAX_FILENAME_CHARS).collect();
    let capped = capped.trim_end_matches('-');
    if capped.is_empty() {
        "untitled".to_string()
    } else {
        capped.to_string()
    }
}
