//! Asset classification for multimodal inputs and fetch targets.
//!
//! A multimodal argument (image, PDF, audio clip) arrives as a single string
//! that is either a remote URL, a local file path, or inline content. The
//! string is classified once into an [`AssetSource`] and then resolved into a
//! [`ProcessedAsset`] that provider clients can send as a URL reference or a
//! base64 payload.
//!
//! The same module owns the plain-text extension allow-list that decides how
//! a URL is fetched ([`FetchStrategy`]).

use base64::Engine as _;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::error::ToolError;

/// Fallback mime type when nothing better is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Coarse media class of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Document,
    Video,
    Audio,
    /// Plain text served as-is (source files, markdown, JSON, ...).
    Text,
}

impl AssetKind {
    /// Classify a mime type by its top-level type.
    pub fn for_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("image/") {
            AssetKind::Image
        } else if mime.starts_with("video/") {
            AssetKind::Video
        } else if mime.starts_with("audio/") {
            AssetKind::Audio
        } else {
            AssetKind::Document
        }
    }
}

/// Where an asset string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// `http://` or `https://` URL, passed through by reference.
    Remote(String),
    /// Path starting with `/`, `./` or `../`, read from disk.
    LocalPath(PathBuf),
    /// Anything else: already-encoded content.
    Inline(String),
}

impl AssetSource {
    pub fn classify(data: &str) -> Self {
        if data.starts_with("http://") || data.starts_with("https://") {
            AssetSource::Remote(data.to_string())
        } else if data.starts_with('/') || data.starts_with("./") || data.starts_with("../") {
            AssetSource::LocalPath(PathBuf::from(data))
        } else {
            AssetSource::Inline(data.to_string())
        }
    }
}

/// A resolved asset ready to hand to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedAsset {
    pub kind: AssetKind,
    pub mime_type: String,
    /// The original URL when `is_remote`, otherwise base64 content.
    pub payload: String,
    pub is_remote: bool,
}

impl ProcessedAsset {
    /// Render as a URL: the remote URL itself, or a `data:` URL.
    pub fn to_url(&self) -> String {
        if self.is_remote {
            self.payload.clone()
        } else {
            format!("data:{};base64,{}", self.mime_type, self.payload)
        }
    }

    /// Replace an unknown (`application/octet-stream`) mime type.
    pub fn or_mime(mut self, fallback: &str) -> Self {
        if self.mime_type == OCTET_STREAM {
            self.mime_type = fallback.to_string();
            self.kind = AssetKind::for_mime(fallback);
        }
        self
    }
}

/// Resolve an asset string into a [`ProcessedAsset`].
///
/// `declared_mime` wins over anything guessed from a path or URL. Local
/// files are read fully and base64-encoded (standard alphabet). A local file
/// that cannot be read fails with [`ToolError::ReadFile`].
pub async fn process_asset(
    data: &str,
    declared_mime: Option<&str>,
) -> Result<ProcessedAsset, ToolError> {
    let declared = declared_mime.filter(|m| !m.trim().is_empty());
    match AssetSource::classify(data) {
        AssetSource::Remote(url) => {
            let mime = declared
                .map(str::to_string)
                .unwrap_or_else(|| guess_mime(strip_query(&url)));
            Ok(ProcessedAsset {
                kind: AssetKind::for_mime(&mime),
                mime_type: mime,
                payload: url,
                is_remote: true,
            })
        }
        AssetSource::LocalPath(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| ToolError::ReadFile {
                    path: path.clone(),
                    source,
                })?;
            debug!("Read local asset {} ({} bytes)", path.display(), bytes.len());
            let mime = declared
                .map(str::to_string)
                .unwrap_or_else(|| guess_mime(&path.to_string_lossy()));
            Ok(ProcessedAsset {
                kind: AssetKind::for_mime(&mime),
                mime_type: mime,
                payload: base64::engine::general_purpose::STANDARD.encode(bytes),
                is_remote: false,
            })
        }
        AssetSource::Inline(content) => {
            let mime = declared.unwrap_or(OCTET_STREAM).to_string();
            Ok(ProcessedAsset {
                kind: AssetKind::for_mime(&mime),
                mime_type: mime,
                payload: content,
                is_remote: false,
            })
        }
    }
}

fn guess_mime(path: &str) -> String {
    mime_guess::from_path(Path::new(path))
        .first_raw()
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url.get(..end).unwrap_or(url)
}

// ── Fetch strategy ─────────────────────────────────────────────────

/// Extensions served verbatim instead of going through HTML extraction.
///
/// HTML itself is deliberately absent: `.html`/`.htm` pages need extraction.
pub const PLAIN_TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".markdown", ".json", ".xml", ".csv", ".yaml", ".yml", ".toml", ".ini",
    ".env", ".conf", ".config", ".js", ".ts", ".jsx", ".tsx", ".mjs", ".cjs", ".py", ".rb",
    ".php", ".pl", ".sh", ".bash", ".c", ".cpp", ".h", ".hpp", ".rs", ".go", ".java", ".kt",
    ".swift", ".dart", ".css", ".scss", ".sass", ".less", ".log",
];

/// Whether a URL path ends in an allow-listed plain-text extension.
///
/// Only the final path segment is inspected, case-insensitively.
pub fn is_plain_text_path(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or_default().to_lowercase();
    match segment.rsplit_once('.') {
        Some((_, ext)) => {
            let dotted = format!(".{ext}");
            PLAIN_TEXT_EXTENSIONS.contains(&dotted.as_str())
        }
        None => false,
    }
}

pub fn is_plain_text_url(url: &Url) -> bool {
    is_plain_text_path(url.path())
}

/// How a URL is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStrategy {
    /// Direct GET, body used as-is.
    PlainText,
    /// HTML fetch followed by Markdown extraction.
    Extract,
}

impl FetchStrategy {
    pub fn for_url(url: &Url) -> Self {
        if is_plain_text_url(url) {
            FetchStrategy::PlainText
        } else {
            FetchStrategy::Extract
        }
    }

    /// Asset class of the content this strategy produces.
    pub fn kind(self) -> AssetKind {
        match self {
            FetchStrategy::PlainText => AssetKind::Text,
            FetchStrategy::Extract => AssetKind::Document,
        }
    }
}
