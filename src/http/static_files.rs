//! Static SPA bundle serving.
//!
//! # Responsibilities
//! - Resolve request paths to files inside the content root
//! - Content type by extension, gzip for text formats when accepted
//! - Long-lived caching for content-hashed assets
//! - Fall back to the entry document for anything unresolved
//!
//! # Design Decisions
//! - Containment is checked on canonical paths, after percent-decoding and
//!   dot-segment removal, so encoded traversal and symlinks cannot escape
//! - Unknown paths are not 404s; the client-side router takes over
//! - Gzip runs on the blocking pool

use std::io::Write;
use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use flate2::{write::GzEncoder, Compression};
use tokio_util::io::ReaderStream;

use crate::config::StaticFilesConfig;
use crate::observability::metrics::RouteKind;

pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

const COMPRESSIBLE_EXTENSIONS: &[&str] = &["js", "css", "html", "json", "svg", "xml", "txt"];

/// Failures while reading a resolved file. Handled by falling back.
#[derive(Debug, thiserror::Error)]
pub enum StaticFileError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("compression task failed: {0}")]
    Compression(#[from] tokio::task::JoinError),
}

/// Serves files from the built SPA bundle.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    root: PathBuf,
    index_document: String,
    assets_prefix: String,
}

impl StaticAssets {
    pub fn new(config: &StaticFilesConfig) -> Self {
        Self {
            root: PathBuf::from(&config.content_root),
            index_document: config.index_document.clone(),
            assets_prefix: config.assets_prefix.clone(),
        }
    }

    /// Serve `request_path`, or the entry document if it does not resolve.
    pub async fn serve(&self, request_path: &str, accept_gzip: bool) -> (RouteKind, Response) {
        if let Some(relative) = normalize_request_path(request_path) {
            if let Some(file) = self.resolve(&relative, request_path).await {
                let immutable = self.is_hashed_asset(&relative);
                match respond_with_file(&file, accept_gzip, immutable).await {
                    Ok(response) => return (RouteKind::Static, response),
                    Err(e) => {
                        tracing::warn!(path = %request_path, error = %e, "Static file unreadable, serving entry document");
                    }
                }
            }
        }

        let index = self.root.join(&self.index_document);
        match respond_with_file(&index, accept_gzip, false).await {
            Ok(response) => (RouteKind::Spa, response),
            Err(e) => {
                tracing::error!(path = %index.display(), error = %e, "Entry document unavailable");
                (RouteKind::Spa, (StatusCode::NOT_FOUND, "Not Found").into_response())
            }
        }
    }

    /// Whether a normalised path lies under the assets prefix.
    fn is_hashed_asset(&self, relative: &Path) -> bool {
        let prefix = self.assets_prefix.trim_matches('/');
        !prefix.is_empty() && relative.starts_with(prefix)
    }

    /// Map a normalised path to a regular file under the content root.
    async fn resolve(&self, relative: &Path, request_path: &str) -> Option<PathBuf> {
        let root = tokio::fs::canonicalize(&self.root).await.ok()?;
        let candidate = tokio::fs::canonicalize(root.join(relative)).await.ok()?;
        if !candidate.starts_with(&root) {
            tracing::warn!(path = %request_path, "Static path resolved outside content root");
            return None;
        }

        let metadata = tokio::fs::metadata(&candidate).await.ok()?;
        metadata.is_file().then_some(candidate)
    }
}

/// Decode and lexically normalise a request path into a relative path.
///
/// `..` never climbs above the root. Returns `None` for undecodable
/// input, NUL bytes, backslashes, or a path that reduces to the root.
pub fn normalize_request_path(raw: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(raw).ok()?;
    if decoded.contains('\0') || decoded.contains('\\') {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.into_iter().collect())
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// MIME type for the bundle's file extensions; `None` for anything else.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let content_type = match extension(path)? {
        "html" => "text/html;charset=utf-8",
        "js" => "text/javascript;charset=utf-8",
        "css" => "text/css;charset=utf-8",
        "json" => "application/json;charset=utf-8",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "png" => "image/png",
        "jpg" => "image/jpeg",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => return None,
    };
    Some(content_type)
}

pub fn is_compressible(path: &Path) -> bool {
    extension(path).is_some_and(|ext| COMPRESSIBLE_EXTENSIONS.contains(&ext))
}

/// True if the client listed gzip in `Accept-Encoding`.
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("gzip"))
}

pub fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

async fn respond_with_file(
    path: &Path,
    accept_gzip: bool,
    immutable: bool,
) -> Result<Response, StaticFileError> {
    let mut headers = HeaderMap::new();
    if let Some(content_type) = content_type_for(path) {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    if immutable {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE_CACHE_CONTROL));
    }

    if is_compressible(path) {
        headers.insert(header::VARY, HeaderValue::from_static("accept-encoding"));
        if accept_gzip {
            let raw = tokio::fs::read(path).await?;
            let compressed = tokio::task::spawn_blocking(move || gzip(&raw)).await??;
            headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            return Ok((headers, Body::from(compressed)).into_response());
        }
    }

    let file = tokio::fs::File::open(path).await?;
    let length = file.metadata().await?.len();
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}
