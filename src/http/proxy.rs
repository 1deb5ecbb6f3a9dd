//! FHIR reverse proxy.
//!
//! # Per-request flow
//! ```text
//! read store base header ──missing/invalid──▶ 400 JSON
//!     │
//!     ▼
//! target = store base + path + query (_cursor= → _page_token=)
//!     │
//!     ▼
//! forward method, Authorization, Content-Type, streamed body
//!     │
//!     ▼
//! relay status + headers (minus encoding/length/hop-by-hop) + streamed body
//! ```
//!
//! # Design Decisions
//! - Only `Authorization` and `Content-Type` go upstream; cookies,
//!   forwarding chains and every other client header stay behind
//! - The HTTP client decodes gzip itself, so the relayed response must
//!   not claim an encoding or length for bytes it no longer carries
//! - Bodies are streamed both ways; nothing is buffered
//! - No retries; upstream statuses are relayed verbatim
//! - Redirects are relayed, never followed: a `Location` target has not
//!   passed the store base allow-list

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, HttpBody},
    http::{header, HeaderMap, HeaderName, Request},
    response::{IntoResponse, Response},
};
use url::Url;

use crate::config::FhirProxyConfig;
use crate::http::response::ProxyError;
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;
use crate::security::StoreBaseValidator;

/// Cursor parameter name used by the SPA's FHIR client.
const CURSOR_PARAM: &str = "_cursor=";
/// Continuation parameter name the Cloud Healthcare API expects.
const PAGE_TOKEN_PARAM: &str = "_page_token=";

/// Inbound headers allowed to reach the upstream store.
const FORWARDED_REQUEST_HEADERS: [HeaderName; 2] = [header::AUTHORIZATION, header::CONTENT_TYPE];

/// Upstream response headers never relayed to the client.
const STRIPPED_RESPONSE_HEADERS: &[&str] = &[
    "content-encoding",
    "content-length",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Forwards `/fhir` requests to a caller-selected FHIR store.
pub struct FhirProxy {
    client: reqwest::Client,
    validator: Arc<dyn StoreBaseValidator>,
    store_base_header: HeaderName,
    upstream_timeout: Duration,
}

impl FhirProxy {
    pub fn new(
        config: &FhirProxyConfig,
        validator: Arc<dyn StoreBaseValidator>,
    ) -> Result<Self, ProxyBuildError> {
        let store_base_header = HeaderName::try_from(config.store_base_header.as_str())?;
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            validator,
            store_base_header,
            upstream_timeout: Duration::from_secs(config.upstream_timeout_secs),
        })
    }

    /// Handle one proxied request. Every failure becomes a response.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        match self.forward(request).await {
            Ok(response) => response,
            Err(err) => {
                if let Some(kind) = err.upstream_kind() {
                    metrics::record_upstream_error(kind);
                    tracing::error!(error = %err, source = ?std::error::Error::source(&err), "Upstream error");
                } else {
                    tracing::warn!(error = %err, "Rejected proxy request");
                }
                err.into_response()
            }
        }
    }

    async fn forward(&self, request: Request<Body>) -> Result<Response, ProxyError> {
        let store_base = self.store_base(request.headers())?;
        let target = build_target_url(&store_base, request.uri().path(), request.uri().query())
            .ok_or_else(|| self.invalid_store_base())?;

        let (parts, body) = request.into_parts();

        tracing::debug!(
            method = %parts.method,
            path = %parts.uri.path(),
            upstream_host = target.host_str().unwrap_or_default(),
            "Proxying request"
        );

        let mut outbound = self
            .client
            .request(parts.method, target)
            .headers(forwarded_headers(&parts.headers));
        if body.size_hint().exact() != Some(0) {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = with_deadline(self.upstream_timeout, outbound.send())
            .await
            .map_err(|elapsed| ProxyError::UpstreamTimeout(elapsed.0))?
            .map_err(ProxyError::Upstream)?;

        tracing::info!(status = %upstream.status(), "Upstream responded");

        Ok(relay_response(upstream))
    }

    fn store_base(&self, headers: &HeaderMap) -> Result<String, ProxyError> {
        let value = headers
            .get(&self.store_base_header)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProxyError::MissingStoreBase {
                header: self.store_base_header_name(),
            })?;

        let store_base = value.to_str().map_err(|_| self.invalid_store_base())?;
        if !self.validator.is_valid(store_base) {
            return Err(self.invalid_store_base());
        }
        Ok(store_base.to_string())
    }

    fn invalid_store_base(&self) -> ProxyError {
        ProxyError::InvalidStoreBase {
            header: self.store_base_header_name(),
        }
    }

    fn store_base_header_name(&self) -> String {
        display_header_name(self.store_base_header.as_str())
    }
}

/// Construction failures of [`FhirProxy`].
#[derive(Debug, thiserror::Error)]
pub enum ProxyBuildError {
    #[error("invalid store base header name: {0}")]
    HeaderName(#[from] axum::http::header::InvalidHeaderName),
    #[error("failed to build upstream HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// `x-store-base` → `X-Store-Base`, for messages.
fn display_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Rename the pagination cursor for the upstream dialect.
///
/// Plain text substitution over the raw query so ordering and encoding
/// of every other parameter survive byte for byte.
pub fn rewrite_cursor_param(query: &str) -> String {
    query.replace(CURSOR_PARAM, PAGE_TOKEN_PARAM)
}

/// Compose the upstream URL for a validated store base.
///
/// Returns `None` if the result does not parse, or if dot segments in
/// `path` would lead outside the store base once normalised.
pub fn build_target_url(store_base: &str, path: &str, query: Option<&str>) -> Option<Url> {
    let base = Url::parse(store_base).ok()?;

    let mut target = format!("{}{}", store_base, path);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(&rewrite_cursor_param(query));
    }
    let target = Url::parse(&target).ok()?;

    let base_path = base.path().trim_end_matches('/');
    let stays_in_store = target
        .path()
        .strip_prefix(base_path)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));

    (target.origin() == base.origin() && stays_in_store).then_some(target)
}

/// Build the reduced outbound header set.
pub fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::new();
    for name in FORWARDED_REQUEST_HEADERS {
        if let Some(value) = inbound.get(&name) {
            outbound.insert(name, value.clone());
        }
    }
    outbound
}

/// Copy upstream headers minus the ones the relay must not repeat.
pub fn relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    for name in STRIPPED_RESPONSE_HEADERS {
        headers.remove(*name);
    }
    headers
}

fn relay_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let headers = relay_headers(upstream.headers());

    // Dropping this body (client gone) drops the upstream stream and its connection.
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
