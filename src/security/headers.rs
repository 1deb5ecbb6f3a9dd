//! Hardening headers added to every response.
//!
//! The CSP confines the SPA to its own origin plus the Google identity
//! endpoints, the Cloud Healthcare API and the tx.fhir.org terminology
//! server.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

pub const CONTENT_SECURITY_POLICY: &str = concat!(
    "default-src 'self'; ",
    "script-src 'self' https://accounts.google.com; ",
    "connect-src 'self' https://healthcare.googleapis.com https://tx.fhir.org ",
    "https://oauth2.googleapis.com https://accounts.google.com; ",
    "style-src 'self' 'unsafe-inline'; ",
    "img-src 'self' data:; ",
    "frame-ancestors 'none'",
);

const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("content-security-policy", CONTENT_SECURITY_POLICY),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
];

/// Set the security headers, replacing any value already present.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
}

/// Response decorator. Never rejects a request.
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut());
    response
}
