//! Error responses.
//!
//! # Responsibilities
//! - Map proxy failures to HTTP status codes
//! - Render them as `{ "error": "..." }` JSON bodies
//!
//! # Design Decisions
//! - Upstream non-2xx responses are not errors here; they are relayed
//! - Transport failure details go to the log, not to the client

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Body shape of every error this server generates.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Render a JSON error response.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Failures of the FHIR proxy handler.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("{header} header is required and must be a valid GCP Healthcare API FHIR store URL")]
    MissingStoreBase { header: String },

    #[error("{header} header must be a valid GCP Healthcare API FHIR store URL")]
    InvalidStoreBase { header: String },

    #[error("Upstream FHIR store did not respond within {} seconds", .0.as_secs())]
    UpstreamTimeout(Duration),

    #[error("Upstream request failed")]
    Upstream(#[source] reqwest::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingStoreBase { .. } | ProxyError::InvalidStoreBase { .. } => {
                StatusCode::BAD_REQUEST
            }
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Label for the upstream error counter, if this is an upstream failure.
    pub fn upstream_kind(&self) -> Option<&'static str> {
        match self {
            ProxyError::UpstreamTimeout(_) => Some("timeout"),
            ProxyError::Upstream(e) if e.is_connect() => Some("connect"),
            ProxyError::Upstream(_) => Some("transport"),
            _ => None,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        json_error(self.status(), self.to_string())
    }
}
