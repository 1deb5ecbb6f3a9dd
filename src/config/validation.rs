//! Configuration validation.
//!
//! Serde handles the syntax; this pass checks values that must make sense
//! together before the server binds anything. All problems are reported
//! at once rather than stopping at the first.

use std::net::SocketAddr;

use axum::http::HeaderName;

use crate::config::schema::ServerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.static_files.content_root.trim().is_empty() {
        errors.push(ValidationError::new("static_files.content_root", "must not be empty"));
    }
    let index = &config.static_files.index_document;
    if index.trim().is_empty() || index.contains("..") {
        errors.push(ValidationError::new(
            "static_files.index_document",
            "must be a non-empty file name inside the content root",
        ));
    }
    if !config.static_files.assets_prefix.starts_with('/') {
        errors.push(ValidationError::new("static_files.assets_prefix", "must start with '/'"));
    }

    if !config.proxy.path_prefix.starts_with('/') || config.proxy.path_prefix.len() < 2 {
        errors.push(ValidationError::new(
            "proxy.path_prefix",
            "must start with '/' and name a path segment",
        ));
    }
    if HeaderName::try_from(config.proxy.store_base_header.as_str()).is_err() {
        errors.push(ValidationError::new(
            "proxy.store_base_header",
            format!("'{}' is not a valid header name", config.proxy.store_base_header),
        ));
    }
    if config.proxy.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("proxy.connect_timeout_secs", "must be greater than zero"));
    }
    if config.proxy.upstream_timeout_secs == 0 {
        errors.push(ValidationError::new("proxy.upstream_timeout_secs", "must be greater than zero"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
