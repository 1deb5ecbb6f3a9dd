//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default port used when neither the config file nor `PORT` sets one.
pub const DEFAULT_PORT: u16 = 3000;

/// Root configuration for the SPA server and FHIR proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Static SPA bundle settings.
    pub static_files: StaticFilesConfig,

    /// FHIR reverse proxy settings.
    pub proxy: FhirProxyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServerConfig {
    /// Replace the port of the bind address, keeping the host part.
    pub fn set_port(&mut self, port: u16) {
        let host = self
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        self.listener.bind_address = format!("{}:{}", host, port);
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{}", DEFAULT_PORT),
        }
    }
}

/// Where the built SPA lives and how it is laid out.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Content root directory holding the built bundle.
    pub content_root: String,

    /// Entry document served at `/` and for every unresolved path.
    pub index_document: String,

    /// Request path prefix of content-hashed assets (cached forever).
    pub assets_prefix: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            content_root: "./dist".to_string(),
            index_document: "index.html".to_string(),
            assets_prefix: "/assets/".to_string(),
        }
    }
}

/// FHIR proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FhirProxyConfig {
    /// Request path prefix routed to the proxy.
    pub path_prefix: String,

    /// Request header carrying the upstream store base URL.
    pub store_base_header: String,

    /// Upstream connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Time allowed until upstream response headers arrive, in seconds.
    pub upstream_timeout_secs: u64,
}

impl Default for FhirProxyConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/fhir".to_string(),
            store_base_header: "X-Store-Base".to_string(),
            connect_timeout_secs: 10,
            upstream_timeout_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human readable or JSON lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
        assert_eq!(config.static_files.content_root, "./dist");
        assert_eq!(config.proxy.path_prefix, "/fhir");
        assert_eq!(config.proxy.store_base_header, "X-Store-Base");
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [static_files]
            content_root = "/srv/cinder"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.static_files.content_root, "/srv/cinder");
        assert_eq!(config.static_files.index_document, "index.html");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.proxy.upstream_timeout_secs, 30);
    }

    #[test]
    fn test_set_port() {
        let mut config = ServerConfig::default();
        config.set_port(8088);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8088");

        config.listener.bind_address = "127.0.0.1:1".to_string();
        config.set_port(0);
        assert_eq!(config.listener.bind_address, "127.0.0.1:0");
    }
}
