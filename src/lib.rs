//! Cinder server: serves the Cinder FHIR browser SPA and proxies its FHIR
//! REST calls to Cloud Healthcare API stores.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
