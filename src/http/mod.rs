//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch by path prefix)
//!     → request.rs (request ID, trace span)
//!     → proxy.rs (/fhir → upstream FHIR store)
//!       or static_files.rs (bundle file or SPA entry document)
//!     → response.rs (error bodies)
//!     → security headers on the way out
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;

pub use proxy::FhirProxy;
pub use request::X_REQUEST_ID;
pub use response::ProxyError;
pub use server::HttpServer;
pub use static_files::StaticAssets;
