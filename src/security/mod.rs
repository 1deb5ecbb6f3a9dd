//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Proxied request:
//!     → store_base.rs (allow-list the upstream target before any fetch)
//!
//! Every response:
//!     → headers.rs (CSP, nosniff, frame denial, HSTS)
//! ```
//!
//! # Design Decisions
//! - Allow-list, not deny-list, for upstream targets
//! - Fail closed: an unvalidated target is never dereferenced
//! - No trust in client input

pub mod headers;
pub mod store_base;

pub use headers::{apply_security_headers, security_headers_middleware};
pub use store_base::{
    is_valid_store_base, AllowAnyStoreBase, HealthcareApiValidator, StoreBaseValidator,
};
