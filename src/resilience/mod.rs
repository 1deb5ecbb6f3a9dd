//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream store:
//!     → timeouts.rs (deadline for the upstream response head)
//!     → on failure: surface 502/504 to the caller
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - No retries: the proxy is transparent and the caller owns retry policy

pub mod timeouts;
