//! Timeout enforcement.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Timed-out upstream calls return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

/// Raised when a deadline passes before the wrapped future completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline of {0:?} elapsed")]
pub struct Elapsed(pub Duration);

/// Run `fut` to completion or fail with [`Elapsed`] after `limit`.
///
/// The inner future is dropped on timeout, which cancels any in-flight
/// connection it owns.
pub async fn with_deadline<F, T>(limit: Duration, fut: F) -> Result<T, Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Elapsed(limit))
}
