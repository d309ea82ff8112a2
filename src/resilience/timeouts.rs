//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap upstream calls with a deadline
//! - Cancel the wrapped future when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use crate::proxy::error::ProxyError;

/// Run `fut` to completion or fail with [`ProxyError::Timeout`] after `limit`.
///
/// The inner future is dropped on expiry, which aborts any in-flight
/// connection attempt or read it owns.
pub async fn with_timeout<F, T>(limit: Duration, fut: F) -> Result<T, ProxyError>
where
    F: Future<Output = Result<T, ProxyError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProxyError::Timeout(limit)),
    }
}
