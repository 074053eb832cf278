//! Timeout enforcement.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The wrapped call did not finish within its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {0:?} exceeded")]
pub struct DeadlineExceeded(pub Duration);

/// Run `fut` with a deadline. The future is dropped when the deadline passes.
pub async fn bounded<F>(limit: Duration, fut: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DeadlineExceeded(limit))
}
