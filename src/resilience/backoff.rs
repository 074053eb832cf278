//! Fixed-interval backoff.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Constant delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    interval: Duration,
}

impl FixedBackoff {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Delay before every retry.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep for the interval. Returns `false` if cancelled first.
    pub async fn wait(&self, shutdown: &CancellationToken) -> bool {
        sleep_or_cancel(self.interval, shutdown).await
    }
}

/// Sleep for `duration` unless `shutdown` fires first.
///
/// Returns `true` when the full duration elapsed.
pub async fn sleep_or_cancel(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = shutdown.cancelled() => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_interval_never_grows() {
        let backoff = FixedBackoff::from_millis(30_000);
        assert_eq!(backoff.interval(), Duration::from_secs(30));

        let token = CancellationToken::new();
        for _ in 0..5 {
            let start = tokio::time::Instant::now();
            assert!(backoff.wait(&token).await);
            assert_eq!(start.elapsed(), Duration::from_secs(30));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_elapses_full_interval() {
        let backoff = FixedBackoff::from_millis(30_000);
        let token = CancellationToken::new();
        let start = tokio::time::Instant::now();
        assert!(backoff.wait(&token).await);
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_ends_on_cancel() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let start = tokio::time::Instant::now();
        assert!(!sleep_or_cancel(Duration::from_secs(120), &token).await);
        assert!(start.elapsed() < Duration::from_secs(120));
    }
}
