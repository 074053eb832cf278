//! Shutdown coordination for the subscriber.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Coordinator for graceful shutdown.
///
/// Holds the cancellation token every long-running task observes, plus a
/// completion latch the signal listener blocks on until the main flow has
/// finished tearing down the webhook host.
pub struct Shutdown {
    token: CancellationToken,
    triggered: AtomicBool,
    completed: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (completed, _) = watch::channel(false);
        Self {
            token: CancellationToken::new(),
            triggered: AtomicBool::new(false),
            completed,
        }
    }

    /// Token observed by long-running components.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request cancellation.
    ///
    /// Returns `true` only for the call that performed the transition;
    /// concurrent and repeated calls are no-ops.
    pub fn trigger(&self) -> bool {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.token.cancel();
        true
    }

    /// Whether cancellation has been requested.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Release the completion latch. Returns `true` the first time only.
    pub fn complete(&self) -> bool {
        !self.completed.send_replace(true)
    }

    /// Whether the completion latch has been released.
    pub fn is_completed(&self) -> bool {
        *self.completed.borrow()
    }

    /// Block until `complete` has been called.
    pub async fn wait_completed(&self) {
        let mut rx = self.completed.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|done| *done).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
