//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGINT, and SIGTERM on unix)
//! - Translate the first signal into a shutdown trigger
//! - Hold the process open until the main flow releases the completion latch
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe), which replaces the default
//!   kill-on-signal behaviour for the lifetime of the listener
//! - Repeated signals are absorbed and logged, never escalated
//! - A handler that fails to install is logged and skipped

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;

/// Spawn the signal listener.
///
/// The task finishes once the completion latch is released.
pub fn spawn(shutdown: Arc<Shutdown>) -> JoinHandle<()> {
    let (tx, rx) = mpsc::channel(4);
    tokio::spawn(forward(Signals::install(), tx));
    tokio::spawn(listen(shutdown, rx))
}

/// Pump OS signals into the listener until it goes away.
async fn forward(mut signals: Signals, tx: mpsc::Sender<&'static str>) {
    loop {
        tokio::select! {
            _ = tx.closed() => return,
            name = signals.recv() => {
                if tx.send(name).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Turn termination notifications into a single shutdown trigger.
///
/// A closed notification channel only stops new triggers; the listener still
/// holds on until the completion latch is released.
async fn listen(shutdown: Arc<Shutdown>, mut notifications: mpsc::Receiver<&'static str>) {
    loop {
        tokio::select! {
            _ = shutdown.wait_completed() => {
                tracing::debug!("Shutdown complete, signal listener exiting");
                return;
            }
            Some(name) = notifications.recv() => {
                if shutdown.trigger() {
                    tracing::info!(signal = name, "Termination requested, shutting down gracefully");
                } else {
                    tracing::info!(signal = name, "Shutdown already in progress, waiting for it to finish");
                }
            }
        }
    }
}

struct Signals {
    #[cfg(unix)]
    terminate: Option<tokio::signal::unix::Signal>,
}

impl Signals {
    fn install() -> Self {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let terminate = match signal(SignalKind::terminate()) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler, continuing with Ctrl+C only");
                    None
                }
            };
            Self { terminate }
        }

        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    /// Wait for the next termination notification and return its name.
    async fn recv(&mut self) -> &'static str {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match self.terminate.as_mut() {
                Some(s) => {
                    if s.recv().await.is_none() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => "SIGINT",
            _ = terminate => "SIGTERM",
        }
    }
}
