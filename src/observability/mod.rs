//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Request IDs are attached by the webhook host and appear on its spans
//! - Metrics are cheap to record and free when no exporter is installed

pub mod logging;
pub mod metrics;

use thiserror::Error;

/// Failure to install a process-wide logging or metrics backend.
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("failed to initialize tracing: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}
