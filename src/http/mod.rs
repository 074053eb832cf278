//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TLS connection (net::tls server config)
//!     → server.rs (Axum setup, request ID, trace span, body limit)
//!     → webhook.rs (parse event or batch, log, count)
//!     → 200 / 400 / 413
//! ```

pub mod server;
pub mod webhook;

pub use server::{HostError, RunningHost, WebhookHost};
pub use webhook::{EventSummary, WebhookState};
