//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to the broker:
//!     → timeouts.rs (per-call deadline)
//!     → On transient failure: backoff.rs (fixed interval, cancellable)
//!     → try again, without a ceiling
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - The delay between attempts never grows
//! - Every wait ends early when shutdown is requested

pub mod backoff;
pub mod timeouts;

pub use backoff::{sleep_or_cancel, FixedBackoff};
pub use timeouts::{bounded, DeadlineExceeded};
