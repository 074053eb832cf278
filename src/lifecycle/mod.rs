//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Provision server cert + trust bundle → Start webhook host
//!     → [createEventGridSubscription] Validate → Connect → Wait
//!       → Poll topic → Register subscription
//!     → Wait for host shutdown
//!
//! Shutdown (shutdown.rs):
//!     Trigger (once) → Cancel token → Host drains → Release latch
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     Repeats → logged, ignored
//! ```
//!
//! # Design Decisions
//! - Ordered startup: certificates first, then the listener, then the broker
//! - A single cancellation token reaches every wait
//! - The signal listener holds the process open until the latch is released

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{Bootstrap, BootstrapError, Registration};
