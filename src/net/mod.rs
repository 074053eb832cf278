//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Issued server certificate
//!     → tls.rs (rustls server config)
//!     → Webhook host listener
//!
//! Issued client identity + trust store
//!     → tls.rs (mutual TLS HTTP client)
//!     → Event Grid client
//! ```

pub mod tls;

pub use tls::{install_crypto_provider, mutual_tls_client, server_config};
