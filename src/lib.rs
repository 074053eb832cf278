//! Event Grid subscriber module for IoT Edge.
//!
//! Obtains certificates from the edge security daemon, serves a TLS webhook
//! for event delivery and, when configured, registers its own subscription
//! with the Event Grid edge broker.

pub mod config;
pub mod eventgrid;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::schema::{HostSettings, SubscriberConfig};
pub use http::WebhookHost;
pub use lifecycle::{Bootstrap, BootstrapError, Shutdown};
