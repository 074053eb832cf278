//! Event Grid edge broker integration.
//!
//! # Data Flow
//! ```text
//! GridSettings (validated)
//!     → registration.rs (build the subscription descriptor, fail fast on schema)
//!     → connector.rs (client identity → mutual TLS client)
//!     → readiness.rs (poll GET /topics/{topic} until it exists)
//!     → registration.rs (PUT /topics/{topic}/eventSubscriptions/{name}, once)
//! ```
//!
//! # Design Decisions
//! - `EventGridApi` is the seam between orchestration and HTTP, so the
//!   bootstrap flow can run against a scripted broker
//! - Polling is unbounded; registration is a single attempt

pub mod client;
pub mod connector;
pub mod readiness;
pub mod registration;
pub mod types;

pub use client::{EventGridApi, EventGridClient, EventGridEndpoint, API_VERSION};
pub use connector::{ConnectError, EventGridConnector, MutualTlsConnector};
pub use readiness::TopicPoller;
pub use registration::{build_subscription, register_subscription};
pub use types::{
    EventDeliverySchema, EventGridError, EventGridResult, EventSubscription,
    EventSubscriptionDestination, Topic, UnknownDeliverySchema,
};
