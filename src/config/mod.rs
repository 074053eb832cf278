//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! HostSettings.json (or .toml)
//!     → loader.rs (parse, overlay `configuration__*` environment variables,
//!                  lowercase keys)
//!     → schema.rs (typed HostSettings with defaults)
//!     → validation.rs (eventGrid section → GridSettings, only when
//!                      createEventGridSubscription is set)
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once loaded; no hot reload
//! - Environment always wins over the file, matching keys case-insensitively
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, settings_path, ConfigError};
pub use schema::{
    BootstrapConfig, GridConfiguration, HostSettings, ObservabilityConfig, SubscriberConfig,
    WebhookConfig,
};
pub use validation::{validate_grid, validate_limits, GridSettings, ValidationError};
