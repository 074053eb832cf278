//! Configuration validation.
//!
//! # Responsibilities
//! - Turn the raw, optional-everywhere `eventGrid` section into `GridSettings`
//! - Report the first missing key by its full `configuration:...` path
//! - Reject zero-valued timing and size limits
//!
//! # Design Decisions
//! - Checks run in a fixed order: section → url → topic → subscription →
//!   subscription fields; the first failure wins
//! - Validation is a pure function: Option<GridConfiguration> → Result<GridSettings, ValidationError>
//! - Only runs when auto-registration is enabled

use thiserror::Error;

use crate::config::schema::{GridConfiguration, SubscriberConfig};

/// A required setting is absent or empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("GridConfiguration is null. Please configure the section {0}")]
    MissingSection(&'static str),

    #[error("Please configure {0}")]
    MissingKey(&'static str),

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

impl ValidationError {
    /// The configuration path that failed validation.
    pub fn key_path(&self) -> &'static str {
        match self {
            ValidationError::MissingSection(path)
            | ValidationError::MissingKey(path)
            | ValidationError::NotPositive(path) => path,
        }
    }
}

/// Validated `configuration:eventGrid` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSettings {
    /// Broker endpoint, shape not yet checked (see `EventGridEndpoint`).
    pub url: String,
    pub topic_name: String,
    pub subscription_name: String,
    pub event_schema: String,
    pub subscription_url: String,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Validate the raw grid section.
pub fn validate_grid(grid: Option<&GridConfiguration>) -> Result<GridSettings, ValidationError> {
    let grid = grid.ok_or(ValidationError::MissingSection("configuration:eventGrid"))?;

    let url = non_empty(&grid.url).ok_or(ValidationError::MissingKey("configuration:eventGrid:url"))?;

    let topic_name = grid
        .topic
        .as_ref()
        .and_then(|t| non_empty(&t.name))
        .ok_or(ValidationError::MissingKey("configuration:eventGrid:topic:name"))?;

    let subscription = grid
        .subscription
        .as_ref()
        .ok_or(ValidationError::MissingKey("configuration:eventGrid:subscription"))?;

    let subscription_name = non_empty(&subscription.name)
        .ok_or(ValidationError::MissingKey("configuration:eventGrid:subscription:name"))?;
    let event_schema = non_empty(&subscription.event_schema)
        .ok_or(ValidationError::MissingKey("configuration:eventGrid:subscription:eventSchema"))?;
    let subscription_url = non_empty(&subscription.url)
        .ok_or(ValidationError::MissingKey("configuration:eventGrid:subscription:url"))?;

    Ok(GridSettings {
        url: url.to_string(),
        topic_name: topic_name.to_string(),
        subscription_name: subscription_name.to_string(),
        event_schema: event_schema.to_string(),
        subscription_url: subscription_url.to_string(),
    })
}

/// Check that every timing and size limit is non-zero. The first zero found is reported.
pub fn validate_limits(config: &SubscriberConfig) -> Result<(), ValidationError> {
    let checks = [
        (
            config.bootstrap.topic_retry_interval_ms,
            "configuration:bootstrap:topicRetryIntervalMs",
        ),
        (config.bootstrap.request_timeout_ms, "configuration:bootstrap:requestTimeoutMs"),
        (config.webhook.max_body_bytes, "configuration:webhook:maxBodyBytes"),
    ];

    match checks.iter().find(|(value, _)| *value == 0) {
        Some((_, path)) => Err(ValidationError::NotPositive(path)),
        None => Ok(()),
    }
}
