//! Configuration schema definitions.
//!
//! This module defines the complete settings structure for the subscriber.
//! Keys are matched case-insensitively: the loader lowercases every key
//! before deserialization, so the serde names here are all lowercase.

use serde::{Deserialize, Deserializer, Serialize};

/// Root of `HostSettings.json`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "lowercase")]
pub struct HostSettings {
    /// Everything lives under the `configuration` section.
    pub configuration: SubscriberConfig,
}

/// The `configuration` section.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "lowercase")]
pub struct SubscriberConfig {
    /// Gates topic polling and subscription registration.
    #[serde(rename = "createeventgridsubscription", deserialize_with = "flexible_bool")]
    pub create_event_grid_subscription: bool,

    /// Event Grid connection and subscription details.
    ///
    /// Only validated when auto-registration is enabled.
    #[serde(rename = "eventgrid")]
    pub event_grid: Option<GridConfiguration>,

    /// Webhook listener settings.
    pub webhook: WebhookConfig,

    /// Bootstrap waits and per-call timeouts.
    pub bootstrap: BootstrapConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl SubscriberConfig {
    /// Whether a subscription should be created against the broker at startup.
    pub fn should_auto_create_subscription(&self) -> bool {
        self.create_event_grid_subscription
    }
}

/// Raw `configuration:eventGrid` section as read from file and environment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "lowercase")]
pub struct GridConfiguration {
    /// Broker endpoint, `<protocol>://<moduleName>:<portNo>`.
    pub url: Option<String>,
    pub topic: Option<TopicConfig>,
    pub subscription: Option<SubscriptionConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "lowercase")]
pub struct TopicConfig {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "lowercase")]
pub struct SubscriptionConfig {
    pub name: Option<String>,
    /// Delivery schema literal, e.g. `EventGridSchema`.
    #[serde(rename = "eventschema")]
    pub event_schema: Option<String>,
    /// Webhook endpoint the broker delivers to.
    pub url: Option<String>,
}

/// Webhook listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "lowercase")]
pub struct WebhookConfig {
    /// Bind address (e.g., "0.0.0.0:4430").
    #[serde(rename = "bindaddress")]
    pub bind_address: String,

    /// Route that receives event deliveries.
    pub path: String,

    /// Time allowed for in-flight deliveries to finish on shutdown.
    #[serde(rename = "shutdowngracesecs", deserialize_with = "flexible_u64")]
    pub shutdown_grace_secs: u64,

    /// Maximum accepted delivery body size in bytes.
    #[serde(rename = "maxbodybytes", deserialize_with = "flexible_u64")]
    pub max_body_bytes: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4430".to_string(),
            path: "/api/subscriber".to_string(),
            shutdown_grace_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Bootstrap timing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "lowercase")]
pub struct BootstrapConfig {
    /// Pause after the identity certificate is issued, giving it time to become current.
    #[serde(rename = "certificatepropagationms", deserialize_with = "flexible_u64")]
    pub certificate_propagation_ms: u64,

    /// Fixed delay between topic lookups.
    #[serde(rename = "topicretryintervalms", deserialize_with = "flexible_u64")]
    pub topic_retry_interval_ms: u64,

    /// Deadline for each call to the broker.
    #[serde(rename = "requesttimeoutms", deserialize_with = "flexible_u64")]
    pub request_timeout_ms: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            certificate_propagation_ms: 120_000,
            topic_retry_interval_ms: 30_000,
            request_timeout_ms: 30_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "lowercase")]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(rename = "loglevel")]
    pub log_level: String,

    /// `pretty` or `json`.
    #[serde(rename = "logformat")]
    pub log_format: String,

    /// Enable metrics endpoint.
    #[serde(rename = "metricsenabled", deserialize_with = "flexible_bool")]
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    #[serde(rename = "metricsaddress")]
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9600".to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrString {
    Bool(bool),
    String(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum U64OrString {
    Number(u64),
    String(String),
}

/// Environment overrides arrive as strings; accept `"true"` as well as `true`.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::String(s) => s
            .trim()
            .to_ascii_lowercase()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid boolean '{}'", s))),
    }
}

fn flexible_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match U64OrString::deserialize(deserializer)? {
        U64OrString::Number(n) => Ok(n),
        U64OrString::String(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid integer '{}'", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_when_section_missing() {
        let settings: HostSettings = serde_json::from_value(json!({})).unwrap();
        let config = settings.configuration;
        assert!(!config.should_auto_create_subscription());
        assert!(config.event_grid.is_none());
        assert_eq!(config.webhook.bind_address, "0.0.0.0:4430");
        assert_eq!(config.bootstrap.certificate_propagation_ms, 120_000);
        assert_eq!(config.bootstrap.topic_retry_interval_ms, 30_000);
        assert_eq!(config.bootstrap.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_string_forms_accepted() {
        let settings: HostSettings = serde_json::from_value(json!({
            "configuration": {
                "createeventgridsubscription": "True",
                "bootstrap": { "topicretryintervalms": "250" }
            }
        }))
        .unwrap();
        assert!(settings.configuration.create_event_grid_subscription);
        assert_eq!(settings.configuration.bootstrap.topic_retry_interval_ms, 250);
    }

    #[test]
    fn test_bad_boolean_rejected() {
        let result: Result<HostSettings, _> = serde_json::from_value(json!({
            "configuration": { "createeventgridsubscription": "maybe" }
        }));
        assert!(result.is_err());
    }
}
