//! Event Grid resource model and error definitions.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::DeadlineExceeded;

/// Shape of the events delivered to a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventDeliverySchema {
    #[default]
    EventGridSchema,
    CustomEventSchema,
    #[serde(rename = "CloudEventSchemaV1_0")]
    CloudEventSchemaV1_0,
}

impl EventDeliverySchema {
    pub const ALL: [EventDeliverySchema; 3] = [
        EventDeliverySchema::EventGridSchema,
        EventDeliverySchema::CustomEventSchema,
        EventDeliverySchema::CloudEventSchemaV1_0,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventDeliverySchema::EventGridSchema => "EventGridSchema",
            EventDeliverySchema::CustomEventSchema => "CustomEventSchema",
            EventDeliverySchema::CloudEventSchemaV1_0 => "CloudEventSchemaV1_0",
        }
    }
}

impl fmt::Display for EventDeliverySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The configured schema literal matched none of the known schemas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown event delivery schema '{0}', expected EventGridSchema, CustomEventSchema or CloudEventSchemaV1_0")]
pub struct UnknownDeliverySchema(pub String);

impl FromStr for EventDeliverySchema {
    type Err = UnknownDeliverySchema;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|schema| schema.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownDeliverySchema(s.to_string()))
    }
}

/// A webhook subscription on a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub properties: EventSubscriptionProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubscriptionProperties {
    pub topic: String,
    #[serde(default)]
    pub event_delivery_schema: EventDeliverySchema,
    pub destination: EventSubscriptionDestination,
}

/// Where matching events are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "endpointType", content = "properties")]
pub enum EventSubscriptionDestination {
    WebHook(WebHookDestinationProperties),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebHookDestinationProperties {
    /// Full endpoint URL. Write-only on the broker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    /// Endpoint without query string, as echoed back by the broker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_base_url: Option<String>,
}

/// A topic as returned by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub properties: TopicProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProperties {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub input_schema: Option<String>,
}

/// Error body returned by the broker: `{"error":{"code":..,"message":..}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Errors that can occur talking to the broker.
#[derive(Debug, Error)]
pub enum EventGridError {
    /// Broker URL is not `<protocol>://<moduleName>:<portNo>`.
    #[error("URL should be of the form '<protocol>://<moduleName>:<portNo>', got '{0}'")]
    InvalidUrl(String),

    /// The broker answered with a non-success status.
    #[error("Event Grid API error {status} ({code}): {message}")]
    Api { status: u16, code: String, message: String },

    /// Connection, TLS or protocol failure.
    #[error("Event Grid transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The per-call deadline passed.
    #[error("Event Grid request timed out after {0:?}")]
    Timeout(Duration),

    /// Response body was not the expected JSON.
    #[error("Invalid Event Grid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Shutdown was requested while waiting on the broker.
    #[error("Cancelled by shutdown")]
    Cancelled,
}

impl EventGridError {
    /// Errors worth retrying while waiting for the broker to come up.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EventGridError::Api { .. } | EventGridError::Transport(_) | EventGridError::Timeout(_)
        )
    }
}

impl From<DeadlineExceeded> for EventGridError {
    fn from(e: DeadlineExceeded) -> Self {
        EventGridError::Timeout(e.0)
    }
}

/// Result type for broker operations.
pub type EventGridResult<T> = Result<T, EventGridError>;
