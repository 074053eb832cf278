//! Webhook request handlers.
//!
//! Event Grid posts either a single event or a JSON array of events. Both the
//! Event Grid shape (`eventType`) and the CloudEvents shape (`type`) are
//! accepted; delivery is acknowledged once the body parses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::observability::metrics;

/// Shared state for webhook handlers.
#[derive(Debug, Default)]
pub struct WebhookState {
    events_received: AtomicU64,
}

impl WebhookState {
    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }
}

/// Identifying fields of a delivered event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSummary {
    pub id: Option<String>,
    pub kind: Option<String>,
    pub subject: Option<String>,
}

impl EventSummary {
    fn from_value(event: &Value) -> Option<Self> {
        let event = event.as_object()?;
        let field = |name: &str| event.get(name).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            id: field("id"),
            kind: field("eventType").or_else(|| field("type")),
            subject: field("subject"),
        })
    }
}

/// Summaries for a delivery body, or `None` if it is neither an event nor an array of events.
pub fn summarize(body: &Value) -> Option<Vec<EventSummary>> {
    match body {
        Value::Array(events) => events.iter().map(EventSummary::from_value).collect(),
        Value::Object(_) => EventSummary::from_value(body).map(|summary| vec![summary]),
        _ => None,
    }
}

pub async fn receive_events(State(state): State<Arc<WebhookState>>, body: Bytes) -> Response {
    let parsed: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected delivery with invalid JSON");
            return (StatusCode::BAD_REQUEST, "Body is not valid JSON").into_response();
        }
    };

    let Some(events) = summarize(&parsed) else {
        tracing::warn!("Rejected delivery that is not an event or array of events");
        return (StatusCode::BAD_REQUEST, "Expected an event or an array of events").into_response();
    };

    for event in &events {
        tracing::info!(
            id = event.id.as_deref().unwrap_or("-"),
            event_type = event.kind.as_deref().unwrap_or("-"),
            subject = event.subject.as_deref().unwrap_or("-"),
            "Received event"
        );
    }

    let count = events.len() as u64;
    state.events_received.fetch_add(count, Ordering::Relaxed);
    metrics::record_events_received(count);

    (StatusCode::OK, Json(json!({ "received": count }))).into_response()
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
