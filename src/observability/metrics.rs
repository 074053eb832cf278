//! Metrics collection and exposition.
//!
//! # Metrics
//! - `subscriber_topic_polls_total` (counter): topic lookups, by topic
//! - `subscriber_topic_poll_failures_total` (counter): failed lookups, by topic
//! - `subscriber_subscriptions_registered_total` (counter): by topic
//! - `subscriber_events_received_total` (counter): events accepted by the webhook
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can record unconditionally.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::observability::ObservabilityError;

pub const TOPIC_POLLS: &str = "subscriber_topic_polls_total";
pub const TOPIC_POLL_FAILURES: &str = "subscriber_topic_poll_failures_total";
pub const SUBSCRIPTIONS_REGISTERED: &str = "subscriber_subscriptions_registered_total";
pub const EVENTS_RECEIVED: &str = "subscriber_events_received_total";

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), ObservabilityError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_topic_poll(topic: &str) {
    metrics::counter!(TOPIC_POLLS, "topic" => topic.to_string()).increment(1);
}

pub fn record_topic_poll_failure(topic: &str) {
    metrics::counter!(TOPIC_POLL_FAILURES, "topic" => topic.to_string()).increment(1);
}

pub fn record_subscription_registered(topic: &str) {
    metrics::counter!(SUBSCRIPTIONS_REGISTERED, "topic" => topic.to_string()).increment(1);
}

pub fn record_events_received(count: u64) {
    metrics::counter!(EVENTS_RECEIVED).increment(count);
}
