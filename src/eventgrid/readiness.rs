//! Topic readiness polling.
//!
//! # Responsibilities
//! - Block until the broker reports the configured topic
//! - Retry broker and transport failures at a fixed interval, forever
//!
//! # Design Decisions
//! - No attempt ceiling and no backoff growth: the edge device is expected
//!   to converge eventually, and every failure is logged and counted
//! - Non-transient errors end polling immediately
//! - Shutdown ends polling between or during attempts

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::BootstrapConfig;
use crate::eventgrid::client::EventGridApi;
use crate::eventgrid::types::{EventGridError, EventGridResult, Topic};
use crate::observability::metrics;
use crate::resilience::FixedBackoff;

/// Polls the broker until a topic exists.
#[derive(Debug, Clone, Copy)]
pub struct TopicPoller {
    request_timeout: Duration,
    backoff: FixedBackoff,
}

impl TopicPoller {
    pub fn new(request_timeout: Duration, backoff: FixedBackoff) -> Self {
        Self {
            request_timeout,
            backoff,
        }
    }

    pub fn from_config(config: &BootstrapConfig) -> Self {
        Self::new(
            Duration::from_millis(config.request_timeout_ms),
            FixedBackoff::from_millis(config.topic_retry_interval_ms),
        )
    }

    /// Wait for `topic_name` to exist.
    ///
    /// Returns `EventGridError::Cancelled` if shutdown is requested first.
    pub async fn wait_for_topic(
        &self,
        api: &dyn EventGridApi,
        topic_name: &str,
        shutdown: &CancellationToken,
    ) -> EventGridResult<Topic> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            metrics::record_topic_poll(topic_name);

            let result = tokio::select! {
                result = api.get_topic(topic_name, self.request_timeout) => result,
                _ = shutdown.cancelled() => return Err(EventGridError::Cancelled),
            };

            match result {
                Ok(topic) => {
                    tracing::info!(
                        topic = %topic_name,
                        attempts = attempt,
                        "Successfully retrieved topic with name {} so event grid must be up...",
                        topic_name
                    );
                    return Ok(topic);
                }
                Err(e) if e.is_transient() => {
                    metrics::record_topic_poll_failure(topic_name);
                    tracing::warn!(
                        topic = %topic_name,
                        attempt,
                        error = %e,
                        "Failed to retrieve topic with name {}. Retrying in {} seconds...",
                        topic_name,
                        self.backoff.interval().as_secs()
                    );
                    if !self.backoff.wait(shutdown).await {
                        return Err(EventGridError::Cancelled);
                    }
                }
                Err(e) => {
                    tracing::error!(topic = %topic_name, attempt, error = %e, "Topic lookup failed");
                    return Err(e);
                }
            }
        }
    }
}
