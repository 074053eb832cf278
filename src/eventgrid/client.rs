//! Event Grid edge management client.
//!
//! # Responsibilities
//! - Validate the broker URL shape before any network call
//! - Look up topics and create or update subscriptions
//! - Bound every call with a deadline and map broker errors
//!
//! # Design Decisions
//! - The HTTP client is injected, so TLS identity is configured elsewhere
//! - Broker-reported errors stay distinct from transport errors

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use url::Url;

use crate::eventgrid::types::{ApiErrorBody, EventGridError, EventGridResult, EventSubscription, Topic};
use crate::resilience::bounded;

/// Management API version spoken by the edge module.
pub const API_VERSION: &str = "2019-01-01-preview";

/// Broker operations needed at startup.
#[async_trait]
pub trait EventGridApi: Send + Sync {
    /// Fetch a topic by name.
    async fn get_topic(&self, topic_name: &str, timeout: Duration) -> EventGridResult<Topic>;

    /// Create or replace a subscription on a topic.
    async fn put_subscription(
        &self,
        topic_name: &str,
        subscription_name: &str,
        subscription: &EventSubscription,
        timeout: Duration,
    ) -> EventGridResult<EventSubscription>;
}

/// Broker address split into base URL and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventGridEndpoint {
    /// `<protocol>://<moduleName>`
    pub base_url: String,
    pub port: u16,
}

impl EventGridEndpoint {
    /// Parse `<protocol>://<moduleName>:<portNo>`.
    pub fn parse(url: &str) -> EventGridResult<Self> {
        let invalid = || EventGridError::InvalidUrl(url.to_string());

        let tokens: Vec<&str> = url.split(':').collect();
        if tokens.len() != 3 {
            return Err(invalid());
        }

        let (scheme, host, port) = (tokens[0], tokens[1], tokens[2]);
        if scheme.is_empty() || !host.starts_with("//") || host.len() <= 2 {
            return Err(invalid());
        }
        let port = port.trim_end_matches('/').parse::<u16>().map_err(|_| invalid())?;

        Ok(Self {
            base_url: format!("{}:{}", scheme, host),
            port,
        })
    }

    /// Absolute URL for a resource on this endpoint.
    ///
    /// Each segment is percent-encoded on its own, so a name can never add
    /// path levels, a query or a fragment.
    pub fn resource_url(&self, segments: &[&str]) -> EventGridResult<Url> {
        let root = format!("{}:{}", self.base_url, self.port);
        let invalid = || EventGridError::InvalidUrl(root.clone());

        let mut url = Url::parse(&root).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// HTTP client for the Event Grid edge module.
#[derive(Clone)]
pub struct EventGridClient {
    endpoint: EventGridEndpoint,
    http: reqwest::Client,
}

impl EventGridClient {
    /// Create a client for `url`. Fails on a malformed URL without touching the network.
    pub fn new(url: &str, http: reqwest::Client) -> EventGridResult<Self> {
        Ok(Self::with_endpoint(EventGridEndpoint::parse(url)?, http))
    }

    pub fn with_endpoint(endpoint: EventGridEndpoint, http: reqwest::Client) -> Self {
        Self { endpoint, http }
    }

    pub fn endpoint(&self) -> &EventGridEndpoint {
        &self.endpoint
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Vec<u8>>,
        timeout: Duration,
    ) -> EventGridResult<Vec<u8>> {
        let url = self.endpoint.resource_url(segments)?;
        tracing::debug!(method = %method, url = %url, "Calling Event Grid");

        let mut request = self
            .http
            .request(method, url)
            .query(&[("api-version", API_VERSION)]);
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        bounded(timeout, async move {
            let response = request.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            if !status.is_success() {
                return Err(api_error(status, &body));
            }
            Ok::<_, EventGridError>(body.to_vec())
        })
        .await?
    }
}

fn api_error(status: StatusCode, body: &[u8]) -> EventGridError {
    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(parsed) => EventGridError::Api {
            status: status.as_u16(),
            code: parsed.error.code,
            message: parsed.error.message,
        },
        Err(_) => EventGridError::Api {
            status: status.as_u16(),
            code: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

#[async_trait]
impl EventGridApi for EventGridClient {
    async fn get_topic(&self, topic_name: &str, timeout: Duration) -> EventGridResult<Topic> {
        let body = self
            .send(Method::GET, &["topics", topic_name], None, timeout)
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn put_subscription(
        &self,
        topic_name: &str,
        subscription_name: &str,
        subscription: &EventSubscription,
        timeout: Duration,
    ) -> EventGridResult<EventSubscription> {
        let segments = ["topics", topic_name, "eventSubscriptions", subscription_name];
        let body = self
            .send(Method::PUT, &segments, Some(serde_json::to_vec(subscription)?), timeout)
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl std::fmt::Debug for EventGridClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventGridClient")
            .field("base_url", &self.endpoint.base_url)
            .field("port", &self.endpoint.port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parsing() {
        let endpoint = EventGridEndpoint::parse("https://eventgridmodule:4438").unwrap();
        assert_eq!(endpoint.base_url, "https://eventgridmodule");
        assert_eq!(endpoint.port, 4438);
        assert_eq!(
            endpoint.resource_url(&["topics", "t"]).unwrap().as_str(),
            "https://eventgridmodule:4438/topics/t"
        );
    }

    #[test]
    fn test_resource_names_are_escaped() {
        let endpoint = EventGridEndpoint::parse("https://eventgridmodule:4438").unwrap();

        let url = endpoint.resource_url(&["topics", "sensors#1"]).unwrap();
        assert_eq!(url.path(), "/topics/sensors%231");
        assert!(url.fragment().is_none());

        let url = endpoint
            .resource_url(&["topics", "a/b", "eventSubscriptions", "sub?x=1"])
            .unwrap();
        assert_eq!(url.path(), "/topics/a%2Fb/eventSubscriptions/sub%3Fx=1");
        assert!(url.query().is_none());
    }

    #[test]
    fn test_malformed_urls_rejected() {
        for url in [
            "eventgridmodule",
            "https://eventgridmodule",
            "eventgridmodule:4438",
            "https://eventgridmodule:4438:1",
            "https://eventgridmodule:port",
            "https://eventgridmodule:70000",
            "https://:4438",
            "https:eventgridmodule:4438",
            "",
        ] {
            let err = EventGridEndpoint::parse(url).unwrap_err();
            assert!(matches!(err, EventGridError::InvalidUrl(_)), "{url} should be rejected");
            assert!(err.to_string().contains("<protocol>://<moduleName>:<portNo>"));
        }
    }

    #[test]
    fn test_client_construction_validates_url() {
        let http = reqwest::Client::new();
        assert!(EventGridClient::new("https://eventgridmodule", http.clone()).is_err());
        assert!(EventGridClient::new("https://eventgridmodule:4438", http).is_ok());
    }

    #[test]
    fn test_api_error_parsing() {
        let err = api_error(
            StatusCode::NOT_FOUND,
            br#"{"error":{"code":"NotFound","message":"Topic sampleTopic1 not found"}}"#,
        );
        match err {
            EventGridError::Api { status, code, message } => {
                assert_eq!(status, 404);
                assert_eq!(code, "NotFound");
                assert!(message.contains("sampleTopic1"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = api_error(StatusCode::BAD_GATEWAY, b"upstream down");
        assert!(err.to_string().contains("upstream down"));
    }
}
