//! Construction of an authenticated broker client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::GridSettings;
use crate::eventgrid::client::{EventGridApi, EventGridClient, EventGridEndpoint};
use crate::eventgrid::types::EventGridError;
use crate::net::mutual_tls_client;
use crate::security::{provision_client_identity, CertificateSource, SecurityError, TrustStore};

/// Errors building a broker client.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    EventGrid(#[from] EventGridError),

    #[error("Failed to obtain client identity: {0}")]
    Security(#[from] SecurityError),

    #[error("Failed to build Event Grid HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Produces a broker client for the configured grid.
#[async_trait]
pub trait EventGridConnector: Send + Sync {
    async fn connect(&self, grid: &GridSettings) -> Result<Arc<dyn EventGridApi>, ConnectError>;
}

/// Connects with a client identity issued by the security daemon.
pub struct MutualTlsConnector {
    certificates: Arc<dyn CertificateSource>,
    trust_store: Arc<TrustStore>,
    connect_timeout: Duration,
}

impl MutualTlsConnector {
    pub fn new(
        certificates: Arc<dyn CertificateSource>,
        trust_store: Arc<TrustStore>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            certificates,
            trust_store,
            connect_timeout,
        }
    }
}

#[async_trait]
impl EventGridConnector for MutualTlsConnector {
    async fn connect(&self, grid: &GridSettings) -> Result<Arc<dyn EventGridApi>, ConnectError> {
        // Reject a malformed URL before asking the daemon for anything.
        let endpoint = EventGridEndpoint::parse(&grid.url)?;

        let identity = provision_client_identity(self.certificates.as_ref(), &self.trust_store).await?;
        let http = mutual_tls_client(&identity, &self.trust_store, self.connect_timeout)?;

        tracing::info!(base_url = %endpoint.base_url, port = endpoint.port, "Event Grid client ready");
        Ok(Arc::new(EventGridClient::with_endpoint(endpoint, http)))
    }
}
