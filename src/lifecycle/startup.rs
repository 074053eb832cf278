//! Startup orchestration.
//!
//! # Responsibilities
//! - Provision the server identity and trust bundle
//! - Start the webhook host
//! - When enabled: validate the grid section, connect, wait for the broker
//!   topic and register the subscription
//! - Hand control back only after the host has drained
//!
//! # Design Decisions
//! - Fail fast: configuration, schema and registration errors are fatal
//! - Steps run in order, never concurrently
//! - The host starts before any broker interaction, so deliveries can arrive
//!   as soon as the subscription exists
//! - Shutdown during the waits abandons registration without error

use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::{validate_grid, validate_limits, SubscriberConfig, ValidationError};
use crate::eventgrid::{
    build_subscription, register_subscription, ConnectError, EventGridConnector, EventGridError,
    EventSubscription, TopicPoller, UnknownDeliverySchema,
};
use crate::http::{HostError, RunningHost, WebhookHost};
use crate::net::server_config;
use crate::resilience::sleep_or_cancel;
use crate::security::{provision_server_identity, CertificateSource, SecurityError, TrustStore};

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ValidationError),

    #[error(transparent)]
    Schema(#[from] UnknownDeliverySchema),

    #[error("Certificate provisioning failed: {0}")]
    Security(#[from] SecurityError),

    #[error("Failed to configure server TLS: {0}")]
    Tls(#[source] io::Error),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Failed to create subscription: {0}")]
    EventGrid(#[from] EventGridError),
}

/// What happened to subscription auto-registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// `createEventGridSubscription` was off.
    Disabled,
    /// Shutdown arrived before registration completed.
    Aborted,
    /// The broker accepted the subscription.
    Registered(EventSubscription),
}

/// The subscriber's startup sequence.
pub struct Bootstrap {
    settings: SubscriberConfig,
    certificates: Arc<dyn CertificateSource>,
    connector: Arc<dyn EventGridConnector>,
    trust_store: Arc<TrustStore>,
    shutdown: CancellationToken,
}

impl Bootstrap {
    pub fn new(
        settings: SubscriberConfig,
        certificates: Arc<dyn CertificateSource>,
        connector: Arc<dyn EventGridConnector>,
        trust_store: Arc<TrustStore>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            settings,
            certificates,
            connector,
            trust_store,
            shutdown,
        }
    }

    /// Run to completion: start the host, register if enabled, then wait for
    /// the host to shut down.
    pub async fn run(self) -> Result<Registration, BootstrapError> {
        validate_limits(&self.settings)?;

        // The host gets its own child token so a fatal registration error can
        // stop it without flagging a process-wide shutdown.
        let host_shutdown = self.shutdown.child_token();
        let host = self.start_host(host_shutdown.clone()).await?;

        let registration = if self.settings.should_auto_create_subscription() {
            match self.register().await {
                Ok(registration) => registration,
                Err(e) => {
                    tracing::error!(error = %e, "Subscription setup failed, stopping webhook host");
                    host_shutdown.cancel();
                    if let Err(host_err) = host.wait_for_shutdown().await {
                        tracing::warn!(error = %host_err, "Webhook host did not stop cleanly");
                    }
                    return Err(e);
                }
            }
        } else {
            tracing::info!("createEventGridSubscription is disabled, skipping subscription setup");
            Registration::Disabled
        };

        host.wait_for_shutdown().await?;
        Ok(registration)
    }

    /// Provision certificates and start the webhook host.
    pub async fn start_host(&self, shutdown: CancellationToken) -> Result<RunningHost, BootstrapError> {
        let server = provision_server_identity(self.certificates.as_ref(), &self.trust_store).await?;
        let tls = server_config(&server).await.map_err(BootstrapError::Tls)?;

        let host = WebhookHost::new(self.settings.webhook.clone())
            .start(tls, shutdown)
            .await?;
        Ok(host)
    }

    /// Validate, connect, wait for the topic and register the subscription.
    pub async fn register(&self) -> Result<Registration, BootstrapError> {
        let grid = validate_grid(self.settings.event_grid.as_ref())?;
        let subscription = build_subscription(&grid)?;
        let api = self.connector.connect(&grid).await?;

        let timing = &self.settings.bootstrap;
        let propagation = Duration::from_millis(timing.certificate_propagation_ms);
        tracing::info!(
            wait_secs = propagation.as_secs(),
            "Waiting for the client certificate to become valid"
        );
        if !sleep_or_cancel(propagation, &self.shutdown).await {
            tracing::info!("Shutdown requested, abandoning subscription setup");
            return Ok(Registration::Aborted);
        }

        let poller = TopicPoller::from_config(timing);
        match poller
            .wait_for_topic(api.as_ref(), &grid.topic_name, &self.shutdown)
            .await
        {
            Ok(_) => {}
            Err(EventGridError::Cancelled) => {
                tracing::info!("Shutdown requested, abandoning subscription setup");
                return Ok(Registration::Aborted);
            }
            Err(e) => return Err(e.into()),
        }

        let created = register_subscription(
            api.as_ref(),
            &subscription,
            Duration::from_millis(timing.request_timeout_ms),
        )
        .await?;
        Ok(Registration::Registered(created))
    }
}
