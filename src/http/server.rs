//! Webhook host setup and lifecycle.
//!
//! # Responsibilities
//! - Create the Axum router for event delivery and liveness
//! - Wire up middleware (request ID, tracing, body limit)
//! - Serve over TLS with the provisioned server certificate
//! - Drain in-flight requests on shutdown

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::WebhookConfig;
use crate::http::webhook::{self, WebhookState};

/// Errors starting or stopping the webhook host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Invalid webhook bind address '{0}'")]
    InvalidAddress(String),

    #[error("Webhook host failed: {0}")]
    Serve(#[from] io::Error),

    #[error("Webhook host stopped before it started listening")]
    NotListening,

    #[error("Webhook host task failed: {0}")]
    Join(#[from] JoinError),
}

/// TLS webhook receiver.
pub struct WebhookHost {
    config: WebhookConfig,
}

impl WebhookHost {
    pub fn new(config: WebhookConfig) -> Self {
        Self { config }
    }

    fn route_path(&self) -> String {
        let path = self.config.path.trim();
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self, state: Arc<WebhookState>) -> Router {
        Router::new()
            .route(&self.route_path(), post(webhook::receive_events))
            .route("/health", get(webhook::health))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get("x-request-id")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("unknown");
                        tracing::info_span!(
                            "webhook",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id = %request_id,
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(self.config.max_body_bytes as usize)),
            )
    }

    /// Bind and start serving. Returns once the listener is accepting.
    pub async fn start(
        &self,
        tls: RustlsConfig,
        shutdown: CancellationToken,
    ) -> Result<RunningHost, HostError> {
        let addr: SocketAddr = self
            .config
            .bind_address
            .parse()
            .map_err(|_| HostError::InvalidAddress(self.config.bind_address.clone()))?;

        let state = Arc::new(WebhookState::default());
        let app = self.router(state.clone());
        let handle = Handle::new();

        let server = axum_server::bind_rustls(addr, tls).handle(handle.clone());
        let task = tokio::spawn(async move { server.serve(app.into_make_service()).await });

        let Some(local_addr) = handle.listening().await else {
            return Err(match task.await {
                Ok(Err(e)) => HostError::Serve(e),
                Ok(Ok(())) => HostError::NotListening,
                Err(e) => HostError::Join(e),
            });
        };

        tracing::info!(
            address = %local_addr,
            path = %self.route_path(),
            "Webhook host listening"
        );

        Ok(RunningHost {
            local_addr,
            handle,
            task,
            shutdown,
            grace: Duration::from_secs(self.config.shutdown_grace_secs),
            state,
        })
    }
}

/// A started webhook host.
pub struct RunningHost {
    local_addr: SocketAddr,
    handle: Handle,
    task: JoinHandle<io::Result<()>>,
    shutdown: CancellationToken,
    grace: Duration,
    state: Arc<WebhookState>,
}

impl RunningHost {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn events_received(&self) -> u64 {
        self.state.events_received()
    }

    /// Wait for shutdown to be requested, then drain and close the listener.
    ///
    /// Returns early with the server's error if it stops on its own.
    pub async fn wait_for_shutdown(self) -> Result<(), HostError> {
        let mut task = self.task;

        tokio::select! {
            _ = self.shutdown.cancelled() => {}
            result = &mut task => {
                tracing::error!("Webhook host exited without a shutdown request");
                return match result? {
                    Ok(()) => Ok(()),
                    Err(e) => Err(HostError::Serve(e)),
                };
            }
        }

        tracing::info!(grace = ?self.grace, "Draining webhook host");
        self.handle.graceful_shutdown(Some(self.grace));
        task.await??;

        tracing::info!(address = %self.local_addr, "Webhook host stopped");
        Ok(())
    }
}

impl std::fmt::Debug for RunningHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningHost")
            .field("local_addr", &self.local_addr)
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}
