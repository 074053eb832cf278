//! Certificate provisioning.
//!
//! # Responsibilities
//! - Fetch the server identity and install it (leaf + intermediates) before
//!   the webhook host starts
//! - Install the trust bundle before any outbound TLS call
//! - Fetch the client identity only when a subscription is to be registered

use async_trait::async_trait;
use rustls::pki_types::CertificateDer;

use crate::security::certificates::IssuedCertificate;
use crate::security::error::SecurityResult;
use crate::security::trust_store::TrustStore;

/// Issuer of certificate material.
#[async_trait]
pub trait CertificateSource: Send + Sync {
    /// Server certificate for the inbound TLS listener.
    async fn server_certificate(&self) -> SecurityResult<IssuedCertificate>;

    /// Client identity certificate for outbound mutual TLS.
    async fn identity_certificate(&self) -> SecurityResult<IssuedCertificate>;

    /// CA certificates trusted for peer validation.
    async fn trust_bundle(&self) -> SecurityResult<Vec<CertificateDer<'static>>>;
}

/// Fetch the server certificate and trust bundle and install both.
pub async fn provision_server_identity(
    source: &dyn CertificateSource,
    trust_store: &TrustStore,
) -> SecurityResult<IssuedCertificate> {
    tracing::info!("Configure server certificate");
    let server = source.server_certificate().await?;
    trust_store.install(server.leaf());
    let intermediates = trust_store.install_all(server.issuers());
    tracing::debug!(
        intermediates,
        expiration = server.expiration.as_deref().unwrap_or("unknown"),
        "Server certificate installed"
    );

    tracing::info!("Configure client trust bundle");
    let bundle = source.trust_bundle().await?;
    let added = trust_store.install_all(&bundle);
    tracing::debug!(bundle = bundle.len(), added, "Trust bundle installed");

    Ok(server)
}

/// Fetch the client identity certificate and trust its issuing CA.
pub async fn provision_client_identity(
    source: &dyn CertificateSource,
    trust_store: &TrustStore,
) -> SecurityResult<IssuedCertificate> {
    let identity = source.identity_certificate().await?;
    trust_store.install_all(identity.issuers().first());
    tracing::info!(
        expiration = identity.expiration.as_deref().unwrap_or("unknown"),
        "Client certificate issued"
    );
    Ok(identity)
}
