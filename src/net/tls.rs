//! TLS configuration from issued certificate material.

use std::io;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;

use crate::security::{IssuedCertificate, TrustStore};

/// Select the process-wide rustls crypto provider.
///
/// Required before building server configs, because more than one provider
/// is compiled in. Calling it again is a no-op.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Build the webhook listener's TLS configuration from the issued server certificate.
pub async fn server_config(server: &IssuedCertificate) -> io::Result<RustlsConfig> {
    if server.certificate_pem.trim().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "server certificate is empty",
        ));
    }

    RustlsConfig::from_pem(
        server.certificate_pem.clone().into_bytes(),
        server.private_key_pem.clone().into_bytes(),
    )
    .await
}

/// Build an HTTP client that presents `identity` and trusts everything in `trust_store`.
pub fn mutual_tls_client(
    identity: &IssuedCertificate,
    trust_store: &TrustStore,
    connect_timeout: Duration,
) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .use_rustls_tls()
        .identity(reqwest::Identity::from_pem(identity.identity_pem().as_bytes())?)
        .connect_timeout(connect_timeout);

    for certificate in trust_store.certificates() {
        builder = builder.add_root_certificate(reqwest::Certificate::from_der(certificate.as_ref())?);
    }

    builder.build()
}
