//! IoT Edge workload API client.
//!
//! # Responsibilities
//! - Read the module's workload settings from the IoT Edge environment
//! - Request server and identity certificates and the trust bundle
//! - Open one connection per call and release it when the call ends
//!
//! # Design Decisions
//! - `unix://` URIs are spoken to with a bare hyper HTTP/1.1 connection
//! - `http(s)://` URIs go through a per-call reqwest client
//! - The connection driver is aborted on drop, so early returns also close the socket

use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use chrono::{SecondsFormat, Utc};
use rustls::pki_types::CertificateDer;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::security::certificates::{parse_certificates, IssuedCertificate};
use crate::security::error::{SecurityError, SecurityResult};
use crate::security::provisioner::CertificateSource;

pub const WORKLOAD_URI_ENV: &str = "IOTEDGE_WORKLOADURI";
pub const MODULE_ID_ENV: &str = "IOTEDGE_MODULEID";
pub const GENERATION_ID_ENV: &str = "IOTEDGE_MODULEGENERATIONID";
pub const API_VERSION_ENV: &str = "IOTEDGE_APIVERSION";

pub const DEFAULT_API_VERSION: &str = "2019-01-30";

/// Lifetime requested for issued certificates.
const CERTIFICATE_VALIDITY_DAYS: i64 = 90;

const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Where the workload API listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadUri {
    Unix(PathBuf),
    Http(Url),
}

impl FromStr for WorkloadUri {
    type Err = SecurityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s).map_err(|_| SecurityError::UnsupportedUri(s.to_string()))?;
        match url.scheme() {
            "unix" if !url.path().is_empty() => Ok(WorkloadUri::Unix(PathBuf::from(url.path()))),
            "http" | "https" => Ok(WorkloadUri::Http(url)),
            _ => Err(SecurityError::UnsupportedUri(s.to_string())),
        }
    }
}

/// Module identity and workload endpoint, as provided by the edge runtime.
#[derive(Debug, Clone)]
pub struct WorkloadSettings {
    pub uri: WorkloadUri,
    pub module_id: String,
    pub generation_id: String,
    pub api_version: String,
}

impl WorkloadSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> SecurityResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> SecurityResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or(SecurityError::MissingEnv(key))
        };

        Ok(Self {
            uri: required(WORKLOAD_URI_ENV)?.parse()?,
            module_id: required(MODULE_ID_ENV)?,
            generation_id: required(GENERATION_ID_ENV)?,
            api_version: lookup(API_VERSION_ENV)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerCertificateRequest<'a> {
    common_name: &'a str,
    expiration: String,
}

#[derive(Serialize)]
struct IdentityCertificateRequest {
    expiration: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CertificateResponse {
    certificate: String,
    private_key: PrivateKeyResponse,
    #[serde(default)]
    expiration: Option<String>,
}

#[derive(Deserialize)]
struct PrivateKeyResponse {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    bytes: Option<String>,
}

#[derive(Deserialize)]
struct TrustBundleResponse {
    certificate: String,
}

impl CertificateResponse {
    fn into_issued(self) -> SecurityResult<IssuedCertificate> {
        let key = match (self.private_key.kind.as_str(), self.private_key.bytes) {
            ("key", Some(bytes)) => bytes,
            (kind, _) => {
                return Err(SecurityError::Pem(format!(
                    "private key of type '{}' cannot be used",
                    kind
                )))
            }
        };
        IssuedCertificate::from_pem(self.certificate, key, self.expiration)
    }
}

fn expiration() -> String {
    (Utc::now() + chrono::Duration::days(CERTIFICATE_VALIDITY_DAYS))
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// The local security daemon.
pub struct SecurityDaemon {
    settings: WorkloadSettings,
}

impl SecurityDaemon {
    pub fn new(settings: WorkloadSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &WorkloadSettings {
        &self.settings
    }

    fn connect(&self) -> WorkloadConnection<'_> {
        WorkloadConnection {
            settings: &self.settings,
        }
    }
}

#[async_trait]
impl CertificateSource for SecurityDaemon {
    async fn server_certificate(&self) -> SecurityResult<IssuedCertificate> {
        let s = &self.settings;
        let path = format!(
            "/modules/{}/genid/{}/certificate/server?api-version={}",
            s.module_id, s.generation_id, s.api_version
        );
        let body = serde_json::to_vec(&ServerCertificateRequest {
            common_name: &s.module_id,
            expiration: expiration(),
        })?;

        let response = self.connect().request(Method::POST, &path, Some(body)).await?;
        serde_json::from_slice::<CertificateResponse>(&response)?.into_issued()
    }

    async fn identity_certificate(&self) -> SecurityResult<IssuedCertificate> {
        let s = &self.settings;
        let path = format!(
            "/modules/{}/certificate/identity?api-version={}",
            s.module_id, s.api_version
        );
        let body = serde_json::to_vec(&IdentityCertificateRequest {
            expiration: expiration(),
        })?;

        let response = self.connect().request(Method::POST, &path, Some(body)).await?;
        serde_json::from_slice::<CertificateResponse>(&response)?.into_issued()
    }

    async fn trust_bundle(&self) -> SecurityResult<Vec<CertificateDer<'static>>> {
        let path = format!("/trust-bundle?api-version={}", self.settings.api_version);
        let response = self.connect().request(Method::GET, &path, None).await?;
        let bundle: TrustBundleResponse = serde_json::from_slice(&response)?;
        let certificates = parse_certificates(&bundle.certificate)?;
        if certificates.is_empty() {
            return Err(SecurityError::Pem("trust bundle is empty".to_string()));
        }
        Ok(certificates)
    }
}

/// One request's worth of access to the daemon. Consumed by `request`.
struct WorkloadConnection<'a> {
    settings: &'a WorkloadSettings,
}

impl WorkloadConnection<'_> {
    async fn request(self, method: Method, path_and_query: &str, body: Option<Vec<u8>>) -> SecurityResult<Bytes> {
        tracing::debug!(method = %method, path = %path_and_query, "Calling security daemon");

        let (status, bytes) = match &self.settings.uri {
            WorkloadUri::Unix(socket) => send_unix(socket, method, path_and_query, body).await?,
            WorkloadUri::Http(base) => send_http(base, method, path_and_query, body).await?,
        };

        if !status.is_success() {
            return Err(SecurityError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(bytes)
    }
}

#[cfg(unix)]
struct AbortOnDrop(tokio::task::JoinHandle<()>);

#[cfg(unix)]
impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(unix)]
async fn send_unix(
    socket: &std::path::Path,
    method: Method,
    path_and_query: &str,
    body: Option<Vec<u8>>,
) -> SecurityResult<(StatusCode, Bytes)> {
    use hyper_util::rt::TokioIo;

    let stream = tokio::net::UnixStream::connect(socket).await?;
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    let _driver = AbortOnDrop(tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::debug!(error = %e, "Workload connection closed with error");
        }
    }));

    let mut builder = Request::builder()
        .method(method)
        .uri(path_and_query)
        .header(header::HOST, "localhost");
    let body = match body {
        Some(bytes) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(bytes)
        }
        None => Body::empty(),
    };
    let request = builder
        .body(body)
        .map_err(|e| SecurityError::Http(e.to_string()))?;

    let response = sender.send_request(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(Body::new(response.into_body()), MAX_RESPONSE_BYTES)
        .await
        .map_err(|e| SecurityError::Http(e.to_string()))?;
    Ok((status, bytes))
}

#[cfg(not(unix))]
async fn send_unix(
    socket: &std::path::Path,
    _method: Method,
    _path_and_query: &str,
    _body: Option<Vec<u8>>,
) -> SecurityResult<(StatusCode, Bytes)> {
    Err(SecurityError::UnsupportedUri(socket.display().to_string()))
}

async fn send_http(
    base: &Url,
    method: Method,
    path_and_query: &str,
    body: Option<Vec<u8>>,
) -> SecurityResult<(StatusCode, Bytes)> {
    let url = base
        .join(path_and_query)
        .map_err(|_| SecurityError::UnsupportedUri(base.to_string()))?;

    let client = reqwest::Client::builder().use_rustls_tls().build()?;
    let mut request = client.request(method, url);
    if let Some(bytes) = body {
        request = request
            .header(header::CONTENT_TYPE, "application/json")
            .body(bytes);
    }

    let response = request.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;
    Ok((status, bytes))
}
