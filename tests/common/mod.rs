//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use eventgrid_subscriber::security::{CertificateSource, IssuedCertificate, SecurityResult};
use rustls::pki_types::CertificateDer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by the mock broker.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query, e.g. `/topics/t?api-version=...`.
    pub target: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }
}

pub type Recorded = Arc<Mutex<Vec<RecordedRequest>>>;

/// Start a programmable mock broker on an ephemeral port.
///
/// Every request is recorded, then answered with the `(status, body)` the
/// handler returns.
pub async fn start_programmable_broker<F, Fut>(f: F) -> (SocketAddr, Recorded)
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let log = recorded.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let log = log.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        log.lock().unwrap().push(request.clone());

                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, recorded)
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Some(RecordedRequest { method, target, body })
}

/// Topic body as the edge broker returns it.
pub fn topic_json(name: &str) -> String {
    serde_json::json!({
        "id": format!("/iotHubs/hub/devices/edge/modules/eventgridmodule/topics/{}", name),
        "name": name,
        "type": "Microsoft.EventGrid/topics",
        "properties": {
            "endpoint": format!("https://eventgridmodule:4438/topics/{}/events?api-version=2019-01-01-preview", name),
            "inputSchema": "EventGridSchema"
        }
    })
    .to_string()
}

pub fn error_json(code: &str, message: &str) -> String {
    serde_json::json!({ "error": { "code": code, "message": message } }).to_string()
}

/// Poll `check` until it holds, or panic after a few seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

/// Certificate source backed by freshly generated self-signed material.
pub struct GeneratedCertificates {
    server: IssuedCertificate,
    identity: IssuedCertificate,
    bundle: Vec<CertificateDer<'static>>,
}

impl GeneratedCertificates {
    pub fn new() -> Self {
        let ca = rcgen::generate_simple_self_signed(vec!["edge-ca".to_string()]).unwrap();
        let issue = |name: &str| {
            let leaf = rcgen::generate_simple_self_signed(vec![name.to_string()]).unwrap();
            IssuedCertificate::from_pem(
                format!("{}{}", leaf.cert.pem(), ca.cert.pem()),
                leaf.key_pair.serialize_pem(),
                Some("2030-01-01T00:00:00Z".to_string()),
            )
            .unwrap()
        };

        Self {
            server: issue("localhost"),
            identity: issue("subscriber"),
            bundle: vec![ca.cert.der().clone()],
        }
    }
}

#[async_trait]
impl CertificateSource for GeneratedCertificates {
    async fn server_certificate(&self) -> SecurityResult<IssuedCertificate> {
        Ok(self.server.clone())
    }

    async fn identity_certificate(&self) -> SecurityResult<IssuedCertificate> {
        Ok(self.identity.clone())
    }

    async fn trust_bundle(&self) -> SecurityResult<Vec<CertificateDer<'static>>> {
        Ok(self.bundle.clone())
    }
}
