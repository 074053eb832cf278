//! Security daemon and certificate errors.

use thiserror::Error;

/// Errors raised while obtaining or parsing certificate material.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// A required IoT Edge environment variable is missing.
    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),

    /// The workload URI is not `unix://` or `http(s)://`.
    #[error("Unsupported workload URI '{0}'")]
    UnsupportedUri(String),

    /// Socket connect or read failed.
    #[error("Security daemon I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP exchange over the workload socket failed.
    #[error("Security daemon HTTP error: {0}")]
    Http(String),

    /// The daemon answered with a non-success status.
    #[error("Security daemon returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected JSON.
    #[error("Invalid security daemon response: {0}")]
    Decode(#[from] serde_json::Error),

    /// PEM material was malformed or empty.
    #[error("Invalid certificate material: {0}")]
    Pem(String),
}

impl From<hyper::Error> for SecurityError {
    fn from(e: hyper::Error) -> Self {
        SecurityError::Http(e.to_string())
    }
}

impl From<reqwest::Error> for SecurityError {
    fn from(e: reqwest::Error) -> Self {
        SecurityError::Http(e.to_string())
    }
}

/// Result type for security operations.
pub type SecurityResult<T> = Result<T, SecurityError>;
