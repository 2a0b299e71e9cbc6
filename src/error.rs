//! Error types for the deployment mutation webhook

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Main error type for webhook operations
///
/// Every variant that can occur while serving a review maps to exactly one
/// HTTP status in [`IntoResponse`]. Startup-only variants map to 500 but are
/// never produced on the request path.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The transport failed to deliver the request body
    #[error("failed to read request body: {0}")]
    Read(String),

    /// The envelope or the embedded Deployment did not decode
    #[error("decode error: {0}")]
    Decode(String),

    /// The Deployment has no `spec.replicas`, so the replica cap cannot be evaluated
    #[error("deployment {0} has no spec.replicas")]
    MissingReplicas(String),

    /// A patch list contained an operation outside the emitted subset
    #[error("merge patch failed: {0}")]
    Merge(String),

    /// The response envelope could not be serialized
    #[error("encode error: {0}")]
    Encode(String),

    /// Startup configuration is invalid (certificate, key, TLS)
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTPS listener failed
    #[error("server error: {0}")]
    Server(String),
}

impl Error {
    /// Create a read error with the given message
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    /// Create a decode error with the given message
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a merge error with the given message
    pub fn merge(msg: impl Into<String>) -> Self {
        Self::Merge(msg.into())
    }

    /// Create an encode error with the given message
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a server error with the given message
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    /// HTTP status this error is surfaced as
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Decode(_) | Error::MissingReplicas(_) | Error::Merge(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Read(_) | Error::Encode(_) | Error::Config(_) | Error::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}
