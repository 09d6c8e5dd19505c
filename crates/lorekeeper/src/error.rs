//! Error types for the lorekeeper pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for lorekeeper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lorekeeper errors
///
/// An empty retrieval is deliberately absent: it is a valid outcome, not a failure.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-success response or broken connection to a collaborator
    #[error("Transport error ({service}): {message}")]
    Transport { service: String, message: String },

    /// Authentication/authorization failure against the content source
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index error (collection setup, query or upsert)
    #[error("Vector index error: {0}")]
    Index(String),

    /// Generation failure or malformed tool-call payload
    #[error("Model error: {0}")]
    Model(String),

    /// A bounded wait on a collaborator expired
    #[error("Timed out after {secs}s waiting for {what}")]
    Timeout { what: String, secs: u64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed client request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a transport error for a named collaborator
    pub fn transport(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector index error
    pub fn index(message: impl Into<String>) -> Self {
        Self::Index(message.into())
    }

    /// Create a model error
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    /// Create a timeout error
    pub fn timeout(what: impl Into<String>, secs: u64) -> Self {
        Self::Timeout {
            what: what.into(),
            secs,
        }
    }

    /// Create an invalid-request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for failures of the network path to a collaborator
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Http(_) | Self::Timeout { .. })
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Config(_) | Error::Json(_) | Error::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::Transport { .. } | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::Model(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Embedding(_) | Error::Index(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let error_type = match &self {
            Error::Config(_) => "config_error",
            Error::Transport { .. } => "transport_error",
            Error::Auth(_) => "auth_error",
            Error::Embedding(_) => "embedding_error",
            Error::Index(_) => "index_error",
            Error::Model(_) => "model_error",
            Error::Timeout { .. } => "timeout",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Internal(_) => "internal_error",
        };

        tracing::error!("Request failed: {}", self);

        // Only client mistakes are echoed back; everything else stays in the logs.
        let message = if status == StatusCode::BAD_REQUEST {
            self.to_string()
        } else {
            "Something went wrong while answering. Please try again.".to_string()
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
