//! Error types for the relay.

use std::path::PathBuf;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// JSON document persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Worker registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Worker declaration has no email")]
    MissingEmail,

    #[error("Registry storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Outbound notification errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors that end webhook processing with a non-2xx response.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Bad or missing signature while a secret is configured.
    #[error("invalid signature")]
    InvalidSignature,

    /// Body is not valid JSON.
    #[error("invalid json")]
    InvalidJson(#[source] serde_json::Error),

    #[error("{0}")]
    Registry(#[from] RegistryError),

    #[error("{0}")]
    Notify(#[from] NotifyError),
}

impl DispatchError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::InvalidSignature => StatusCode::UNAUTHORIZED,
            DispatchError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            DispatchError::Registry(_) | DispatchError::Notify(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(serde_json::json!({ "ok": false, "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Result type alias for webhook dispatch.
pub type Result<T> = std::result::Result<T, DispatchError>;
