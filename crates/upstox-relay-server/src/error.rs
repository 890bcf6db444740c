//! Error types for the server.
//!
//! Every failure ends here and becomes a response; nothing propagates past
//! the handler.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use upstox_relay_oauth::OAuthError;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A required query, body, or header field was missing or malformed.
    #[error("{0}")]
    BadRequest(String),

    /// Caller did not present credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// The Upstox API call failed.
    #[error("{message}")]
    Upstream {
        message: String,
        payload: Option<Value>,
    },

    /// The server was configured with values it cannot run with.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Wrap an upstream failure, prefixing its detail with `context`.
    pub fn upstream(context: &str, err: OAuthError) -> Self {
        ServerError::Upstream {
            message: format!("{}: {}", context, err.detail()),
            payload: err.payload().cloned(),
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Upstream error body, when the failure came from Upstox.
    pub upstream: Option<Value>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ServerError::Upstream { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "upstream_error"),
            ServerError::Config(_) | ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, code, error = %message, "Client error");
        }

        let upstream = match self {
            ServerError::Upstream { payload, .. } => payload,
            _ => None,
        };

        let body = ErrorResponse {
            code: code.to_string(),
            message,
            upstream,
        };

        (status, Json(body)).into_response()
    }
}
