//! Error types for the upstream OAuth client.

use serde_json::Value;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur while talking to the Upstox API.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Transport failure: connect, timeout, TLS, body read.
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream answered with a non-2xx status.
    #[error("Upstream returned {status}: {message}")]
    Upstream {
        status: u16,
        message: String,
        payload: Option<Value>,
    },

    /// Upstream answered 2xx but the body was not what we expected.
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    /// Client could not be built from the given configuration.
    #[error("Config error: {0}")]
    Config(String),
}

impl OAuthError {
    /// The most useful human-readable detail for this error.
    ///
    /// For upstream failures this is the message extracted from the
    /// upstream body, otherwise the error text itself.
    pub fn detail(&self) -> String {
        match self {
            OAuthError::Upstream { message, .. } => message.clone(),
            OAuthError::Network(msg)
            | OAuthError::InvalidResponse(msg)
            | OAuthError::Config(msg) => msg.clone(),
        }
    }

    /// The upstream error body, when there was one.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            OAuthError::Upstream { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OAuthError::Network(format!("request timed out: {}", e))
        } else {
            OAuthError::Network(e.to_string())
        }
    }
}

/// Best-effort extraction of an error message from an upstream error body.
///
/// Upstox reports failures as `{"status":"error","errors":[{"message":..}]}`;
/// generic OAuth servers use `error_description` / `error`.
pub fn extract_upstream_message(payload: &Value) -> Option<String> {
    let as_text = |v: &Value| v.as_str().filter(|s| !s.is_empty()).map(str::to_string);

    payload
        .get("message")
        .and_then(as_text)
        .or_else(|| {
            payload
                .get("errors")
                .and_then(|errors| errors.get(0))
                .and_then(|first| first.get("message"))
                .and_then(as_text)
        })
        .or_else(|| payload.get("error_description").and_then(as_text))
        .or_else(|| payload.get("error").and_then(as_text))
        .or_else(|| as_text(payload))
}
