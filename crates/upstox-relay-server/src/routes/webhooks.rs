//! Inbound notification endpoints.
//!
//! Both endpoints acknowledge with 200 once the verifier accepts the
//! request. Bodies are logged, never parsed for behavior.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde_json::Value;

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Keys whose values never reach the logs.
const REDACTED_KEYS: &[&str] = &["access_token", "refresh_token", "extended_token"];

/// POST /webhook
///
/// Order and portfolio updates.
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str)> {
    verify(&state, &headers, &body)?;
    tracing::info!(payload = %describe_payload(&body), "Webhook received");
    Ok((StatusCode::OK, "OK"))
}

/// POST /token-webhook
///
/// Access-token notifications. The payload is logged with token values
/// redacted and is not stored.
pub async fn token_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str)> {
    verify(&state, &headers, &body)?;
    tracing::info!(payload = %describe_payload(&body), "Token notification received");
    Ok((StatusCode::OK, "Notifier received"))
}

fn verify(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<()> {
    state.webhook_verifier.verify(headers, body).map_err(|e| {
        tracing::warn!(error = %e, "Webhook rejected");
        ServerError::Unauthorized(format!("Webhook rejected: {}", e))
    })
}

/// Render a webhook body for logging with secrets masked.
fn describe_payload(body: &[u8]) -> String {
    if body.is_empty() {
        return "<empty>".to_string();
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(mut value) => {
            redact(&mut value);
            value.to_string()
        }
        Err(_) => format!("<{} bytes, not JSON>", body.len()),
    }
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if REDACTED_KEYS.contains(&key.as_str()) {
                    *field = Value::String("[redacted]".to_string());
                } else {
                    redact(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}
