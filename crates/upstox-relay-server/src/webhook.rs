//! Webhook verification.
//!
//! Handlers hand every inbound webhook to a [`WebhookVerifier`] before
//! acknowledging it. The default accepts everything; an HMAC-SHA256
//! verifier is available once a shared secret is configured.
//!
//! # Security
//!
//! Signature comparison uses constant-time comparison.

use std::sync::Arc;

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Why a webhook was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("missing signature header '{0}'")]
    MissingSignature(String),

    #[error("signature mismatch")]
    InvalidSignature,

    #[error("invalid HMAC key")]
    InvalidKey,
}

/// Decides whether an inbound webhook is authentic.
pub trait WebhookVerifier: Send + Sync + std::fmt::Debug {
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), WebhookError>;
}

/// Verifier shared across handlers.
pub type SharedWebhookVerifier = Arc<dyn WebhookVerifier>;

/// Accepts every webhook.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl WebhookVerifier for AcceptAll {
    fn verify(&self, _headers: &HeaderMap, _body: &[u8]) -> Result<(), WebhookError> {
        Ok(())
    }
}

/// Verifies a hex HMAC-SHA256 of the raw body carried in a header.
///
/// A `sha256=` prefix on the header value is tolerated.
#[derive(Clone)]
pub struct HmacSha256Verifier {
    mac: HmacSha256,
    header: String,
}

impl std::fmt::Debug for HmacSha256Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSha256Verifier")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl HmacSha256Verifier {
    pub fn new(
        secret: impl AsRef<[u8]>,
        header: impl Into<String>,
    ) -> Result<Self, WebhookError> {
        let mac =
            HmacSha256::new_from_slice(secret.as_ref()).map_err(|_| WebhookError::InvalidKey)?;
        Ok(Self {
            mac,
            header: header.into().to_ascii_lowercase(),
        })
    }

    /// Hex signature of `body` under this verifier's secret.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }
}

impl WebhookVerifier for HmacSha256Verifier {
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), WebhookError> {
        let provided = headers
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| WebhookError::MissingSignature(self.header.clone()))?;

        let provided = provided.strip_prefix("sha256=").unwrap_or(provided);
        let expected = self.sign(body);

        let provided = provided.to_ascii_lowercase();
        if bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }
}
