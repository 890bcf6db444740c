//! Application state shared across handlers.

use std::sync::Arc;

use upstox_relay_oauth::{SharedTokenStore, UpstoxClient, create_memory_token_store};

use crate::config::ServerConfig;
use crate::webhook::{AcceptAll, SharedWebhookVerifier};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Upstox API client.
    pub upstox: Arc<UpstoxClient>,

    /// Token records keyed by account.
    pub tokens: SharedTokenStore,

    /// Authenticity check applied to inbound webhooks.
    pub webhook_verifier: SharedWebhookVerifier,
}

impl AppState {
    /// Create state with an in-memory token store and no webhook verification.
    pub fn new(config: ServerConfig, upstox: UpstoxClient) -> Self {
        Self {
            config: Arc::new(config),
            upstox: Arc::new(upstox),
            tokens: create_memory_token_store(),
            webhook_verifier: Arc::new(AcceptAll),
        }
    }

    /// Use a different token store.
    pub fn with_token_store(mut self, store: SharedTokenStore) -> Self {
        self.tokens = store;
        self
    }

    /// Use a different webhook verifier.
    pub fn with_webhook_verifier(mut self, verifier: SharedWebhookVerifier) -> Self {
        self.webhook_verifier = verifier;
        self
    }
}
