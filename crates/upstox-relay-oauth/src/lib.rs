//! Upstox OAuth 2.0 authorization-code client.
//!
//! Everything the relay needs to know about the upstream lives here; the
//! HTTP surface in `upstox-relay-server` only composes these pieces.
//!
//! # Components
//!
//! - [`oauth`]: endpoint config, login dialog URL, grant bodies, token payload
//! - [`client`]: token exchange, refresh, and profile calls
//! - [`token_store`]: `TokenRecord`, account keys, and the `TokenStore` trait

pub mod client;
pub mod error;
pub mod oauth;
pub mod token_store;

pub use client::{TokenGrant, UpstoxClient};
pub use error::{OAuthError, Result};
pub use oauth::{TokenEncoding, TokenResponse, UpstoxConfig, build_authorization_url};
pub use token_store::{
    AccountId, InMemoryTokenStore, SharedTokenStore, TokenRecord, TokenStore,
    create_memory_token_store,
};
