//! Configuration types.
//!
//! Every section has serde defaults so a partial `relay.toml` (or none at
//! all) yields a runnable configuration.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use upstox_relay_oauth::oauth::{UPSTOX_AUTHORIZE_URL, UPSTOX_PROFILE_URL, UPSTOX_TOKEN_URL};
use upstox_relay_oauth::{TokenEncoding, UpstoxConfig};

use crate::error::{ConfigError, Result};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default listen host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default path Upstox redirects back to.
pub const DEFAULT_CALLBACK_PATH: &str = "/auth";

/// Default outbound request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default max request body size (1 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Default header carrying the webhook HMAC signature.
pub const DEFAULT_SIGNATURE_HEADER: &str = "x-upstox-signature";

/// Paths the relay serves itself; the callback may not shadow them.
pub const RESERVED_PATHS: &[&str] = &[
    "/login",
    "/refresh-token",
    "/profile",
    "/webhook",
    "/token-webhook",
    "/health",
];

const REDACTED: &str = "<redacted>";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerSection,
    pub upstox: UpstoxSection,
    pub webhook: WebhookSection,
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Route Upstox redirects to with `?code=`. `/auth` or `/callback` in practice.
    pub callback_path: String,
    pub request_logging: bool,
    pub max_body_size: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            request_logging: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// `[upstox]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstoxSection {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub profile_url: String,
    pub token_encoding: TokenEncoding,
    pub timeout_secs: u64,
}

impl Default for UpstoxSection {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            redirect_uri: None,
            authorize_url: UPSTOX_AUTHORIZE_URL.to_string(),
            token_url: UPSTOX_TOKEN_URL.to_string(),
            profile_url: UPSTOX_PROFILE_URL.to_string(),
            token_encoding: TokenEncoding::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[webhook]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSection {
    /// Shared secret for HMAC verification. Unset means accept everything.
    pub secret: Option<String>,
    pub signature_header: String,
}

impl Default for WebhookSection {
    fn default() -> Self {
        Self {
            secret: None,
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
        }
    }
}

impl RelayConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check values the server cannot start with.
    ///
    /// Missing credentials are not an error here; see
    /// [`RelayConfig::missing_credentials`].
    pub fn validate(&self) -> Result<()> {
        let path = &self.server.callback_path;
        if !path.starts_with('/') || path.len() < 2 {
            return Err(ConfigError::InvalidValue {
                field: "server.callback_path".to_string(),
                reason: format!("'{}' must be an absolute path like /auth", path),
            });
        }
        let has_capture = path.contains(['{', '}'])
            || path
                .split('/')
                .any(|segment| segment.starts_with(':') || segment.starts_with('*'));
        if has_capture {
            return Err(ConfigError::InvalidValue {
                field: "server.callback_path".to_string(),
                reason: format!("'{}' must be a literal path without captures", path),
            });
        }
        if RESERVED_PATHS.contains(&path.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "server.callback_path".to_string(),
                reason: format!("'{}' is already served by the relay", path),
            });
        }
        if self.upstox.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "upstox.timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Names of required credentials that are unset or blank.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());

        let mut missing = Vec::new();
        if blank(&self.upstox.api_key) {
            missing.push(crate::discovery::ENV_API_KEY);
        }
        if blank(&self.upstox.api_secret) {
            missing.push(crate::discovery::ENV_API_SECRET);
        }
        if blank(&self.upstox.redirect_uri) {
            missing.push(crate::discovery::ENV_REDIRECT_URI);
        }
        missing
    }

    /// Resolve the listen address.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        let host = self.server.host.as_str();
        (host, self.server.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "server.host".to_string(),
                reason: format!("cannot resolve '{}'", host),
            })
    }

    /// Upstream client configuration. Unset credentials become empty strings.
    pub fn upstox_config(&self) -> UpstoxConfig {
        let upstox = &self.upstox;
        UpstoxConfig {
            client_id: upstox.api_key.clone().unwrap_or_default(),
            client_secret: upstox.api_secret.clone().unwrap_or_default(),
            redirect_uri: upstox.redirect_uri.clone().unwrap_or_default(),
            authorize_url: upstox.authorize_url.clone(),
            token_url: upstox.token_url.clone(),
            profile_url: upstox.profile_url.clone(),
            token_encoding: upstox.token_encoding,
            timeout: Duration::from_secs(upstox.timeout_secs),
        }
    }

    /// Copy with secrets replaced, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.upstox.api_secret.is_some() {
            copy.upstox.api_secret = Some(REDACTED.to_string());
        }
        if copy.webhook.secret.is_some() {
            copy.webhook.secret = Some(REDACTED.to_string());
        }
        copy
    }
}
