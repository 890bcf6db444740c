//! OAuth 2.0 authorization-code flow against the Upstox API.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upstox login dialog.
pub const UPSTOX_AUTHORIZE_URL: &str = "https://api.upstox.com/v2/login/authorization/dialog";

/// Upstox token endpoint (code exchange and refresh).
pub const UPSTOX_TOKEN_URL: &str = "https://api.upstox.com/v2/login/authorization/token";

/// Upstox user profile endpoint.
pub const UPSTOX_PROFILE_URL: &str = "https://api.upstox.com/v2/user/profile";

/// Default timeout for every outbound call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How grant parameters are encoded when POSTing to the token endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenEncoding {
    /// `application/x-www-form-urlencoded` (the documented Upstox contract).
    #[default]
    Form,
    /// `application/json`.
    Json,
}

impl fmt::Display for TokenEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenEncoding::Form => write!(f, "form"),
            TokenEncoding::Json => write!(f, "json"),
        }
    }
}

impl FromStr for TokenEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "form" | "urlencoded" | "x-www-form-urlencoded" => Ok(TokenEncoding::Form),
            "json" => Ok(TokenEncoding::Json),
            other => Err(format!(
                "unknown token encoding '{}' (expected 'form' or 'json')",
                other
            )),
        }
    }
}

/// Upstream endpoints and application credentials.
#[derive(Clone)]
pub struct UpstoxConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub profile_url: String,
    pub token_encoding: TokenEncoding,
    pub timeout: Duration,
}

impl fmt::Debug for UpstoxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstoxConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("redirect_uri", &self.redirect_uri)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("profile_url", &self.profile_url)
            .field("token_encoding", &self.token_encoding)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for UpstoxConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            authorize_url: UPSTOX_AUTHORIZE_URL.to_string(),
            token_url: UPSTOX_TOKEN_URL.to_string(),
            profile_url: UPSTOX_PROFILE_URL.to_string(),
            token_encoding: TokenEncoding::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl UpstoxConfig {
    /// Config for the production Upstox API with the given app credentials.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            ..Default::default()
        }
    }

    /// Point all three endpoints at another host, keeping the Upstox paths.
    ///
    /// Used for staging hosts and for mock servers in tests.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        self.authorize_url = format!("{}/v2/login/authorization/dialog", base);
        self.token_url = format!("{}/v2/login/authorization/token", base);
        self.profile_url = format!("{}/v2/user/profile", base);
        self
    }

    pub fn with_token_encoding(mut self, encoding: TokenEncoding) -> Self {
        self.token_encoding = encoding;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

/// Build the URL of the Upstox login dialog.
///
/// `state` is echoed back by Upstox on the callback; the relay uses it to
/// carry the account the token belongs to.
pub fn build_authorization_url(config: &UpstoxConfig, state: Option<&str>) -> String {
    let mut params = vec![
        ("response_type", "code"),
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
    ];
    if let Some(state) = state {
        params.push(("state", state));
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", config.authorize_url, query)
}

/// Grant body for `grant_type=authorization_code`.
#[derive(Debug, Serialize)]
pub(crate) struct AuthorizationCodeGrant<'a> {
    pub code: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub redirect_uri: &'a str,
    pub grant_type: &'static str,
}

impl<'a> AuthorizationCodeGrant<'a> {
    pub fn new(config: &'a UpstoxConfig, code: &'a str) -> Self {
        Self {
            code,
            client_id: &config.client_id,
            client_secret: &config.client_secret,
            redirect_uri: &config.redirect_uri,
            grant_type: "authorization_code",
        }
    }
}

/// Grant body for `grant_type=refresh_token`.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshTokenGrant<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub grant_type: &'static str,
    pub refresh_token: &'a str,
}

impl<'a> RefreshTokenGrant<'a> {
    pub fn new(config: &'a UpstoxConfig, refresh_token: &'a str) -> Self {
        Self {
            client_id: &config.client_id,
            client_secret: &config.client_secret,
            grant_type: "refresh_token",
            refresh_token,
        }
    }
}

/// Token payload returned by the token endpoint.
///
/// Upstox adds profile fields (`email`, `user_id`, ...) next to the token;
/// they are kept in `extra` so the payload can be echoed unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
