//! HTTP client for the Upstox token and profile endpoints.

use reqwest::{Client, RequestBuilder, Response, header};
use serde::Serialize;
use serde_json::Value;

use crate::error::{OAuthError, Result, extract_upstream_message};
use crate::oauth::{
    AuthorizationCodeGrant, RefreshTokenGrant, TokenEncoding, TokenResponse, UpstoxConfig,
    build_authorization_url,
};

/// Parsed token payload plus the raw body it came from.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub tokens: TokenResponse,
    pub raw: Value,
}

/// Client for the Upstox OAuth and user endpoints.
///
/// One `reqwest::Client` is shared by all calls; the configured timeout
/// applies to each request.
#[derive(Debug, Clone)]
pub struct UpstoxClient {
    config: UpstoxConfig,
    http: Client,
}

impl UpstoxClient {
    pub fn new(config: UpstoxConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OAuthError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &UpstoxConfig {
        &self.config
    }

    /// Login dialog URL for this application.
    pub fn authorization_url(&self, state: Option<&str>) -> String {
        build_authorization_url(&self.config, state)
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
        let grant = AuthorizationCodeGrant::new(&self.config, code);
        tracing::debug!(encoding = %self.config.token_encoding, "Exchanging authorization code");
        self.post_grant(&grant).await
    }

    /// Obtain a new access token with a refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant> {
        let grant = RefreshTokenGrant::new(&self.config, refresh_token);
        tracing::debug!(encoding = %self.config.token_encoding, "Refreshing access token");
        self.post_grant(&grant).await
    }

    /// Fetch the user profile, forwarding `authorization` unchanged.
    pub async fn get_profile(&self, authorization: &str) -> Result<Value> {
        let response = self
            .http
            .get(&self.config.profile_url)
            .header(header::AUTHORIZATION, authorization)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        read_json(response).await
    }

    async fn post_grant<T: Serialize>(&self, grant: &T) -> Result<TokenGrant> {
        let request = self
            .http
            .post(&self.config.token_url)
            .header(header::ACCEPT, "application/json");

        let response = encode_grant(request, self.config.token_encoding, grant)
            .send()
            .await?;

        let raw = read_json(response).await?;
        let tokens: TokenResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            OAuthError::InvalidResponse(format!("Failed to parse token response: {}", e))
        })?;

        Ok(TokenGrant { tokens, raw })
    }
}

fn encode_grant<T: Serialize>(
    request: RequestBuilder,
    encoding: TokenEncoding,
    grant: &T,
) -> RequestBuilder {
    match encoding {
        TokenEncoding::Form => request.form(grant),
        TokenEncoding::Json => request.json(grant),
    }
}

/// Read a JSON body, turning non-2xx statuses into [`OAuthError::Upstream`].
async fn read_json(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let payload = serde_json::from_str::<Value>(&text)
            .ok()
            .or_else(|| (!text.is_empty()).then(|| Value::String(text.clone())));

        let message = payload
            .as_ref()
            .and_then(extract_upstream_message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        tracing::warn!(status = status.as_u16(), error = %message, "Upstream call failed");

        return Err(OAuthError::Upstream {
            status: status.as_u16(),
            message,
            payload,
        });
    }

    serde_json::from_str(&text)
        .map_err(|e| OAuthError::InvalidResponse(format!("Expected JSON body: {}", e)))
}
