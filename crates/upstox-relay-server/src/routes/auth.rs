//! OAuth endpoints: login redirect, code callback, token refresh.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;
use upstox_relay_oauth::{AccountId, TokenRecord};

use crate::account::Account;
use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Body returned to the browser once the code has been exchanged.
pub const LOGIN_SUCCESS_MESSAGE: &str = "Login successful. Token received, you can close this window.";

// ─────────────────────────────────────────────────────────────────────────────
// Login
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    /// Account the resulting token should be stored under.
    pub account: Option<String>,
}

/// GET /login
///
/// Redirects (302) to the Upstox login dialog. The account, when given,
/// travels through Upstox as the OAuth `state` parameter.
pub async fn login_handler(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Response> {
    let account = query.account.as_deref().and_then(AccountId::parse);
    let url = state
        .upstox
        .authorization_url(account.as_ref().map(AccountId::as_str));

    let location = HeaderValue::try_from(url)
        .map_err(|e| ServerError::Internal(format!("Invalid authorization URL: {}", e)))?;

    tracing::debug!(account = ?account, "Redirecting to Upstox login");
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

// ─────────────────────────────────────────────────────────────────────────────
// Callback
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// GET {callback_path}?code=...&state=...
///
/// Exchanges the authorization code and stores the token under the account
/// carried in `state`.
pub async fn callback_handler(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    let code = query
        .code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ServerError::BadRequest("Authorization code missing".to_string()))?;

    let account = query
        .state
        .as_deref()
        .and_then(AccountId::parse)
        .unwrap_or_default();

    tracing::info!(account = %account, "Authorization code received");

    let grant = state
        .upstox
        .exchange_code(code)
        .await
        .map_err(|e| ServerError::upstream("Token exchange failed", e))?;

    let record = TokenRecord::from_response(&grant.tokens);
    tracing::info!(
        account = %account,
        expires_in = ?record.expires_in,
        has_refresh_token = record.refresh_token.is_some(),
        "Token exchange succeeded"
    );
    state.tokens.put(account, record).await;

    Ok((StatusCode::OK, LOGIN_SUCCESS_MESSAGE).into_response())
}

// ─────────────────────────────────────────────────────────────────────────────
// Refresh
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// POST /refresh-token
///
/// Body (JSON or form, optional): `{ "refresh_token": "..." }`. Falls back
/// to the refresh token stored for the account when the body is empty, in
/// another encoding, or names no token.
pub async fn refresh_token_handler(
    State(state): State<AppState>,
    Account(account): Account,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let from_body = parse_refresh_request(&headers, &body)?
        .refresh_token
        .filter(|t| !t.trim().is_empty());

    let refresh_token = match from_body {
        Some(token) => token,
        None => state
            .tokens
            .get(&account)
            .await
            .and_then(|record| record.refresh_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServerError::BadRequest("No refresh token available".to_string()))?,
    };

    let grant = state
        .upstox
        .refresh_token(&refresh_token)
        .await
        .map_err(|e| ServerError::upstream("Token refresh failed", e))?;

    let record = TokenRecord::from_refresh(&grant.tokens, &refresh_token);
    tracing::info!(account = %account, expires_in = ?record.expires_in, "Token refreshed");
    state.tokens.put(account, record).await;

    Ok(Json(grant.raw))
}

/// Body encodings `/refresh-token` understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other,
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return BodyKind::Other;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == "application/json" || essence.ends_with("+json") {
        BodyKind::Json
    } else if essence == "application/x-www-form-urlencoded" {
        BodyKind::Form
    } else {
        BodyKind::Other
    }
}

/// Decode the refresh body by content type.
///
/// Empty bodies and bodies in any other encoding are an empty request, so
/// the stored refresh token is used.
fn parse_refresh_request(headers: &HeaderMap, body: &[u8]) -> Result<RefreshRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RefreshRequest::default());
    }

    match body_kind(headers) {
        BodyKind::Json => serde_json::from_slice(body)
            .map_err(|e| ServerError::BadRequest(format!("Invalid JSON body: {}", e))),
        BodyKind::Form => serde_urlencoded::from_bytes(body)
            .map_err(|e| ServerError::BadRequest(format!("Invalid form body: {}", e))),
        BodyKind::Other => {
            tracing::debug!("Ignoring refresh body with unsupported content type");
            Ok(RefreshRequest::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn test_parse_empty_body() {
        let json = headers_with("application/json");
        let request = parse_refresh_request(&json, b"").unwrap();
        assert!(request.refresh_token.is_none());

        let request = parse_refresh_request(&json, b"  \n").unwrap();
        assert!(request.refresh_token.is_none());
    }

    #[test]
    fn test_parse_json_body() {
        let json = headers_with("application/json; charset=utf-8");
        let request = parse_refresh_request(&json, br#"{"refresh_token":"R"}"#).unwrap();
        assert_eq!(request.refresh_token.as_deref(), Some("R"));

        let request = parse_refresh_request(&json, b"{}").unwrap();
        assert!(request.refresh_token.is_none());
    }

    #[test]
    fn test_parse_form_body() {
        let form = headers_with("application/x-www-form-urlencoded");
        let request = parse_refresh_request(&form, b"refresh_token=R%2B1").unwrap();
        assert_eq!(request.refresh_token.as_deref(), Some("R+1"));
    }

    #[test]
    fn test_parse_invalid_json_is_bad_request() {
        let json = headers_with("application/json");
        let err = parse_refresh_request(&json, b"not json").unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[test]
    fn test_parse_other_content_types_as_empty() {
        let request = parse_refresh_request(&headers_with("text/plain"), b"hello").unwrap();
        assert!(request.refresh_token.is_none());

        let request =
            parse_refresh_request(&HeaderMap::new(), br#"{"refresh_token":"R"}"#).unwrap();
        assert!(request.refresh_token.is_none());
    }

    #[test]
    fn test_body_kind() {
        assert_eq!(body_kind(&headers_with("Application/JSON")), BodyKind::Json);
        assert_eq!(body_kind(&headers_with("application/vnd.api+json")), BodyKind::Json);
        assert_eq!(
            body_kind(&headers_with("application/x-www-form-urlencoded; charset=utf-8")),
            BodyKind::Form
        );
        assert_eq!(body_kind(&headers_with("text/plain")), BodyKind::Other);
        assert_eq!(body_kind(&HeaderMap::new()), BodyKind::Other);
    }
}
