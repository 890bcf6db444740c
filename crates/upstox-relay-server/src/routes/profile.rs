//! Profile passthrough.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
};
use serde_json::Value;

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// GET /profile
///
/// Forwards the caller's `Authorization` header to Upstox unchanged and
/// returns the profile body as received.
pub async fn profile_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| {
            ServerError::Unauthorized("Send access token in Authorization header".to_string())
        })?
        .to_str()
        .map_err(|_| ServerError::BadRequest("Authorization header is not valid text".to_string()))?;

    if authorization.trim().is_empty() {
        return Err(ServerError::Unauthorized(
            "Send access token in Authorization header".to_string(),
        ));
    }

    let profile = state
        .upstox
        .get_profile(authorization)
        .await
        .map_err(|e| ServerError::upstream("Profile fetch failed", e))?;

    Ok(Json(profile))
}
