//! Request logging.
//!
//! Query strings never reach the logs: the callback carries the
//! authorization code in its query.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use upstox_relay_oauth::AccountId;

use crate::account::ACCOUNT_HEADER;
use crate::state::AppState;

/// Span for `TraceLayer`, carrying method and path only.
pub fn request_span(request: &Request<Body>) -> Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path()
    )
}

/// Log one line per request with the matched route, the account named by
/// `x-account-id` (if any), status and latency.
///
/// Server errors log at error, client errors at warn, everything else at
/// info. Health probes drop to debug.
pub async fn request_logging_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.request_logging {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "<unmatched>".to_string());
    let account = request
        .headers()
        .get(ACCOUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(AccountId::parse);

    let start = Instant::now();
    let response = next.run(request).await;
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    let status = response.status();

    let account = account.as_ref().map(AccountId::as_str);
    let code = status.as_u16();

    macro_rules! log_request {
        ($level:ident, $message:literal) => {
            tracing::$level!(
                method = %method,
                route = %route,
                account,
                status = code,
                duration_ms,
                $message
            )
        };
    }

    if status.is_server_error() {
        log_request!(error, "Request failed");
    } else if status.is_client_error() {
        log_request!(warn, "Request rejected");
    } else if route == "/health" {
        log_request!(debug, "Health check");
    } else {
        log_request!(info, "Request completed");
    }

    response
}
