//! HTTP surface of the Upstox token relay.
//!
//! Serves the browser login flow, token refresh, a profile passthrough
//! and two webhook receivers on top of [`upstox_relay_oauth`].
//!
//! # Example
//!
//! ```ignore
//! use upstox_relay_oauth::{UpstoxClient, UpstoxConfig};
//! use upstox_relay_server::{Server, ServerConfig};
//!
//! let upstox = UpstoxClient::new(UpstoxConfig::new(key, secret, redirect))?;
//! let config = ServerConfig::new().with_bind_address("0.0.0.0:3000".parse()?);
//!
//! Server::new(config, upstox).run().await?;
//! ```

pub mod account;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;
pub mod webhook;

pub use account::{ACCOUNT_HEADER, Account};
pub use config::{FIXED_PATHS, ServerConfig};
pub use error::{ErrorResponse, Result, ServerError};
pub use logging::request_logging_middleware;
pub use state::AppState;
pub use webhook::{
    AcceptAll, HmacSha256Verifier, SharedWebhookVerifier, WebhookError, WebhookVerifier,
};

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use upstox_relay_oauth::UpstoxClient;

/// The relay HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a server with an in-memory token store and open webhooks.
    pub fn new(config: ServerConfig, upstox: UpstoxClient) -> Self {
        Self {
            state: AppState::new(config, upstox),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes and middleware.
    ///
    /// Fails when the configured callback path cannot be mounted.
    pub fn router(&self) -> Result<Router> {
        self.state.config.validate()?;
        let callback_path = self.state.config.callback_path.as_str();

        let router = Router::new()
            .merge(routes::health_routes())
            .route("/login", get(routes::login_handler))
            .route(callback_path, get(routes::callback_handler))
            .route("/refresh-token", post(routes::refresh_token_handler))
            .route("/profile", get(routes::profile_handler))
            .route("/webhook", post(routes::webhook_handler))
            .route("/token-webhook", post(routes::token_webhook_handler))
            .layer(DefaultBodyLimit::max(self.state.config.max_body_size))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http().make_span_with(logging::request_span))
            .with_state(self.state.clone());

        Ok(router)
    }

    /// Run the server on the configured address.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        self.run_with_shutdown(addr, std::future::pending()).await
    }

    /// Run until `shutdown` resolves, then finish in-flight requests.
    pub async fn run_with_shutdown<F>(self, addr: SocketAddr, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router()?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

        info!(
            address = %addr,
            callback_path = %self.state.config.callback_path,
            "Starting relay server"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Relay server stopped");
        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;
    use upstox_relay_oauth::{AccountId, UpstoxConfig};

    fn test_server(config: ServerConfig) -> Server {
        // Points at a closed port; these tests never reach Upstox.
        let upstox = UpstoxClient::new(
            UpstoxConfig::new("KEY", "SECRET", "http://localhost:3000/auth")
                .with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();
        Server::new(config.with_request_logging(false), upstox)
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_login_redirects_with_302() {
        let router = test_server(ServerConfig::new()).router().unwrap();

        let response = router
            .oneshot(Request::builder().uri("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert_eq!(
            location,
            "http://127.0.0.1:9/v2/login/authorization/dialog?response_type=code&client_id=KEY&redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth"
        );
    }

    #[tokio::test]
    async fn test_login_carries_account_as_state() {
        let router = test_server(ServerConfig::new()).router().unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/login?account=alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.ends_with("&state=alice"));
    }

    #[tokio::test]
    async fn test_callback_without_code_is_bad_request() {
        let router = test_server(ServerConfig::new()).router().unwrap();

        let response = router
            .oneshot(Request::builder().uri("/auth").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("Authorization code missing"));
    }

    #[tokio::test]
    async fn test_callback_path_is_configurable() {
        let router = test_server(ServerConfig::new().with_callback_path("/callback"))
            .router()
            .unwrap();

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/callback").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(Request::builder().uri("/auth").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_refresh_without_token_is_bad_request() {
        let server = test_server(ServerConfig::new());
        let router = server.router().unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/refresh-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("No refresh token available"));
        assert!(server.state().tokens.get(&AccountId::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_profile_without_authorization_is_unauthorized() {
        let router = test_server(ServerConfig::new()).router().unwrap();

        let response = router
            .oneshot(Request::builder().uri("/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(
            body_string(response)
                .await
                .contains("Send access token in Authorization header")
        );
    }

    #[tokio::test]
    async fn test_webhooks_acknowledge() {
        let router = test_server(ServerConfig::new()).router().unwrap();

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .body(Body::from("not even json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "OK");

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/token-webhook")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"access_token":"T"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Notifier received");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let router = test_server(ServerConfig::new().with_max_body_size(16))
            .router()
            .unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .body(Body::from(vec![b'x'; 64]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_router_rejects_unmountable_callback_path() {
        for path in ["/auth/:x", "/auth/*rest", "/login"] {
            let server = test_server(ServerConfig::new().with_callback_path(path));
            assert!(
                matches!(server.router(), Err(ServerError::Config(_))),
                "{path}"
            );
        }
    }

    #[tokio::test]
    async fn test_run_on_reports_invalid_callback_path() {
        let server = test_server(ServerConfig::new().with_callback_path("/auth/:x"));
        let err = server
            .run_on("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn test_bind_address() {
        let server = test_server(
            ServerConfig::new().with_bind_address("127.0.0.1:4567".parse().unwrap()),
        );
        assert_eq!(server.bind_address().port(), 4567);
    }
}
