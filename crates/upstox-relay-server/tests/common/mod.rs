//! Common test utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, redirect};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use wiremock::MockServer;

use upstox_relay_oauth::{SharedTokenStore, TokenEncoding, UpstoxClient, UpstoxConfig};
use upstox_relay_server::{AppState, Server, ServerConfig, SharedWebhookVerifier};

pub const API_KEY: &str = "test-key";
pub const API_SECRET: &str = "test-secret";
pub const REDIRECT_URI: &str = "http://localhost:3000/auth";

/// Options for a test server.
#[derive(Default)]
pub struct TestOptions {
    pub callback_path: Option<String>,
    pub token_encoding: TokenEncoding,
    pub webhook_verifier: Option<SharedWebhookVerifier>,
    /// Point the client at a closed port instead of the mock upstream.
    pub unreachable_upstream: bool,
}

/// A relay server running in the background against a mock Upstox.
pub struct TestServer {
    pub addr: SocketAddr,
    /// Client that does not follow redirects.
    pub client: Client,
    /// Stand-in for the Upstox API.
    pub upstream: MockServer,
    /// Token store the server writes to.
    pub tokens: SharedTokenStore,
    _handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(TestOptions::default()).await
    }

    pub async fn start_with(options: TestOptions) -> Result<Self> {
        let upstream = MockServer::start().await;
        let addr = find_available_port().await?;

        let upstream_url = if options.unreachable_upstream {
            format!("http://{}", find_available_port().await?)
        } else {
            upstream.uri()
        };

        let upstox_config = UpstoxConfig::new(API_KEY, API_SECRET, REDIRECT_URI)
            .with_base_url(&upstream_url)
            .with_token_encoding(options.token_encoding)
            .with_timeout(Duration::from_secs(5));
        let upstox = UpstoxClient::new(upstox_config)?;

        let mut config = ServerConfig::new()
            .with_bind_address(addr)
            .with_request_logging(false);
        if let Some(path) = options.callback_path {
            config = config.with_callback_path(path);
        }

        let mut state = AppState::new(config, upstox);
        if let Some(verifier) = options.webhook_verifier {
            state = state.with_webhook_verifier(verifier);
        }
        let tokens = state.tokens.clone();

        let server = Server::from_state(state);
        let handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            upstream,
            tokens,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url(), path))
    }
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
