//! Serve command - runs the relay server.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;

use upstox_relay_oauth::UpstoxClient;
use upstox_relay_server::{AppState, HmacSha256Verifier, Server, ServerConfig};

use super::Context;

/// Arguments for the serve command.
///
/// CLI arguments override config file and environment values.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides HOST)
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.config.clone();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.host = bind;
    }
    config.validate()?;

    for var in config.missing_credentials() {
        tracing::warn!(var, "Required setting is not set; Upstox calls will fail");
    }

    let addr = config.bind_address()?;
    let upstox = UpstoxClient::new(config.upstox_config())?;

    let server_config = ServerConfig::new()
        .with_bind_address(addr)
        .with_callback_path(config.server.callback_path.clone())
        .with_request_logging(config.server.request_logging)
        .with_max_body_size(config.server.max_body_size);

    let mut state = AppState::new(server_config, upstox);
    match config.webhook.secret.as_deref() {
        Some(secret) => {
            let verifier = HmacSha256Verifier::new(secret, &config.webhook.signature_header)
                .context("Invalid webhook secret")?;
            tracing::info!(header = %config.webhook.signature_header, "Webhook signatures required");
            state = state.with_webhook_verifier(Arc::new(verifier));
        }
        None => tracing::debug!("Webhook signatures not checked"),
    }

    tracing::info!(
        address = %addr,
        token_encoding = %config.upstox.token_encoding,
        "Open http://{}/login to sign in",
        addr
    );

    Server::from_state(state)
        .run_with_shutdown(addr, shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
