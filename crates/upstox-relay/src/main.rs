//! Upstox token relay
//!
//! Main entry point for the relay CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, login_url, serve};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Upstox token relay - OAuth login, token refresh and webhook receiver
#[derive(Parser)]
#[command(name = "upstox-relay")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file (default: ./relay.toml if present)
    #[arg(long, global = true, env = "UPSTOX_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write JSON logs, rotated daily, to this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay server (default)
    Serve(serve::ServeArgs),

    /// Print the Upstox login URL
    LoginUrl(login_url::LoginUrlArgs),

    /// Print the effective configuration with secrets redacted
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Values from .env fill in whatever the environment leaves unset.
    let dotenv = dotenvy::dotenv();

    let _guard = init_tracing(cli.verbose, cli.log_dir.as_deref());

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Failed to read .env"),
    }

    let relay_config = upstox_relay_config::load_config(cli.config.as_deref())?;

    let ctx = commands::Context {
        config: relay_config,
        verbose: cli.verbose,
    };

    match cli.command {
        Some(Commands::Serve(args)) => serve::run(args, &ctx).await,
        Some(Commands::LoginUrl(args)) => login_url::run(args, &ctx),
        Some(Commands::Config(args)) => config::run(args, &ctx),
        None => serve::run(serve::ServeArgs::default(), &ctx).await,
    }
}

/// Console logging, plus a JSON file layer when `log_dir` is given.
///
/// `RUST_LOG` replaces the console filter when set.
fn init_tracing(
    verbose: bool,
    log_dir: Option<&std::path::Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let default_filter = if verbose {
        "upstox_relay=debug,upstox_relay_server=debug,upstox_relay_oauth=debug,upstox_relay_config=debug,tower_http=debug,info"
    } else {
        "upstox_relay=info,upstox_relay_server=info,upstox_relay_oauth=info,upstox_relay_config=info,warn"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "upstox-relay.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "upstox_relay=trace,upstox_relay_server=trace,upstox_relay_oauth=trace,upstox_relay_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    guard
}
