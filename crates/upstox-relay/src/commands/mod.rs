//! CLI command handlers.

pub mod config;
pub mod login_url;
pub mod serve;

use upstox_relay_config::RelayConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Configuration after file and environment layering.
    pub config: RelayConfig,
    /// Verbose output enabled.
    pub verbose: bool,
}
