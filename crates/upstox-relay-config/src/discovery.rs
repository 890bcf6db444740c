//! Config file discovery and environment layering.
//!
//! Precedence, lowest to highest: built-in defaults, `relay.toml`,
//! environment variables. CLI flags are applied by the binary on top.

use std::path::{Path, PathBuf};

use upstox_relay_oauth::TokenEncoding;

use crate::error::{ConfigError, Result};
use crate::types::RelayConfig;

/// Config file looked up in the working directory when none is given.
pub const CONFIG_FILE: &str = "relay.toml";

pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "HOST";
pub const ENV_API_KEY: &str = "UPSTOX_API_KEY";
pub const ENV_API_SECRET: &str = "UPSTOX_API_SECRET";
pub const ENV_REDIRECT_URI: &str = "UPSTOX_REDIRECT_URI";
pub const ENV_TOKEN_ENCODING: &str = "UPSTOX_TOKEN_ENCODING";
pub const ENV_CALLBACK_PATH: &str = "UPSTOX_CALLBACK_PATH";
pub const ENV_TIMEOUT_SECS: &str = "UPSTOX_TIMEOUT_SECS";
pub const ENV_WEBHOOK_SECRET: &str = "UPSTOX_WEBHOOK_SECRET";

/// Load and parse a single config file.
pub fn load_config_file(path: &Path) -> Result<RelayConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    RelayConfig::from_toml_str(&content)
}

/// The config file to use: the explicit one, else `relay.toml` if present.
pub fn discover_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let local = PathBuf::from(CONFIG_FILE);
            local.is_file().then_some(local)
        }
    }
}

/// Load configuration from the discovered file and the process environment.
pub fn load_config(explicit: Option<&Path>) -> Result<RelayConfig> {
    load_config_with(explicit, |var| std::env::var(var).ok())
}

/// Like [`load_config`] with an injectable environment lookup.
pub fn load_config_with<F>(explicit: Option<&Path>, lookup: F) -> Result<RelayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match discover_config_file(explicit) {
        Some(path) => load_config_file(&path)?,
        None => RelayConfig::default(),
    };
    apply_env(&mut config, lookup)?;
    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// Empty variables are treated as unset.
pub fn apply_env<F>(config: &mut RelayConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    if let Some(port) = get(ENV_PORT) {
        config.server.port = port.trim().parse().map_err(|e| ConfigError::InvalidEnv {
            var: ENV_PORT.to_string(),
            reason: format!("'{}': {}", port, e),
        })?;
    }
    if let Some(host) = get(ENV_HOST) {
        config.server.host = host;
    }
    if let Some(path) = get(ENV_CALLBACK_PATH) {
        config.server.callback_path = path;
    }

    if let Some(key) = get(ENV_API_KEY) {
        config.upstox.api_key = Some(key);
    }
    if let Some(secret) = get(ENV_API_SECRET) {
        config.upstox.api_secret = Some(secret);
    }
    if let Some(uri) = get(ENV_REDIRECT_URI) {
        config.upstox.redirect_uri = Some(uri);
    }
    if let Some(encoding) = get(ENV_TOKEN_ENCODING) {
        config.upstox.token_encoding =
            encoding
                .parse::<TokenEncoding>()
                .map_err(|reason| ConfigError::InvalidEnv {
                    var: ENV_TOKEN_ENCODING.to_string(),
                    reason,
                })?;
    }
    if let Some(secs) = get(ENV_TIMEOUT_SECS) {
        config.upstox.timeout_secs = secs.trim().parse().map_err(|e| ConfigError::InvalidEnv {
            var: ENV_TIMEOUT_SECS.to_string(),
            reason: format!("'{}': {}", secs, e),
        })?;
    }

    if let Some(secret) = get(ENV_WEBHOOK_SECRET) {
        config.webhook.secret = Some(secret);
    }

    Ok(())
}
