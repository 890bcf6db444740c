//! Configuration for the Upstox token relay.
//!
//! TOML file (`relay.toml`) with `[server]`, `[upstox]` and `[webhook]`
//! sections, overlaid by the `PORT` / `UPSTOX_*` environment variables the
//! relay has always been configured with.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    CONFIG_FILE, apply_env, discover_config_file, load_config, load_config_file,
    load_config_with,
};
pub use error::{ConfigError, Result};
pub use types::{RelayConfig, ServerSection, UpstoxSection, WebhookSection};
