//! Login URL command - prints the Upstox authorization URL.

use anyhow::{Result, bail};
use clap::Args;

use upstox_relay_oauth::{AccountId, build_authorization_url};

use super::Context;

/// Arguments for the login-url command.
#[derive(Args, Debug, Default)]
pub struct LoginUrlArgs {
    /// Account the resulting token is stored under
    #[arg(short, long)]
    pub account: Option<String>,
}

/// Run the login-url command.
pub fn run(args: LoginUrlArgs, ctx: &Context) -> Result<()> {
    for var in ctx.config.missing_credentials() {
        tracing::warn!(var, "Required setting is not set");
    }
    if ctx.config.upstox.api_key.as_deref().is_none_or(str::is_empty) {
        bail!("UPSTOX_API_KEY is required to build the login URL");
    }

    let account = args.account.as_deref().and_then(AccountId::parse);
    let url = build_authorization_url(
        &ctx.config.upstox_config(),
        account.as_ref().map(AccountId::as_str),
    );

    println!("{}", url);
    Ok(())
}
