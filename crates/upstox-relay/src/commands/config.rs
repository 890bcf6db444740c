//! Config command - shows the effective configuration.

use anyhow::Result;
use clap::Args;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Output as JSON instead of TOML
    #[arg(long)]
    pub json: bool,
}

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    let redacted = ctx.config.redacted();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&redacted)?);
    } else {
        print!("{}", redacted.to_toml_string()?);
    }

    if ctx.verbose {
        let missing = ctx.config.missing_credentials();
        if !missing.is_empty() {
            eprintln!("missing: {}", missing.join(", "));
        }
    }

    Ok(())
}
