//! Provider ID command.

use anyhow::{Result, bail};
use clap::Args;
use serde_json::json;
use vsess_bootstrap::uuid_to_provider_id;

use super::Context;

/// Arguments for the provider-id command.
#[derive(Args, Debug)]
pub struct ProviderIdArgs {
    /// BIOS UUID of the virtual machine
    pub uuid: String,
}

/// Run the provider-id command.
pub async fn run(args: ProviderIdArgs, ctx: &Context) -> Result<()> {
    let provider_id = uuid_to_provider_id(args.uuid.trim());
    if provider_id.is_empty() {
        bail!("'{}' is not a valid UUID", args.uuid);
    }

    if ctx.json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "uuid": args.uuid.trim(), "providerID": provider_id }))?
        );
    } else {
        println!("{provider_id}");
    }
    Ok(())
}
