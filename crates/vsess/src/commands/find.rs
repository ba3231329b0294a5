//! Find command - resolves a virtual machine by UUID.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::Context;

/// Arguments for the find command.
#[derive(Args, Debug)]
pub struct FindArgs {
    /// UUID of the virtual machine
    pub uuid: String,

    /// Search the instance UUID namespace instead of the BIOS UUID
    #[arg(long)]
    pub instance: bool,
}

#[derive(Debug, Serialize)]
struct FindOutput {
    uuid: String,
    namespace: &'static str,
    datacenter: String,
    found: Option<String>,
}

/// Run the find command.
pub async fn run(args: FindArgs, ctx: &Context) -> Result<()> {
    let (cache, request) = ctx.session_setup()?;
    let session = cache.get_or_create(&request).await?;

    let result = if args.instance {
        session.find_by_instance_uuid(&args.uuid).await
    } else {
        session.find_by_bios_uuid(&args.uuid).await
    };
    let datacenter = session.datacenter().name.clone();
    cache.shutdown().await;

    let output = FindOutput {
        uuid: args.uuid,
        namespace: if args.instance { "instance" } else { "bios" },
        datacenter,
        found: result?.map(|vm| vm.to_string()),
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        match &output.found {
            Some(vm) => println!("{vm}"),
            None => println!(
                "not found: no VM with {} UUID {} in {}",
                output.namespace, output.uuid, output.datacenter
            ),
        }
    }

    Ok(())
}
