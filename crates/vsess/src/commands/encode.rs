//! Encode command - prints the guestinfo keys for a bootstrap payload.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use vsess_bootstrap::{
    BootstrapData, BootstrapFormat, ExtraConfig, NetworkDevice, machine_metadata_ignition,
};

use super::Context;

/// Arguments for the encode command.
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Bootstrap payload file
    pub file: PathBuf,

    /// Payload format
    #[arg(short, long, default_value = "cloud-config")]
    pub format: BootstrapFormat,

    /// Hostname to inject (Ignition only)
    #[arg(long)]
    pub hostname: Option<String>,

    /// JSON file with the machine's network devices (Ignition only)
    #[arg(long)]
    pub devices: Option<PathBuf>,

    /// Metadata file stored under guestinfo.metadata
    #[arg(long)]
    pub metadata: Option<PathBuf>,
}

/// Run the encode command.
pub async fn run(args: EncodeArgs, ctx: &Context) -> Result<()> {
    let value = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let mut data = BootstrapData::new(value, args.format);

    if let Some(hostname) = &args.hostname {
        let devices: Vec<NetworkDevice> = match &args.devices {
            Some(path) => {
                let raw = std::fs::read(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                serde_json::from_slice(&raw)
                    .with_context(|| format!("invalid network devices in {}", path.display()))?
            }
            None => Vec::new(),
        };
        let rendered = machine_metadata_ignition(&data, hostname, &devices)?;
        data = BootstrapData::new(rendered, data.format());
    }

    let mut extra_config = ExtraConfig::new();
    extra_config.set_user_data(&data);
    if let Some(path) = &args.metadata {
        let metadata = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        extra_config.set_metadata(&metadata);
    }

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&extra_config)?);
    } else {
        for option in extra_config.iter() {
            println!("{}={}", option.key, option.value);
        }
    }
    Ok(())
}
