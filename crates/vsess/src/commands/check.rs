//! Check command - logs in and reports the session state.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use super::Context;

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Keep the session logged in instead of logging out afterwards
    #[arg(long)]
    pub keep: bool,
}

/// Check response for JSON output.
#[derive(Debug, Serialize)]
struct CheckOutput {
    key: String,
    server: String,
    datacenter: String,
    datacenter_ref: String,
    active: bool,
    keepalive: bool,
    created_at: String,
}

/// Run the check command.
pub async fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let (cache, request) = ctx.session_setup()?;
    let session = cache.get_or_create(&request).await?;
    let active = session.is_active().await;

    let output = CheckOutput {
        key: session.key().to_string(),
        server: session.server().to_string(),
        datacenter: session.datacenter().name.clone(),
        datacenter_ref: session.datacenter().reference.to_string(),
        active,
        keepalive: session.is_keepalive(),
        created_at: session.created_at().to_rfc3339(),
    };

    if !args.keep {
        cache.shutdown().await;
    }

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let state = if output.active {
        Style::new().green().apply_to("● active")
    } else {
        Style::new().red().apply_to("● inactive")
    };

    println!();
    println!("{}", style("vCenter Session").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Status:"), state);
    println!("  {} {}", dim.apply_to("Server:"), output.server);
    println!(
        "  {} {} ({})",
        dim.apply_to("Datacenter:"),
        output.datacenter,
        output.datacenter_ref
    );
    println!(
        "  {} {}",
        dim.apply_to("Keepalive:"),
        if output.keepalive { "on" } else { "off" }
    );
    if ctx.verbose {
        println!("  {} {}", dim.apply_to("Key:"), output.key);
        println!("  {} {}", dim.apply_to("Created:"), output.created_at);
    }
    println!();

    Ok(())
}
