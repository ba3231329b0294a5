//! vsess - cached vCenter sessions from the command line
//!
//! Main entry point for the vsess CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{check, encode, find, provider_id, watch};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// vsess - cached vCenter sessions from the command line
#[derive(Parser)]
#[command(name = "vsess")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: ~/.config/vsess/config.toml layered with ./vsess.toml)
    #[arg(short, long, global = true, env = "VSESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and report the session state
    Check(check::CheckArgs),

    /// Find a virtual machine by BIOS or instance UUID
    Find(find::FindArgs),

    /// Hold a keepalive session and re-acquire it periodically
    Watch(watch::WatchArgs),

    /// Print the guestinfo keys for a bootstrap payload
    Encode(encode::EncodeArgs),

    /// Print the provider ID for a BIOS UUID
    ProviderId(provider_id::ProviderIdArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "vsess=debug,vsess_session=debug,vsess_client=debug,vsess_config=debug,vsess_bootstrap=debug,info"
    } else {
        "vsess=info,vsess_session=info,vsess_config=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    use tracing_subscriber::prelude::*;
    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    if cli.log_json {
        tracing_subscriber::registry()
            .with(console.json().with_filter(filter))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(console.with_filter(filter))
            .init();
    }

    let ctx = commands::Context {
        config_path: cli.config,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Check(args) => check::run(args, &ctx).await,
        Commands::Find(args) => find::run(args, &ctx).await,
        Commands::Watch(args) => watch::run(args, &ctx).await,
        Commands::Encode(args) => encode::run(args, &ctx).await,
        Commands::ProviderId(args) => provider_id::run(args, &ctx).await,
    }
}
