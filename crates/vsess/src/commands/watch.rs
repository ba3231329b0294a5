//! Watch command - holds a keepalive session and re-acquires it on an
//! interval until interrupted.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};
use vsess_session::{CancellationToken, KeepAliveConfig};

use super::Context;

/// Arguments for the watch command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Stop after this many polls (default: run until Ctrl-C)
    #[arg(short, long)]
    pub polls: Option<u32>,

    /// Seconds between polls
    #[arg(long, default_value_t = 60)]
    pub every: u64,
}

#[derive(Debug, Serialize)]
struct WatchOutput {
    polls: u32,
    reauthentications: u32,
    creations: u64,
    hits: u64,
    evictions: u64,
}

/// Run the watch command.
pub async fn run(args: WatchArgs, ctx: &Context) -> Result<()> {
    let (cache, mut request) = ctx.session_setup()?;
    if !request.features.keepalive.enabled {
        request.features.keepalive = KeepAliveConfig::default();
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let mut ticker = tokio::time::interval(Duration::from_secs(args.every.max(1)));
    let mut polls = 0u32;
    let mut reauthentications = 0u32;
    let mut last_session = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match cache.get_or_create_until(&request, &cancel).await {
            Ok(session) => {
                if last_session.is_some_and(|id| id != session.id()) {
                    reauthentications += 1;
                    info!(key = %session.key(), session = session.id(), "re-authenticated");
                }
                last_session = Some(session.id());
            }
            Err(vsess_session::Error::Cancelled { .. }) => break,
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "session unavailable; retrying next poll");
            }
            Err(e) => {
                cache.shutdown().await;
                return Err(e.into());
            }
        }

        polls += 1;
        if args.polls.is_some_and(|limit| polls >= limit) {
            break;
        }
    }

    let stats = cache.stats().await;
    cache.shutdown().await;

    let output = WatchOutput {
        polls,
        reauthentications,
        creations: stats.creations,
        hits: stats.hits,
        evictions: stats.evictions,
    };
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "{} polls, {} re-authentications ({} created, {} hits, {} evicted)",
            output.polls,
            output.reauthentications,
            output.creations,
            output.hits,
            output.evictions
        );
    }

    Ok(())
}
