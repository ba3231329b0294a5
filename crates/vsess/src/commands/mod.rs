//! CLI command handlers.

pub mod check;
pub mod encode;
pub mod find;
pub mod provider_id;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tracing::{debug, warn};
use vsess_config::{LoadedConfig, VsessConfig};
use vsess_session::{SessionCache, SessionRequest};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file, if one was given.
    pub config_path: Option<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Load and merge the config layers, logging any warnings.
    pub fn load_config(&self) -> Result<VsessConfig> {
        let LoadedConfig {
            config,
            sources,
            warnings,
        } = vsess_config::load_config(self.config_path.as_deref())
            .context("failed to load configuration")?;

        for source in sources.iter().filter(|s| s.loaded) {
            debug!(path = %source.path.display(), "loaded config");
        }
        for warning in &warnings {
            warn!("{warning}");
        }
        Ok(config)
    }

    /// A session cache and request built from the loaded config.
    pub fn session_setup(&self) -> Result<(SessionCache, SessionRequest)> {
        let config = self.load_config()?;
        let request = config
            .session_request()
            .context("incomplete [vcenter] configuration")?;
        let cache = SessionCache::new(config.cache_config());
        Ok((cache, request))
    }
}
