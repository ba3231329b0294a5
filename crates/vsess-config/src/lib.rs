//! Configuration for the vsess command-line tool.
//!
//! Provides TOML-based configuration with:
//! - Server, credentials and datacenter (`[vcenter]`)
//! - Explicit certificate trust (`[tls]`)
//! - Keepalive and cache tuning (`[keepalive]`, `[cache]`)
//! - Config file layering (XDG user config + project-local overrides)
//! - Password resolution (env var → `VSESS_PASSWORD` → config file)

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    CONFIG_FILE_ENV, ConfigSource, LoadedConfig, load_config, load_config_file,
    load_config_with_options, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use secrets::{PASSWORD_ENV, ResolvedSecret, SecretSource, resolve_password};
pub use types::*;
