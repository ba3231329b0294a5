//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [vcenter]
//! server = "vc.example.com"
//! datacenter = "DC0"              # optional, empty selects the only datacenter
//! username = "administrator@vsphere.local"
//! password_env = "VC_PASSWORD"    # or password = "..." (warned about)
//!
//! [tls]
//! thumbprint = "AB:CD:..."        # or insecure = true
//!
//! [keepalive]
//! enabled = true
//! interval_secs = 300
//!
//! [cache]
//! lock = "global"                 # or "per-key"
//! connect_timeout_secs = 30
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use vsess_client::TlsTrust;
use vsess_session::{
    CacheConfig, Credentials, Features, KeepAliveConfig, LockGranularity, SessionRequest,
};

use crate::error::{ConfigError, Result};
use crate::secrets::{SecretSource, resolve_password};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so partial files can be layered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VsessConfig {
    /// Server and credentials.
    pub vcenter: Option<VcenterConfig>,

    /// Certificate trust.
    pub tls: Option<TlsConfig>,

    /// Keepalive for created sessions.
    pub keepalive: Option<KeepAliveSection>,

    /// Session cache behaviour.
    pub cache: Option<CacheSection>,
}

impl VsessConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: VsessConfig) {
        if other.vcenter.is_some() {
            self.vcenter = other.vcenter;
        }
        if other.tls.is_some() {
            self.tls = other.tls;
        }
        if other.keepalive.is_some() {
            self.keepalive = other.keepalive;
        }
        if other.cache.is_some() {
            self.cache = other.cache;
        }
    }

    /// The `[vcenter]` section, which every command that talks to a server
    /// needs.
    pub fn vcenter(&self) -> Result<&VcenterConfig> {
        let vcenter = self.vcenter.as_ref().ok_or_else(|| ConfigError::MissingField {
            field: "vcenter".to_string(),
            context: "config".to_string(),
        })?;
        for (field, value) in [("server", &vcenter.server), ("username", &vcenter.username)] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                    context: "[vcenter]".to_string(),
                });
            }
        }
        Ok(vcenter)
    }

    /// Certificate trust from the `[tls]` section.
    ///
    /// The section must choose explicitly: a thumbprint, or
    /// `insecure = true`.
    pub fn tls_trust(&self) -> Result<TlsTrust> {
        let tls = self.tls.clone().unwrap_or_default();
        let thumbprint = tls.thumbprint.as_deref().map(str::trim).filter(|t| !t.is_empty());
        match (thumbprint, tls.insecure) {
            (Some(_), true) => Err(ConfigError::ConflictingTls),
            (Some(value), false) => TlsTrust::from_thumbprint(Some(value))
                .map_err(|source| ConfigError::InvalidThumbprint { source }),
            (None, true) => {
                warn!("[tls] insecure = true; server certificates will not be verified");
                Ok(TlsTrust::Insecure)
            }
            (None, false) => Err(ConfigError::TlsNotConfigured),
        }
    }

    /// Feature flags for new sessions.
    pub fn features(&self) -> Features {
        let keepalive = self.keepalive.clone().unwrap_or_default();
        let config = if keepalive.enabled {
            KeepAliveConfig::every(Duration::from_secs(keepalive.interval_secs.max(1)))
        } else {
            KeepAliveConfig::disabled()
        };
        Features::new().with_keepalive(config)
    }

    /// Cache configuration from the `[cache]` section.
    pub fn cache_config(&self) -> CacheConfig {
        let cache = self.cache.clone().unwrap_or_default();
        let mut config = CacheConfig::new()
            .with_lock(cache.lock.into())
            .with_connect_timeout(Duration::from_secs(cache.connect_timeout_secs));
        if let Some(secs) = cache.acquire_timeout_secs {
            config = config.with_acquire_timeout(Duration::from_secs(secs));
        }
        config
    }

    /// A complete session request, resolving the password.
    pub fn session_request(&self) -> Result<SessionRequest> {
        self.session_request_with(|name| std::env::var(name).ok())
    }

    /// [`VsessConfig::session_request`] with a custom environment lookup.
    pub fn session_request_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<SessionRequest> {
        let vcenter = self.vcenter()?;
        let password = resolve_password(vcenter, env).ok_or_else(|| {
            ConfigError::PasswordNotFound {
                username: vcenter.username.clone(),
                env_var: vcenter
                    .password_env
                    .clone()
                    .unwrap_or_else(|| crate::secrets::PASSWORD_ENV.to_string()),
            }
        })?;
        if password.source == SecretSource::ConfigFile {
            warn!(username = %vcenter.username, "using plaintext password from config file");
        }

        Ok(SessionRequest::new(
            vcenter.server.trim(),
            Credentials::new(vcenter.username.trim(), password.value),
        )
        .with_datacenter(vcenter.datacenter.trim())
        .with_tls(self.tls_trust()?)
        .with_features(self.features()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// `[vcenter]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VcenterConfig {
    /// Host, `host:port` or URL.
    pub server: String,

    /// Datacenter name. Empty selects the server's only datacenter.
    pub datacenter: String,

    pub username: String,

    /// Environment variable holding the password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Plaintext password. Prefer `password_env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl VcenterConfig {
    /// Whether a plaintext password is present.
    pub fn has_plaintext_password(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// `[tls]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// SHA-1 or SHA-256 certificate thumbprint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbprint: Option<String>,

    /// Skip certificate verification.
    pub insecure: bool,
}

/// `[keepalive]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepAliveSection {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for KeepAliveSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: vsess_session::DEFAULT_KEEPALIVE_INTERVAL.as_secs(),
        }
    }
}

/// Lock granularity as written in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockMode {
    #[default]
    Global,
    PerKey,
}

impl From<LockMode> for LockGranularity {
    fn from(mode: LockMode) -> Self {
        match mode {
            LockMode::Global => LockGranularity::Global,
            LockMode::PerKey => LockGranularity::PerKey,
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub lock: LockMode,
    pub connect_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquire_timeout_secs: Option<u64>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            lock: LockMode::default(),
            connect_timeout_secs: vsess_session::DEFAULT_CONNECT_TIMEOUT.as_secs(),
            acquire_timeout_secs: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
