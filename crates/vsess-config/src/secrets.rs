//! Password resolution.
//!
//! Resolution order:
//! 1. Environment variable named by `password_env`
//! 2. `VSESS_PASSWORD`
//! 3. Config file (with warning)

use crate::types::VcenterConfig;

/// Fallback environment variable for the vCenter password.
pub const PASSWORD_ENV: &str = "VSESS_PASSWORD";

/// Result of password resolution with provenance.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    /// The secret value.
    pub value: String,
    /// Where the secret was found.
    pub source: SecretSource,
}

impl std::fmt::Debug for ResolvedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecret")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Environment variable.
    EnvVar(String),
    /// Config file (plaintext, not recommended).
    ConfigFile,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Resolve the password for `vcenter`, looking variables up with `env`.
pub fn resolve_password(
    vcenter: &VcenterConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Option<ResolvedSecret> {
    let named = vcenter.password_env.as_deref().filter(|n| !n.is_empty());
    for var in named.into_iter().chain([PASSWORD_ENV]) {
        if let Some(value) = env(var).filter(|v| !v.is_empty()) {
            return Some(ResolvedSecret {
                value,
                source: SecretSource::EnvVar(var.to_string()),
            });
        }
    }

    vcenter
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| ResolvedSecret {
            value: p.to_string(),
            source: SecretSource::ConfigFile,
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
