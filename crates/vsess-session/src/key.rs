//! Cache keys and session requests.

use std::fmt;

use vsess_client::TlsTrust;

use crate::config::Features;

/// Identity of a cached session: server, user and datacenter.
///
/// Two requests with the same key share one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    server: String,
    username: String,
    datacenter: String,
}

impl CacheKey {
    /// Create a key. An empty datacenter means "the server's default".
    pub fn new(
        server: impl Into<String>,
        username: impl Into<String>,
        datacenter: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            username: username.into(),
            datacenter: datacenter.into(),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn datacenter(&self) -> &str {
        &self.datacenter
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let datacenter = if self.datacenter.is_empty() {
            "<default>"
        } else {
            &self.datacenter
        };
        write!(f, "{}@{}/{}", self.username, self.server, datacenter)
    }
}

/// User name and password for one login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything needed to find or create a session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// Server address as given by the caller.
    pub server: String,

    /// Datacenter name; empty selects the server's only datacenter.
    pub datacenter: String,

    /// Login credentials.
    pub credentials: Credentials,

    /// Certificate trust for the connection.
    pub tls: TlsTrust,

    /// Behaviour flags applied when a new session is created.
    pub features: Features,
}

impl SessionRequest {
    /// Create a request for the default datacenter with default features.
    ///
    /// Certificate verification starts disabled; pass a pinned
    /// [`TlsTrust`] via [`SessionRequest::with_tls`] to enable it.
    pub fn new(server: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            server: server.into(),
            datacenter: String::new(),
            credentials,
            tls: TlsTrust::Insecure,
            features: Features::default(),
        }
    }

    /// Bind the session to a named datacenter.
    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = datacenter.into();
        self
    }

    /// Set the certificate trust mode.
    pub fn with_tls(mut self, tls: TlsTrust) -> Self {
        self.tls = tls;
        self
    }

    /// Set the feature flags.
    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    /// The cache key this request maps to.
    pub fn key(&self) -> CacheKey {
        CacheKey::new(
            self.server.clone(),
            self.credentials.username.clone(),
            self.datacenter.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_password_and_features() {
        let a = SessionRequest::new("vc", Credentials::new("admin", "one"));
        let b = SessionRequest::new("vc", Credentials::new("admin", "two"))
            .with_features(Features::new().without_keepalive());
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_key_distinguishes_datacenter() {
        let a = SessionRequest::new("vc", Credentials::new("admin", "pw"));
        let b = a.clone().with_datacenter("DC0");
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_key_display() {
        assert_eq!(
            CacheKey::new("vc.local", "admin", "").to_string(),
            "admin@vc.local/<default>"
        );
        assert_eq!(
            CacheKey::new("vc.local", "admin", "DC0").to_string(),
            "admin@vc.local/DC0"
        );
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let debug = format!("{:?}", Credentials::new("admin", "hunter2"));
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }
}
