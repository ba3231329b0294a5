//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Missing required field.
    #[error("missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// Password not found through any resolution method.
    #[error(
        "password not found for '{username}'. Set it via env var ({env_var}) or `password` in [vcenter]"
    )]
    PasswordNotFound { username: String, env_var: String },

    /// Neither a thumbprint nor insecure mode was chosen.
    #[error("[tls] must set either thumbprint or insecure = true")]
    TlsNotConfigured,

    /// Both a thumbprint and insecure mode were chosen.
    #[error("[tls] sets both thumbprint and insecure = true; pick one")]
    ConflictingTls,

    /// The configured thumbprint is malformed.
    #[error("invalid [tls] thumbprint: {source}")]
    InvalidThumbprint { source: vsess_client::Error },
}

impl ConfigError {
    /// Configuration errors need the file fixed; none are retryable.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
