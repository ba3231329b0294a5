//! Client error types.

use serde::Deserialize;
use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server address could not be turned into an endpoint URL.
    #[error("error parsing vCenter URL {server:?}: {reason}")]
    InvalidServer {
        /// The address as supplied by the caller.
        server: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A certificate thumbprint could not be parsed.
    #[error("invalid certificate thumbprint {value:?}: {reason}")]
    InvalidThumbprint {
        /// The thumbprint as supplied by the caller.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Server returned a fault.
    #[error("API error ({status}): {fault}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Fault type name reported by the server.
        fault: String,
        /// Human-readable fault message.
        message: String,
    },

    /// Login was rejected or the session is no longer authenticated.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Managed object not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// TLS setup failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_)) || matches!(self, Error::Api { status: 404, .. })
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_)) || matches!(self, Error::Api { status: 401, .. })
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status >= 500)
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Connection failures, timeouts and 5xx faults are transient; malformed
    /// input and rejected credentials are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fault body returned by the VI/JSON API.
#[derive(Debug, Deserialize)]
pub(crate) struct Fault {
    #[serde(rename = "_typeName", default)]
    pub type_name: String,
    #[serde(rename = "faultMessage", default)]
    pub fault_message: Vec<LocalizableMessage>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocalizableMessage {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl Fault {
    /// Best available description: explicit message, first localized
    /// message, first message key, then the fault type itself.
    pub fn describe(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            return message.to_string();
        }
        for m in &self.fault_message {
            if let Some(text) = m.message.as_deref().filter(|t| !t.is_empty()) {
                return text.to_string();
            }
            if !m.key.is_empty() {
                return m.key.clone();
            }
        }
        self.type_name.clone()
    }

    /// Fault types that mean the credentials or session are not accepted.
    pub fn is_auth_fault(&self) -> bool {
        matches!(
            self.type_name.as_str(),
            "InvalidLogin" | "NotAuthenticated" | "NoPermission" | "InvalidCredentials"
        )
    }
}
