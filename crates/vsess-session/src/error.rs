//! Error types for session cache operations.

use std::time::Duration;

use vsess_client::Error as ClientError;

/// Error type for session cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server address could not be parsed.
    #[error("error parsing vCenter URL {server:?}: {source}")]
    InvalidServer {
        server: String,
        source: ClientError,
    },

    /// The transport to the server could not be set up.
    #[error("error setting up new vCenter client for {server}: {source}")]
    Connect {
        server: String,
        source: ClientError,
    },

    /// The server rejected the credentials.
    #[error("login to {server} as {username} failed: {source}")]
    Authentication {
        server: String,
        username: String,
        source: ClientError,
    },

    /// Listing datacenters failed.
    #[error("error listing datacenters on {server}: {source}")]
    Inventory {
        server: String,
        source: ClientError,
    },

    /// No datacenter with the requested name exists.
    #[error("unable to find datacenter {datacenter:?} on {server}")]
    DatacenterNotFound { server: String, datacenter: String },

    /// No datacenter was named and the server has none.
    #[error("no datacenter found on {server} to use as default")]
    NoDefaultDatacenter { server: String },

    /// No datacenter was named and the server has more than one.
    #[error("default datacenter on {server} resolves to {count} instances, please specify one")]
    AmbiguousDatacenter { server: String, count: usize },

    /// The session has been closed.
    #[error("vCenter client is not initialized")]
    NotInitialized,

    /// A UUID lookup failed for a reason other than a miss.
    #[error("error finding object by uuid {uuid:?}: {source}")]
    Lookup { uuid: String, source: ClientError },

    /// The lookup did not finish before the configured deadline.
    #[error("acquiring session for {key} timed out after {timeout:?}")]
    Timeout { key: String, timeout: Duration },

    /// The caller cancelled the lookup.
    #[error("acquiring session for {key} was cancelled")]
    Cancelled { key: String },
}

impl Error {
    /// Whether retrying the same lookup could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Connect { source, .. }
            | Error::Inventory { source, .. }
            | Error::Lookup { source, .. } => source.is_retryable(),
            Error::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Whether the server rejected the credentials.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }
}

/// Result type for session cache operations.
pub type Result<T> = std::result::Result<T, Error>;
