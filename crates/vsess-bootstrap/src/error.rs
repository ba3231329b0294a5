//! Bootstrap error types.

use crate::data::BootstrapFormat;

/// Errors produced while preparing bootstrap payloads.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The payload is not a JSON Ignition document.
    #[error("unable to unmarshal bootstrap data into ignition type: {0}")]
    Ignition(#[source] serde_json::Error),

    /// The modified document could not be serialized.
    #[error("unable to marshal ignition config: {0}")]
    Marshal(#[source] serde_json::Error),

    /// An Ignition-only operation was given another format.
    #[error("bootstrap data is {0}, not ignition")]
    NotIgnition(BootstrapFormat),

    /// Unknown bootstrap format name.
    #[error("unknown bootstrap format {0:?}, expected \"cloud-config\" or \"ignition\"")]
    UnknownFormat(String),
}

impl BootstrapError {
    /// Bootstrap errors are all caused by the input; none are retryable.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Result type for bootstrap operations.
pub type Result<T> = std::result::Result<T, BootstrapError>;
