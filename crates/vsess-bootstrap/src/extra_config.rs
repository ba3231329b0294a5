//! VMX extra config entries read by the guest through guestinfo.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::data::{BootstrapData, BootstrapFormat};

pub const USERDATA_KEY: &str = "guestinfo.userdata";
pub const USERDATA_ENCODING_KEY: &str = "guestinfo.userdata.encoding";
pub const IGNITION_KEY: &str = "guestinfo.ignition.config.data";
pub const IGNITION_ENCODING_KEY: &str = "guestinfo.ignition.config.data.encoding";
pub const METADATA_KEY: &str = "guestinfo.metadata";
pub const METADATA_ENCODING_KEY: &str = "guestinfo.metadata.encoding";

const BASE64: &str = "base64";

/// One key/value pair of VMX extra config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionValue {
    pub key: String,
    pub value: String,
}

impl OptionValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

fn data_key(format: BootstrapFormat) -> &'static str {
    match format {
        BootstrapFormat::CloudConfig => USERDATA_KEY,
        BootstrapFormat::Ignition => IGNITION_KEY,
    }
}

fn encoding_key(format: BootstrapFormat) -> &'static str {
    match format {
        BootstrapFormat::CloudConfig => USERDATA_ENCODING_KEY,
        BootstrapFormat::Ignition => IGNITION_ENCODING_KEY,
    }
}

/// Ordered extra config entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraConfig {
    entries: Vec<OptionValue>,
}

impl ExtraConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append arbitrary key/value pairs.
    pub fn set_custom_keys<K, V>(&mut self, keys: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.entries
            .extend(keys.into_iter().map(|(k, v)| OptionValue::new(k, v)));
    }

    /// Append the bootstrap payload under the key its format is read from,
    /// base64 encoded.
    pub fn set_user_data(&mut self, data: &BootstrapData) {
        self.entries.push(OptionValue::new(
            data_key(data.format()),
            encode(data.value()),
        ));
        self.entries
            .push(OptionValue::new(encoding_key(data.format()), BASE64));
    }

    /// Append instance metadata, base64 encoded.
    pub fn set_metadata(&mut self, metadata: &[u8]) {
        self.entries
            .push(OptionValue::new(METADATA_KEY, encode(metadata)));
        self.entries
            .push(OptionValue::new(METADATA_ENCODING_KEY, BASE64));
    }

    /// Value of the last entry with `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionValue> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<OptionValue> {
        self.entries
    }
}

/// Base64-encode `data` exactly once.
///
/// Input that is already base64 (any number of times over) is decoded back
/// to the innermost payload first, so encoding an encoded value yields the
/// same string as encoding the plain value. Empty input encodes to an empty
/// string.
pub fn encode(data: &[u8]) -> String {
    if data.is_empty() {
        return String::new();
    }
    let mut plain = data.to_vec();
    while let Ok(decoded) = STANDARD.decode(&plain) {
        if decoded.is_empty() {
            break;
        }
        plain = decoded;
    }
    STANDARD.encode(plain)
}
