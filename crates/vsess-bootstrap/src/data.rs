//! Bootstrap payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BootstrapError;

/// Format of a bootstrap payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BootstrapFormat {
    #[default]
    CloudConfig,
    Ignition,
}

impl BootstrapFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CloudConfig => "cloud-config",
            Self::Ignition => "ignition",
        }
    }
}

impl fmt::Display for BootstrapFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BootstrapFormat {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloud-config" | "cloudconfig" => Ok(Self::CloudConfig),
            "ignition" => Ok(Self::Ignition),
            other => Err(BootstrapError::UnknownFormat(other.to_string())),
        }
    }
}

/// A bootstrap payload and its format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapData {
    value: Vec<u8>,
    format: BootstrapFormat,
}

impl BootstrapData {
    pub fn new(value: impl Into<Vec<u8>>, format: BootstrapFormat) -> Self {
        Self {
            value: value.into(),
            format,
        }
    }

    pub fn cloud_config(value: impl Into<Vec<u8>>) -> Self {
        Self::new(value, BootstrapFormat::CloudConfig)
    }

    pub fn ignition(value: impl Into<Vec<u8>>) -> Self {
        Self::new(value, BootstrapFormat::Ignition)
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn format(&self) -> BootstrapFormat {
        self.format
    }

    pub fn into_value(self) -> Vec<u8> {
        self.value
    }
}
