//! Hostname and network injection for Ignition 2.3 payloads.
//!
//! Only the parts of the document that are touched are modelled; everything
//! else is carried through untouched in flattened maps.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::data::{BootstrapData, BootstrapFormat};
use crate::error::{BootstrapError, Result};

const HOSTNAME_PATH: &str = "/etc/hostname";
const ROOT_FILESYSTEM: &str = "root";
const HOSTNAME_MODE: i64 = 0o644;
const NETWORK_UNIT: &str = "00-ens192.network";

/// An Ignition config document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IgnitionConfig {
    #[serde(default)]
    pub ignition: IgnitionSection,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub networkd: Networkd,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IgnitionSection {
    #[serde(default)]
    pub version: String,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct File {
    #[serde(default)]
    pub filesystem: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub append: bool,
    #[serde(default)]
    pub contents: FileContents,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<i64>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileContents {
    #[serde(default)]
    pub source: String,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Networkd {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<NetworkdUnit>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkdUnit {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contents: String,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Network settings for one virtual NIC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkDevice {
    pub network_name: String,
    pub mac_addr: String,
    pub dhcp4: bool,
    pub dhcp6: bool,
    pub ip_addrs: Vec<String>,
    pub gateway4: String,
    pub gateway6: String,
    pub nameservers: Vec<String>,
    pub search_domains: Vec<String>,
}

/// Parse a bootstrap payload as an Ignition document.
pub fn parse_ignition(data: &[u8]) -> Result<IgnitionConfig> {
    serde_json::from_slice(data).map_err(BootstrapError::Ignition)
}

/// Add `/etc/hostname` on the root filesystem unless the document already
/// writes that path.
pub fn set_hostname(config: &mut IgnitionConfig, hostname: &str) {
    if config.storage.files.iter().any(|f| f.path == HOSTNAME_PATH) {
        return;
    }
    config.storage.files.push(File {
        filesystem: ROOT_FILESYSTEM.to_string(),
        path: HOSTNAME_PATH.to_string(),
        contents: FileContents {
            source: format!("data:,{hostname}"),
            ..Default::default()
        },
        mode: Some(HOSTNAME_MODE),
        ..Default::default()
    });
}

/// Add a static networkd unit built from the first device with addresses,
/// unless the document already has networkd units.
pub fn set_network(config: &mut IgnitionConfig, devices: &[NetworkDevice]) {
    if !config.networkd.units.is_empty() {
        return;
    }
    let (address, gateway, dns, domains) = devices
        .iter()
        .find_map(|d| {
            d.ip_addrs.first().map(|ip| {
                (
                    ip.as_str(),
                    d.gateway4.as_str(),
                    d.nameservers.join(" "),
                    d.search_domains.join(" "),
                )
            })
        })
        .unwrap_or_default();

    config.networkd.units.push(NetworkdUnit {
        name: NETWORK_UNIT.to_string(),
        contents: format!(
            "[Match]\nName=ens192\n\n[Network]\nAddress={address}\nGateway={gateway}\nDNS={dns}\nDomains={domains}"
        ),
        ..Default::default()
    });
}

/// Whether the guest has to wait for an address of each family, either
/// through DHCP or a static address that parses as a bare IP.
fn address_waits(devices: &[NetworkDevice]) -> (bool, bool) {
    let (mut v4, mut v6) = (false, false);
    for device in devices {
        if v4 && v6 {
            break;
        }
        for ip in device.ip_addrs.iter().filter_map(|s| s.parse::<IpAddr>().ok()) {
            match ip {
                IpAddr::V4(_) => v4 = true,
                IpAddr::V6(_) => v6 = true,
            }
        }
        v4 |= device.dhcp4;
        v6 |= device.dhcp6;
    }
    (v4, v6)
}

/// Inject hostname and, when the guest has no address to wait for, a
/// static network unit into an Ignition payload.
///
/// Returns the modified document as JSON.
pub fn machine_metadata_ignition(
    data: &BootstrapData,
    hostname: &str,
    devices: &[NetworkDevice],
) -> Result<Vec<u8>> {
    if data.format() != BootstrapFormat::Ignition {
        return Err(BootstrapError::NotIgnition(data.format()));
    }
    let mut config = parse_ignition(data.value())?;

    set_hostname(&mut config, hostname);

    let (wait_v4, wait_v6) = address_waits(devices);
    if !wait_v4 && !wait_v6 {
        set_network(&mut config, devices);
    }
    debug!(hostname, wait_v4, wait_v6, "prepared ignition metadata");

    serde_json::to_vec(&config).map_err(BootstrapError::Marshal)
}
