//! Guest bootstrap and placement helpers for vSphere machines.
//!
//! - [`ExtraConfig`]: guestinfo keys carrying user data and metadata
//! - [`machine_metadata_ignition`]: hostname and network injection for
//!   Ignition payloads
//! - Failure domains declared through a cluster annotation
//! - Provider ID conversion

mod data;
mod error;
mod extra_config;
mod failure_domain;
mod ignition;
mod provider_id;

pub use data::{BootstrapData, BootstrapFormat};
pub use error::{BootstrapError, Result};
pub use extra_config::{
    ExtraConfig, IGNITION_ENCODING_KEY, IGNITION_KEY, METADATA_ENCODING_KEY, METADATA_KEY,
    OptionValue, USERDATA_ENCODING_KEY, USERDATA_KEY, encode,
};
pub use failure_domain::{
    ATTR_DATACENTER, ATTR_DATASTORE, ATTR_FOLDER, ATTR_RESOURCE_POOL, ControlPlaneFailureDomain,
    FAILURE_DOMAIN_ANNOTATION, FailureDomainSpec, FailureDomains, Placement,
    apply_failure_domain, reconcile_failure_domains,
};
pub use ignition::{
    File, FileContents, IgnitionConfig, IgnitionSection, NetworkDevice, Networkd, NetworkdUnit,
    Storage, machine_metadata_ignition, parse_ignition, set_hostname, set_network,
};
pub use provider_id::{PROVIDER_ID_PREFIX, provider_id_to_uuid, uuid_to_provider_id};
