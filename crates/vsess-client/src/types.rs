//! Wire types for the VI/JSON API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MOREF_TYPE_NAME: &str = "ManagedObjectReference";

fn moref_type_name() -> String {
    MOREF_TYPE_NAME.to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Managed objects
// ─────────────────────────────────────────────────────────────────────────────

/// Reference to one managed object in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagedObjectReference {
    #[serde(rename = "_typeName", default = "moref_type_name")]
    type_name: String,
    /// Managed object type, e.g. `VirtualMachine` or `Datacenter`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Server-assigned identifier, e.g. `vm-42`.
    pub value: String,
}

impl ManagedObjectReference {
    /// Create a reference from its type and value.
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_name: moref_type_name(),
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Whether this reference points at an object of the given type.
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for ManagedObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// A datacenter found in the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datacenter {
    /// Reference used to scope searches.
    pub reference: ManagedObjectReference,
    /// Inventory name.
    pub name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Service content
// ─────────────────────────────────────────────────────────────────────────────

/// Entry points returned by `ServiceInstance.content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceContent {
    /// Root of the inventory tree.
    pub root_folder: ManagedObjectReference,
    /// Session manager used for login/logout.
    pub session_manager: ManagedObjectReference,
    /// Search index used for UUID lookups.
    pub search_index: ManagedObjectReference,
    /// Product information.
    #[serde(default)]
    pub about: AboutInfo,
}

/// Product information for the endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub instance_uuid: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// Server-side record of an authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    /// Session key, used for `SessionIsActive`.
    pub key: String,
    /// Fully qualified user name as the server sees it.
    pub user_name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub login_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequest<'a> {
    pub user_name: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionIsActiveRequest<'a> {
    #[serde(rename = "sessionID")]
    pub session_id: &'a str,
    pub user_name: &'a str,
}

// ─────────────────────────────────────────────────────────────────────────────
// Search
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FindByUuidRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<&'a ManagedObjectReference>,
    pub uuid: &'a str,
    pub vm_search: bool,
    pub instance_uuid: bool,
}
