//! Conversion between BIOS UUIDs and node provider IDs.

use std::sync::LazyLock;

use regex::Regex;

/// Prefix of a vSphere provider ID.
pub const PROVIDER_ID_PREFIX: &str = "vsphere://";

const UUID: &str = r"[a-f\d]{8}-[a-f\d]{4}-[a-f\d]{4}-[a-f\d]{4}-[a-f\d]{12}";

static PROVIDER_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i)^{PROVIDER_ID_PREFIX}({UUID})$"))
        .expect("provider id pattern is valid")
});

static UUID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("(?i)^{UUID}$")).expect("uuid pattern is valid"));

/// Extract the UUID from a provider ID. Missing or malformed IDs give an
/// empty string.
pub fn provider_id_to_uuid(provider_id: Option<&str>) -> String {
    provider_id
        .and_then(|id| PROVIDER_ID_PATTERN.captures(id))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Build a provider ID from a BIOS UUID. Malformed UUIDs give an empty
/// string.
pub fn uuid_to_provider_id(uuid: &str) -> String {
    if UUID_PATTERN.is_match(uuid) {
        format!("{PROVIDER_ID_PREFIX}{uuid}")
    } else {
        String::new()
    }
}
