//! Control-plane failure domains declared through a cluster annotation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Annotation holding a JSON array of [`ControlPlaneFailureDomain`]s.
pub const FAILURE_DOMAIN_ANNOTATION: &str = "vsphere.infra.cluster.x-k8s.io/failure-domain";

pub const ATTR_DATACENTER: &str = "Datacenter";
pub const ATTR_FOLDER: &str = "Folder";
pub const ATTR_DATASTORE: &str = "Datastore";
pub const ATTR_RESOURCE_POOL: &str = "ResourcePool";

/// Placement for control-plane machines in one compute cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlPlaneFailureDomain {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub datacenter: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub folder: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub datastore: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource_pool: String,
}

/// A named failure domain as recorded in cluster status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDomainSpec {
    #[serde(default)]
    pub control_plane: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, String>>,
}

/// Failure domains keyed by compute cluster name.
pub type FailureDomains = BTreeMap<String, FailureDomainSpec>;

/// Where a machine is placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Placement {
    pub datacenter: String,
    pub folder: String,
    pub datastore: String,
    pub resource_pool: String,
}

impl ControlPlaneFailureDomain {
    /// Compute cluster the resource pool belongs to: the first path segment,
    /// so `vSAN Cluster/Resources` gives `vSAN Cluster`.
    pub fn compute_cluster(&self) -> &str {
        self.resource_pool
            .split('/')
            .next()
            .unwrap_or_default()
    }

    /// Name and spec of this domain.
    pub fn to_spec(&self) -> (String, FailureDomainSpec) {
        let attributes = BTreeMap::from([
            (ATTR_DATACENTER.to_string(), self.datacenter.clone()),
            (ATTR_FOLDER.to_string(), self.folder.clone()),
            (ATTR_DATASTORE.to_string(), self.datastore.clone()),
            (ATTR_RESOURCE_POOL.to_string(), self.resource_pool.clone()),
        ]);
        (
            self.compute_cluster().to_string(),
            FailureDomainSpec {
                control_plane: true,
                attributes: Some(attributes),
            },
        )
    }

    /// Overwrite all fields from a spec's attributes. A spec without an
    /// attribute map leaves the domain unchanged.
    pub fn set_from_spec(&mut self, spec: &FailureDomainSpec) {
        let Some(attributes) = &spec.attributes else {
            return;
        };
        let get = |key: &str| attributes.get(key).cloned().unwrap_or_default();
        self.datacenter = get(ATTR_DATACENTER);
        self.folder = get(ATTR_FOLDER);
        self.datastore = get(ATTR_DATASTORE);
        self.resource_pool = get(ATTR_RESOURCE_POOL);
    }
}

/// Record every failure domain declared in `annotations`.
///
/// Returns how many were recorded. A malformed annotation is logged and
/// leaves `domains` untouched.
pub fn reconcile_failure_domains(
    annotations: &BTreeMap<String, String>,
    domains: &mut FailureDomains,
) -> usize {
    let Some(raw) = annotations.get(FAILURE_DOMAIN_ANNOTATION) else {
        return 0;
    };
    let declared: Vec<ControlPlaneFailureDomain> = match serde_json::from_str(raw) {
        Ok(declared) => declared,
        Err(e) => {
            error!(error = %e, annotation = %raw, "failed to parse failure domain annotation");
            return 0;
        }
    };
    for domain in &declared {
        let (name, spec) = domain.to_spec();
        debug!(failure_domain = %name, "recorded failure domain");
        domains.insert(name, spec);
    }
    declared.len()
}

/// Apply the named failure domain to a placement. Only non-empty fields
/// override. Returns whether the domain exists.
pub fn apply_failure_domain(domains: &FailureDomains, name: &str, placement: &mut Placement) -> bool {
    let Some(spec) = domains.get(name) else {
        return false;
    };
    let mut domain = ControlPlaneFailureDomain::default();
    domain.set_from_spec(spec);

    let overrides = [
        (&mut placement.datacenter, domain.datacenter),
        (&mut placement.datastore, domain.datastore),
        (&mut placement.folder, domain.folder),
        (&mut placement.resource_pool, domain.resource_pool),
    ];
    for (field, value) in overrides {
        if !value.is_empty() {
            *field = value;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations(value: &str) -> BTreeMap<String, String> {
        BTreeMap::from([(FAILURE_DOMAIN_ANNOTATION.to_string(), value.to_string())])
    }

    #[test]
    fn test_compute_cluster() {
        let domain = ControlPlaneFailureDomain {
            resource_pool: "vSAN Cluster/Resources".to_string(),
            ..Default::default()
        };
        assert_eq!(domain.compute_cluster(), "vSAN Cluster");
        assert_eq!(ControlPlaneFailureDomain::default().compute_cluster(), "");
    }

    #[test]
    fn test_spec_round_trip() {
        let domain = ControlPlaneFailureDomain {
            datacenter: "DC0".to_string(),
            folder: "vms".to_string(),
            datastore: "ds1".to_string(),
            resource_pool: "cluster-a/Resources".to_string(),
        };
        let (name, spec) = domain.to_spec();
        assert_eq!(name, "cluster-a");
        assert!(spec.control_plane);

        let mut back = ControlPlaneFailureDomain::default();
        back.set_from_spec(&spec);
        assert_eq!(back, domain);
    }

    #[test]
    fn test_spec_without_attributes_is_ignored() {
        let mut domain = ControlPlaneFailureDomain {
            datacenter: "DC0".to_string(),
            ..Default::default()
        };
        domain.set_from_spec(&FailureDomainSpec::default());
        assert_eq!(domain.datacenter, "DC0");
    }

    #[test]
    fn test_reconcile() {
        let raw = r#"[
            {"datacenter": "DC0", "resourcePool": "cluster-a/Resources", "datastore": "ds-a"},
            {"datacenter": "DC0", "resourcePool": "cluster-b/Resources"}
        ]"#;
        let mut domains = FailureDomains::new();
        assert_eq!(reconcile_failure_domains(&annotations(raw), &mut domains), 2);

        let names: Vec<&str> = domains.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["cluster-a", "cluster-b"]);
        let attrs = domains["cluster-a"].attributes.as_ref().unwrap();
        assert_eq!(attrs[ATTR_DATASTORE], "ds-a");
    }

    #[test]
    fn test_reconcile_malformed_is_ignored() {
        let mut domains = FailureDomains::new();
        domains.insert("existing".to_string(), FailureDomainSpec::default());

        assert_eq!(reconcile_failure_domains(&annotations("{not json"), &mut domains), 0);
        assert_eq!(reconcile_failure_domains(&BTreeMap::new(), &mut domains), 0);
        assert_eq!(domains.len(), 1);
    }

    #[test]
    fn test_apply_overrides_only_set_fields() {
        let domain = ControlPlaneFailureDomain {
            datastore: "ds-fast".to_string(),
            resource_pool: "cluster-a/Resources".to_string(),
            ..Default::default()
        };
        let (name, spec) = domain.to_spec();
        let domains = FailureDomains::from([(name, spec)]);

        let mut placement = Placement {
            datacenter: "DC0".to_string(),
            folder: "vms".to_string(),
            datastore: "ds-slow".to_string(),
            resource_pool: "default/Resources".to_string(),
        };
        assert!(apply_failure_domain(&domains, "cluster-a", &mut placement));
        assert_eq!(placement.datacenter, "DC0");
        assert_eq!(placement.folder, "vms");
        assert_eq!(placement.datastore, "ds-fast");
        assert_eq!(placement.resource_pool, "cluster-a/Resources");

        assert!(!apply_failure_domain(&domains, "missing", &mut placement));
    }

    #[test]
    fn test_serialization_omits_empty_fields() {
        let domain = ControlPlaneFailureDomain {
            resource_pool: "c/Resources".to_string(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&domain).unwrap(),
            r#"{"resourcePool":"c/Resources"}"#
        );
    }
}
