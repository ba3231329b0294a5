//! Inventory API: datacenter enumeration.

use std::collections::VecDeque;

use tracing::trace;

use crate::client::VimClient;
use crate::error::Result;
use crate::types::{Datacenter, ManagedObjectReference};

/// Inventory API client.
pub struct InventoryApi {
    client: VimClient,
}

impl InventoryApi {
    pub(crate) fn new(client: VimClient) -> Self {
        Self { client }
    }

    /// Children of a folder.
    pub async fn child_entities(
        &self,
        folder: &ManagedObjectReference,
    ) -> Result<Vec<ManagedObjectReference>> {
        self.client
            .get(&format!("Folder/{}/childEntity", folder.value))
            .await
    }

    /// Inventory name of a datacenter.
    pub async fn datacenter_name(&self, datacenter: &ManagedObjectReference) -> Result<String> {
        self.client
            .get(&format!("Datacenter/{}/name", datacenter.value))
            .await
    }

    /// All datacenters reachable from the root folder, including those
    /// nested in sub-folders, in breadth-first order.
    pub async fn datacenters(&self) -> Result<Vec<Datacenter>> {
        let content = self.client.service_instance().content().await?;
        let mut pending = VecDeque::from([content.root_folder]);
        let mut found = Vec::new();

        while let Some(folder) = pending.pop_front() {
            for child in self.child_entities(&folder).await? {
                if child.is("Folder") {
                    pending.push_back(child);
                } else if child.is("Datacenter") {
                    let name = self.datacenter_name(&child).await?;
                    trace!(datacenter = %name, reference = %child, "found datacenter");
                    found.push(Datacenter {
                        reference: child,
                        name,
                    });
                }
            }
        }

        Ok(found)
    }
}
