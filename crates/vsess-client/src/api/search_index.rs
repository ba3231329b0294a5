//! Search index API.

use crate::client::VimClient;
use crate::error::Result;
use crate::types::{FindByUuidRequest, ManagedObjectReference};

/// Search index API client.
pub struct SearchIndexApi {
    client: VimClient,
}

impl SearchIndexApi {
    pub(crate) fn new(client: VimClient) -> Self {
        Self { client }
    }

    /// Find a virtual machine by UUID.
    ///
    /// `instance_uuid` selects the instance UUID namespace instead of the
    /// BIOS UUID. A miss is `Ok(None)`.
    pub async fn find_by_uuid(
        &self,
        datacenter: Option<&ManagedObjectReference>,
        uuid: &str,
        instance_uuid: bool,
    ) -> Result<Option<ManagedObjectReference>> {
        let content = self.client.service_instance().content().await?;
        let path = format!("SearchIndex/{}/FindByUuid", content.search_index.value);
        let request = FindByUuidRequest {
            datacenter,
            uuid,
            vm_search: true,
            instance_uuid,
        };
        self.client.post_optional(&path, &request).await
    }
}
