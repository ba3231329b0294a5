//! Service instance API.

use chrono::{DateTime, Utc};

use crate::client::VimClient;
use crate::error::Result;
use crate::types::ServiceContent;

/// Service instance API client.
pub struct ServiceInstanceApi {
    client: VimClient,
}

impl ServiceInstanceApi {
    pub(crate) fn new(client: VimClient) -> Self {
        Self { client }
    }

    /// Get the service content, fetching it on first use.
    ///
    /// Does not require authentication.
    pub async fn content(&self) -> Result<ServiceContent> {
        let content = self
            .client
            .inner()
            .content
            .get_or_try_init(|| async {
                self.client
                    .get::<ServiceContent>("ServiceInstance/ServiceInstance/content")
                    .await
            })
            .await?;
        Ok(content.clone())
    }

    /// Get the server clock.
    ///
    /// This is the cheapest authenticated call and serves as the keepalive.
    pub async fn current_time(&self) -> Result<DateTime<Utc>> {
        self.client
            .post("ServiceInstance/ServiceInstance/CurrentTime", &serde_json::json!({}))
            .await
    }
}
