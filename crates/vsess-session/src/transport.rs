//! Transport and connector seams.
//!
//! [`Transport`] is the set of server calls a session needs; [`Connector`]
//! opens one. The production pair is [`VimConnector`] over
//! [`vsess_client::VimClient`]; tests substitute the in-memory backend in
//! [`crate::testing`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use vsess_client::{
    Datacenter, DEFAULT_RELEASE, Error as ClientError, ManagedObjectReference, ServerUrl,
    TlsTrust, VimClient,
};

/// Result of a transport call.
pub type TransportResult<T> = std::result::Result<T, ClientError>;

/// An authenticated or authenticatable connection to one server.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Log in. Later calls run under the resulting session.
    async fn login(&self, username: &str, password: &str) -> TransportResult<()>;

    /// End the session.
    async fn logout(&self) -> TransportResult<()>;

    /// Ask the server whether the session is still valid.
    async fn session_is_active(&self) -> TransportResult<bool>;

    /// Cheapest authenticated round trip, used as the keepalive heartbeat.
    async fn current_time(&self) -> TransportResult<DateTime<Utc>>;

    /// All datacenters visible to the session.
    async fn datacenters(&self) -> TransportResult<Vec<Datacenter>>;

    /// Find a virtual machine by BIOS or instance UUID within a datacenter.
    async fn find_by_uuid(
        &self,
        datacenter: &ManagedObjectReference,
        uuid: &str,
        instance_uuid: bool,
    ) -> TransportResult<Option<ManagedObjectReference>>;
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `server`, not yet logged in.
    async fn connect(
        &self,
        server: &ServerUrl,
        tls: &TlsTrust,
        timeout: Option<Duration>,
    ) -> TransportResult<Arc<dyn Transport>>;
}

#[async_trait]
impl Transport for VimClient {
    async fn login(&self, username: &str, password: &str) -> TransportResult<()> {
        self.session_manager().login(username, password).await?;
        Ok(())
    }

    async fn logout(&self) -> TransportResult<()> {
        self.session_manager().logout().await
    }

    async fn session_is_active(&self) -> TransportResult<bool> {
        self.session_manager().session_is_active().await
    }

    async fn current_time(&self) -> TransportResult<DateTime<Utc>> {
        self.service_instance().current_time().await
    }

    async fn datacenters(&self) -> TransportResult<Vec<Datacenter>> {
        self.inventory().datacenters().await
    }

    async fn find_by_uuid(
        &self,
        datacenter: &ManagedObjectReference,
        uuid: &str,
        instance_uuid: bool,
    ) -> TransportResult<Option<ManagedObjectReference>> {
        self.search_index()
            .find_by_uuid(Some(datacenter), uuid, instance_uuid)
            .await
    }
}

/// Connector for real vCenter servers.
#[derive(Debug, Clone)]
pub struct VimConnector {
    release: String,
    user_agent: Option<String>,
}

impl Default for VimConnector {
    fn default() -> Self {
        Self {
            release: DEFAULT_RELEASE.to_string(),
            user_agent: None,
        }
    }
}

impl VimConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API release used in request paths.
    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = release.into();
        self
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }
}

#[async_trait]
impl Connector for VimConnector {
    async fn connect(
        &self,
        server: &ServerUrl,
        tls: &TlsTrust,
        timeout: Option<Duration>,
    ) -> TransportResult<Arc<dyn Transport>> {
        let mut builder = VimClient::builder()
            .server(server.clone())
            .tls(tls.clone())
            .release(self.release.clone());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder.build()?;

        // Fetching the service content proves the endpoint speaks the API.
        let content = client.service_instance().content().await?;
        debug!(
            server = %server,
            product = %content.about.full_name,
            api_version = %content.about.api_version,
            "connected to vCenter"
        );
        Ok(Arc::new(client))
    }
}
