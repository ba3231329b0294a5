//! An authenticated session bound to one datacenter.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, warn};
use vsess_client::{Datacenter, ManagedObjectReference, ServerUrl};

use crate::config::Features;
use crate::error::Result;
use crate::keepalive::{KeepAlive, Liveness};
use crate::key::CacheKey;
use crate::resolver;
use crate::transport::Transport;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique session id.
pub(crate) fn next_session_id() -> u64 {
    NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
}

/// A logged-in connection plus the datacenter it is scoped to.
///
/// Sessions are shared through `Arc`; the cache hands the same instance to
/// every caller with the same [`CacheKey`].
pub struct Session {
    id: u64,
    key: CacheKey,
    server: ServerUrl,
    client: RwLock<Option<Arc<dyn Transport>>>,
    keepalive: Option<Arc<KeepAlive>>,
    datacenter: Datacenter,
    features: Features,
    liveness: Arc<Liveness>,
    created_at: DateTime<Utc>,
}

/// Everything a freshly connected session is made of.
pub(crate) struct SessionParts {
    pub id: u64,
    pub key: CacheKey,
    pub server: ServerUrl,
    pub client: Arc<dyn Transport>,
    pub keepalive: Option<Arc<KeepAlive>>,
    pub datacenter: Datacenter,
    pub features: Features,
    pub liveness: Arc<Liveness>,
}

impl Session {
    pub(crate) fn new(parts: SessionParts) -> Self {
        Self {
            id: parts.id,
            key: parts.key,
            server: parts.server,
            client: RwLock::new(Some(parts.client)),
            keepalive: parts.keepalive,
            datacenter: parts.datacenter,
            features: parts.features,
            liveness: parts.liveness,
            created_at: Utc::now(),
        }
    }

    /// Process-unique id; a re-created session under the same key gets a
    /// new one.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn server(&self) -> &ServerUrl {
        &self.server
    }

    /// The datacenter this session is bound to.
    pub fn datacenter(&self) -> &Datacenter {
        &self.datacenter
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether a keepalive monitor was attached at creation.
    pub fn is_keepalive(&self) -> bool {
        self.keepalive.is_some()
    }

    /// Whether the session is known to be unusable: closed, or its
    /// keepalive heartbeat failed.
    pub fn is_stale(&self) -> bool {
        self.liveness.is_stale() || self.client.read().is_none()
    }

    /// The underlying transport, or `None` once closed.
    pub fn client(&self) -> Option<Arc<dyn Transport>> {
        self.client.read().clone()
    }

    /// Ask the server whether the session is still valid.
    ///
    /// Errors count as inactive.
    pub async fn is_active(&self) -> bool {
        if self.liveness.is_stale() {
            return false;
        }
        let Some(client) = self.client() else {
            return false;
        };
        match client.session_is_active().await {
            Ok(active) => active,
            Err(e) => {
                debug!(key = %self.key, session_id = self.id, error = %e, "session liveness check failed");
                false
            }
        }
    }

    /// Find a virtual machine by BIOS UUID in this session's datacenter.
    pub async fn find_by_bios_uuid(&self, uuid: &str) -> Result<Option<ManagedObjectReference>> {
        resolver::resolve_by_uuid(self, uuid, false).await
    }

    /// Find a virtual machine by vCenter instance UUID in this session's
    /// datacenter.
    pub async fn find_by_instance_uuid(
        &self,
        uuid: &str,
    ) -> Result<Option<ManagedObjectReference>> {
        resolver::resolve_by_uuid(self, uuid, true).await
    }

    pub(crate) fn stop_keepalive(&self) {
        if let Some(keepalive) = &self.keepalive {
            keepalive.stop();
        }
    }

    /// Stop the keepalive, log out and drop the connection.
    ///
    /// Later lookups through this session fail with
    /// [`Error::NotInitialized`](crate::Error::NotInitialized). Logout
    /// failures are logged, not returned.
    pub async fn close(&self) {
        self.stop_keepalive();
        let Some(client) = self.client.write().take() else {
            return;
        };
        match client.logout().await {
            Ok(()) => debug!(key = %self.key, session_id = self.id, "session closed"),
            Err(e) => warn!(key = %self.key, session_id = self.id, error = %e, "logout failed while closing session"),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("datacenter", &self.datacenter.name)
            .field("keepalive", &self.is_keepalive())
            .field("stale", &self.is_stale())
            .field("created_at", &self.created_at)
            .finish()
    }
}
