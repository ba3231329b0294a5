//! In-memory vCenter for tests.
//!
//! [`FakeBackend`] holds datacenters, virtual machines and users;
//! [`FakeConnector`] opens [`Transport`]s against it. Counters record every
//! connection, login and heartbeat so tests can assert how often the cache
//! talked to the server, and switches inject heartbeat, connection and
//! lookup failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use vsess_client::{Datacenter, Error as ClientError, ManagedObjectReference, ServerUrl, TlsTrust};

use crate::transport::{Connector, Transport, TransportResult};

#[derive(Debug, Clone)]
struct FakeVm {
    datacenter: String,
    reference: ManagedObjectReference,
    bios_uuid: String,
    instance_uuid: String,
}

#[derive(Debug, Default)]
struct State {
    datacenters: Vec<Datacenter>,
    vms: Vec<FakeVm>,
    users: HashMap<String, String>,
    login_delays: HashMap<String, Duration>,
    inventory_delay: Option<Duration>,
    epoch: u64,
    connections: usize,
    logins: usize,
    logouts: usize,
    heartbeats: usize,
    activity_checks: usize,
    lookups: usize,
    fail_heartbeats: bool,
    fail_connections: bool,
    fail_lookups: bool,
}

/// A fake vCenter server.
#[derive(Debug, Default)]
pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    /// An empty server that accepts any credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a datacenter. References are assigned in insertion order.
    pub fn with_datacenter(self, name: impl Into<String>) -> Self {
        {
            let mut state = self.state.lock();
            let value = format!("datacenter-{}", state.datacenters.len() + 1);
            state.datacenters.push(Datacenter {
                reference: ManagedObjectReference::new("Datacenter", value),
                name: name.into(),
            });
        }
        self
    }

    /// Register a virtual machine in the named datacenter.
    pub fn with_vm(
        self,
        datacenter: &str,
        vm_id: impl Into<String>,
        bios_uuid: impl Into<String>,
        instance_uuid: impl Into<String>,
    ) -> Self {
        {
            let mut state = self.state.lock();
            let dc = state
                .datacenters
                .iter()
                .find(|d| d.name == datacenter)
                .map(|d| d.reference.value.clone())
                .unwrap_or_else(|| datacenter.to_string());
            state.vms.push(FakeVm {
                datacenter: dc,
                reference: ManagedObjectReference::new("VirtualMachine", vm_id),
                bios_uuid: bios_uuid.into(),
                instance_uuid: instance_uuid.into(),
            });
        }
        self
    }

    /// Require this password for `username`. Once any user is registered,
    /// unknown users are rejected.
    pub fn with_user(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.state
            .lock()
            .users
            .insert(username.into(), password.into());
        self
    }

    /// Make logins for `username` take `delay`.
    pub fn with_login_delay(self, username: impl Into<String>, delay: Duration) -> Self {
        self.state.lock().login_delays.insert(username.into(), delay);
        self
    }

    /// Make every datacenter listing take `delay`.
    pub fn with_inventory_delay(self, delay: Duration) -> Self {
        self.state.lock().inventory_delay = Some(delay);
        self
    }

    /// Make every heartbeat fail while `fail` is set.
    pub fn fail_heartbeats(&self, fail: bool) {
        self.state.lock().fail_heartbeats = fail;
    }

    /// Make every new connection fail while `fail` is set.
    pub fn fail_connections(&self, fail: bool) {
        self.state.lock().fail_connections = fail;
    }

    /// Make UUID lookups return a server fault while `fail` is set.
    pub fn fail_lookups(&self, fail: bool) {
        self.state.lock().fail_lookups = fail;
    }

    /// Invalidate every session logged in so far, as a server-side idle
    /// timeout would.
    pub fn expire_sessions(&self) {
        self.state.lock().epoch += 1;
    }

    /// Reference of the named datacenter.
    pub fn datacenter_ref(&self, name: &str) -> Option<ManagedObjectReference> {
        self.state
            .lock()
            .datacenters
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.reference.clone())
    }

    pub fn connections(&self) -> usize {
        self.state.lock().connections
    }

    /// Successful logins.
    pub fn logins(&self) -> usize {
        self.state.lock().logins
    }

    pub fn logouts(&self) -> usize {
        self.state.lock().logouts
    }

    /// Heartbeat calls, successful or not.
    pub fn heartbeats(&self) -> usize {
        self.state.lock().heartbeats
    }

    /// Liveness queries.
    pub fn activity_checks(&self) -> usize {
        self.state.lock().activity_checks
    }

    pub fn lookups(&self) -> usize {
        self.state.lock().lookups
    }
}

fn not_authenticated() -> ClientError {
    ClientError::Auth("The session is not authenticated.".to_string())
}

/// Opens [`FakeTransport`]s against a shared [`FakeBackend`].
#[derive(Debug, Clone)]
pub struct FakeConnector {
    backend: Arc<FakeBackend>,
}

impl FakeConnector {
    pub fn new(backend: Arc<FakeBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<FakeBackend> {
        &self.backend
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        server: &ServerUrl,
        _tls: &TlsTrust,
        _timeout: Option<Duration>,
    ) -> TransportResult<Arc<dyn Transport>> {
        let mut state = self.backend.state.lock();
        state.connections += 1;
        if state.fail_connections {
            return Err(ClientError::Api {
                status: 503,
                fault: "HostCommunication".to_string(),
                message: format!("unable to reach {}", server.host()),
            });
        }
        Ok(Arc::new(FakeTransport {
            backend: Arc::clone(&self.backend),
            session: Mutex::new(None),
        }))
    }
}

#[derive(Debug, Clone)]
struct FakeSession {
    epoch: u64,
}

/// One connection to a [`FakeBackend`].
#[derive(Debug)]
pub struct FakeTransport {
    backend: Arc<FakeBackend>,
    session: Mutex<Option<FakeSession>>,
}

impl FakeTransport {
    fn authenticated(&self) -> bool {
        let current = self.backend.state.lock().epoch;
        self.session
            .lock()
            .as_ref()
            .is_some_and(|s| s.epoch == current)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn login(&self, username: &str, password: &str) -> TransportResult<()> {
        let delay = self.backend.state.lock().login_delays.get(username).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let epoch = {
            let mut state = self.backend.state.lock();
            let accepted = state.users.is_empty()
                || state.users.get(username).is_some_and(|p| p == password);
            if !accepted {
                return Err(ClientError::Auth(
                    "Cannot complete login due to an incorrect user name or password."
                        .to_string(),
                ));
            }
            state.logins += 1;
            state.epoch
        };
        *self.session.lock() = Some(FakeSession { epoch });
        Ok(())
    }

    async fn logout(&self) -> TransportResult<()> {
        if self.session.lock().take().is_some() {
            self.backend.state.lock().logouts += 1;
        }
        Ok(())
    }

    async fn session_is_active(&self) -> TransportResult<bool> {
        self.backend.state.lock().activity_checks += 1;
        Ok(self.authenticated())
    }

    async fn current_time(&self) -> TransportResult<DateTime<Utc>> {
        let failing = {
            let mut state = self.backend.state.lock();
            state.heartbeats += 1;
            state.fail_heartbeats
        };
        if failing || !self.authenticated() {
            return Err(not_authenticated());
        }
        Ok(Utc::now())
    }

    async fn datacenters(&self) -> TransportResult<Vec<Datacenter>> {
        let delay = self.backend.state.lock().inventory_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if !self.authenticated() {
            return Err(not_authenticated());
        }
        Ok(self.backend.state.lock().datacenters.clone())
    }

    async fn find_by_uuid(
        &self,
        datacenter: &ManagedObjectReference,
        uuid: &str,
        instance_uuid: bool,
    ) -> TransportResult<Option<ManagedObjectReference>> {
        if !self.authenticated() {
            return Err(not_authenticated());
        }
        let mut state = self.backend.state.lock();
        state.lookups += 1;
        if state.fail_lookups {
            return Err(ClientError::Api {
                status: 500,
                fault: "SystemError".to_string(),
                message: "search index unavailable".to_string(),
            });
        }
        let found = state.vms.iter().find(|vm| {
            let candidate = if instance_uuid {
                &vm.instance_uuid
            } else {
                &vm.bios_uuid
            };
            vm.datacenter == datacenter.value && candidate.eq_ignore_ascii_case(uuid)
        });
        Ok(found.map(|vm| vm.reference.clone()))
    }
}
