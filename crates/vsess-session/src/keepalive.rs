//! Background heartbeat that keeps a session alive.
//!
//! [`KeepAlive`] wraps a [`Transport`]. Logging in through it starts a
//! monitor task that issues a cheap authenticated call every interval;
//! logging out stops it. On the first failed heartbeat the monitor marks the
//! session stale, hands the key to an [`InvalidationHook`] and exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};
use vsess_client::{Datacenter, Error as ClientError, ManagedObjectReference};

use crate::config::MIN_KEEPALIVE_INTERVAL;
use crate::key::CacheKey;
use crate::transport::{Transport, TransportResult};

/// Receives notice that a session died.
#[async_trait]
pub trait InvalidationHook: Send + Sync {
    /// Forget the session `session_id` cached under `key`.
    async fn invalidate(&self, key: &CacheKey, session_id: u64, reason: &ClientError);
}

/// Hook that only logs. Used when a session lives outside any cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInvalidation;

#[async_trait]
impl InvalidationHook for NoInvalidation {
    async fn invalidate(&self, key: &CacheKey, session_id: u64, reason: &ClientError) {
        debug!(key = %key, session_id, error = %reason, "session died outside any cache");
    }
}

/// Shared flag recording that the connection is known to be broken.
#[derive(Debug, Default)]
pub struct Liveness {
    stale: AtomicBool,
}

impl Liveness {
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }
}

struct Monitor {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Transport wrapper that runs the keepalive monitor while logged in.
pub struct KeepAlive {
    inner: Arc<dyn Transport>,
    key: CacheKey,
    session_id: u64,
    interval: Duration,
    hook: Arc<dyn InvalidationHook>,
    liveness: Arc<Liveness>,
    monitor: Mutex<Option<Monitor>>,
}

impl std::fmt::Debug for KeepAlive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeepAlive")
            .field("key", &self.key)
            .field("session_id", &self.session_id)
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

impl KeepAlive {
    /// Wrap `inner`. Intervals below [`MIN_KEEPALIVE_INTERVAL`] are raised
    /// to it.
    pub fn new(
        inner: Arc<dyn Transport>,
        key: CacheKey,
        session_id: u64,
        interval: Duration,
        hook: Arc<dyn InvalidationHook>,
        liveness: Arc<Liveness>,
    ) -> Self {
        Self {
            inner,
            key,
            session_id,
            interval: interval.max(MIN_KEEPALIVE_INTERVAL),
            hook,
            liveness,
            monitor: Mutex::new(None),
        }
    }

    /// Whether a monitor task is currently running.
    pub fn is_running(&self) -> bool {
        self.monitor
            .lock()
            .as_ref()
            .is_some_and(|m| !m.task.is_finished())
    }

    /// Start the monitor, replacing any previous one.
    fn start(&self) {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_monitor(
            Arc::clone(&self.inner),
            self.key.clone(),
            self.session_id,
            self.interval,
            Arc::clone(&self.hook),
            Arc::clone(&self.liveness),
            cancel.clone(),
        ));
        if let Some(previous) = self.monitor.lock().replace(Monitor { cancel, task }) {
            previous.cancel.cancel();
        }
    }

    /// Stop the monitor. Safe to call repeatedly and from inside the
    /// monitor's own invalidation path; it never waits for the task.
    pub fn stop(&self) {
        if let Some(monitor) = self.monitor.lock().take() {
            monitor.cancel.cancel();
            trace!(key = %self.key, session_id = self.session_id, "keepalive stopped");
        }
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_monitor(
    transport: Arc<dyn Transport>,
    key: CacheKey,
    session_id: u64,
    interval: Duration,
    hook: Arc<dyn InvalidationHook>,
    liveness: Arc<Liveness>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(key = %key, session_id, interval = ?interval, "keepalive started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => return,
            result = transport.current_time() => result,
        };

        match result {
            Ok(server_time) => {
                trace!(key = %key, session_id, server_time = %server_time, "keepalive heartbeat");
            }
            Err(e) => {
                error!(key = %key, session_id, error = %e, "failed to keep session alive");
                liveness.mark_stale();
                hook.invalidate(&key, session_id, &e).await;
                return;
            }
        }
    }
}

#[async_trait]
impl Transport for KeepAlive {
    async fn login(&self, username: &str, password: &str) -> TransportResult<()> {
        self.inner.login(username, password).await?;
        self.start();
        Ok(())
    }

    async fn logout(&self) -> TransportResult<()> {
        self.stop();
        self.inner.logout().await
    }

    async fn session_is_active(&self) -> TransportResult<bool> {
        self.inner.session_is_active().await
    }

    async fn current_time(&self) -> TransportResult<DateTime<Utc>> {
        self.inner.current_time().await
    }

    async fn datacenters(&self) -> TransportResult<Vec<Datacenter>> {
        self.inner.datacenters().await
    }

    async fn find_by_uuid(
        &self,
        datacenter: &ManagedObjectReference,
        uuid: &str,
        instance_uuid: bool,
    ) -> TransportResult<Option<ManagedObjectReference>> {
        self.inner.find_by_uuid(datacenter, uuid, instance_uuid).await
    }
}
