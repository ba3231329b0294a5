//! Keyed cache of authenticated sessions.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use vsess_client::Error as ClientError;

use crate::config::{CacheConfig, LockGranularity};
use crate::error::{Error, Result};
use crate::factory::ConnectionFactory;
use crate::keepalive::InvalidationHook;
use crate::key::{CacheKey, SessionRequest};
use crate::session::Session;
use crate::transport::{Connector, VimConnector};

/// Entry stored in the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cached session.
    pub session: Arc<Session>,

    /// When this entry was inserted into cache.
    pub cached_at: Instant,
}

impl CacheEntry {
    fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            cached_at: Instant::now(),
        }
    }
}

/// One key's slot. The slot lock is held while its session is checked or
/// created, so two lookups for a key never both create a session.
type Slot = Arc<tokio::sync::Mutex<Option<CacheEntry>>>;

struct CacheInner {
    /// Empty slots nobody else holds are pruned on eviction.
    slots: parking_lot::Mutex<HashMap<CacheKey, Slot>>,

    /// Keys whose slot holds a session. Changed only under the slot lock,
    /// read without it.
    occupied: parking_lot::Mutex<BTreeSet<CacheKey>>,

    /// Held for the whole lookup in [`LockGranularity::Global`] mode.
    global: tokio::sync::Mutex<()>,

    factory: ConnectionFactory,
    config: CacheConfig,

    creations: AtomicU64,
    hits: AtomicU64,
    evictions: AtomicU64,
}

impl CacheInner {
    fn slot(&self, key: &CacheKey) -> Slot {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    fn existing_slot(&self, key: &CacheKey) -> Option<Slot> {
        self.slots.lock().get(key).cloned()
    }

    fn all_slots(&self) -> Vec<(CacheKey, Slot)> {
        self.slots
            .lock()
            .iter()
            .map(|(k, s)| (k.clone(), Arc::clone(s)))
            .collect()
    }

    /// Remove `slot` from the map if it is empty and held only by the map
    /// and the caller.
    fn prune_slot(&self, key: &CacheKey, slot: &Slot) {
        let mut slots = self.slots.lock();
        let idle = slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot))
            && Arc::strong_count(slot) == 2
            && slot.try_lock().is_ok_and(|entry| entry.is_none());
        if idle {
            slots.remove(key);
            trace!(key = %key, "pruned empty slot");
        }
    }

    fn record_insert(&self, entry: &CacheEntry) {
        self.occupied.lock().insert(entry.session.key().clone());
        self.creations.fetch_add(1, Ordering::Relaxed);
    }

    fn record_eviction(&self, entry: &CacheEntry, reason: &str) {
        entry.session.stop_keepalive();
        self.occupied.lock().remove(entry.session.key());
        self.evictions.fetch_add(1, Ordering::Relaxed);
        debug!(
            key = %entry.session.key(),
            session_id = entry.session.id(),
            reason,
            "evicted session"
        );
    }

    /// Empty the slot for `key`, but only if it still holds `session_id`
    /// when one is given.
    async fn evict(&self, key: &CacheKey, session_id: Option<u64>, reason: &str) -> bool {
        let Some(slot) = self.existing_slot(key) else {
            return false;
        };
        let mut entry = slot.lock().await;
        let matches = match (entry.as_ref(), session_id) {
            (Some(current), Some(id)) => current.session.id() == id,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !matches {
            return false;
        }
        let Some(old) = entry.take() else {
            return false;
        };
        self.record_eviction(&old, reason);
        drop(entry);
        self.prune_slot(key, &slot);
        true
    }
}

/// Evicts sessions whose keepalive failed. Holds the cache weakly so a
/// monitor never keeps a dropped cache alive.
struct CacheInvalidator {
    inner: Weak<CacheInner>,
}

#[async_trait]
impl InvalidationHook for CacheInvalidator {
    async fn invalidate(&self, key: &CacheKey, session_id: u64, reason: &ClientError) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        if inner.evict(key, Some(session_id), "keepalive failed").await {
            info!(key = %key, session_id, error = %reason, "dropped dead session from cache");
        }
    }
}

/// Cache of authenticated sessions keyed by server, user and datacenter.
///
/// [`SessionCache::get_or_create`] returns the cached session for a key
/// when it is still usable and otherwise creates one. The cache is cheap to
/// clone; clones share state.
///
/// # Example
///
/// ```no_run
/// use vsess_session::{CacheConfig, Credentials, SessionCache, SessionRequest};
///
/// # async fn example() -> vsess_session::Result<()> {
/// let cache = SessionCache::new(CacheConfig::default());
/// let request = SessionRequest::new("vc.example.com", Credentials::new("admin", "secret"))
///     .with_datacenter("DC0");
///
/// let session = cache.get_or_create(&request).await?;
/// let vm = session.find_by_bios_uuid("42108d47-0a54-5b1c-a3c0-7f3c5d8e9a10").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionCache {
    inner: Arc<CacheInner>,
}

impl SessionCache {
    /// Create a cache that connects to real vCenter servers.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_connector(config, Arc::new(VimConnector::default()))
    }

    /// Create a cache that opens connections through `connector`.
    pub fn with_connector(config: CacheConfig, connector: Arc<dyn Connector>) -> Self {
        let factory = ConnectionFactory::new(connector).with_connect_timeout(config.connect_timeout);
        Self {
            inner: Arc::new(CacheInner {
                slots: parking_lot::Mutex::new(HashMap::new()),
                occupied: parking_lot::Mutex::new(BTreeSet::new()),
                global: tokio::sync::Mutex::new(()),
                factory,
                config,
                creations: AtomicU64::new(0),
                hits: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
            }),
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Return the usable session for the request's key, creating one if
    /// needed.
    ///
    /// A cached keepalive session is returned without a server round trip;
    /// its monitor evicts it if it dies. Other sessions are checked with a
    /// liveness query first. A failed creation leaves nothing cached.
    pub async fn get_or_create(&self, request: &SessionRequest) -> Result<Arc<Session>> {
        self.get_or_create_until(request, &CancellationToken::new())
            .await
    }

    /// [`SessionCache::get_or_create`], abandoned when `cancel` fires or the
    /// configured acquire timeout passes.
    pub async fn get_or_create_until(
        &self,
        request: &SessionRequest,
        cancel: &CancellationToken,
    ) -> Result<Arc<Session>> {
        let key = request.key();
        let lookup = async {
            match self.inner.config.acquire_timeout {
                Some(timeout) => {
                    match tokio::time::timeout(timeout, self.lookup(request, &key)).await {
                        Ok(result) => result,
                        Err(_) => Err(Error::Timeout {
                            key: key.to_string(),
                            timeout,
                        }),
                    }
                }
                None => self.lookup(request, &key).await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled { key: key.to_string() }),
            result = lookup => result,
        }
    }

    async fn lookup(&self, request: &SessionRequest, key: &CacheKey) -> Result<Arc<Session>> {
        let _global = match self.inner.config.lock {
            LockGranularity::Global => Some(self.inner.global.lock().await),
            LockGranularity::PerKey => None,
        };
        let slot = self.inner.slot(key);
        let mut entry = slot.lock().await;

        if let Some(existing) = entry.as_ref() {
            let session = Arc::clone(&existing.session);
            let usable = if session.is_keepalive() {
                !session.is_stale()
            } else {
                session.is_active().await
            };
            if usable {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, session_id = session.id(), "session cache hit");
                return Ok(session);
            }
            if let Some(old) = entry.take() {
                self.inner.record_eviction(&old, "session no longer active");
            }
        }

        debug!(key = %key, "creating vCenter session");
        let hook = Arc::new(CacheInvalidator {
            inner: Arc::downgrade(&self.inner),
        });
        let session = match self.inner.factory.create(request, hook).await {
            Ok(session) => Arc::new(session),
            Err(e) => {
                drop(entry);
                self.inner.prune_slot(key, &slot);
                return Err(e);
            }
        };
        let cached = CacheEntry::new(Arc::clone(&session));
        self.inner.record_insert(&cached);
        *entry = Some(cached);
        Ok(session)
    }

    /// Drop the session cached under `key`, stopping its keepalive.
    ///
    /// The next lookup for the key creates a new session. Returns whether an
    /// entry was removed. The server-side session is left to expire.
    pub async fn clear(&self, key: &CacheKey) -> bool {
        self.inner.evict(key, None, "cleared").await
    }

    /// The cached session for `key` without any liveness check.
    pub async fn peek(&self, key: &CacheKey) -> Option<Arc<Session>> {
        let slot = self.inner.existing_slot(key)?;
        let entry = slot.lock().await;
        entry.as_ref().map(|e| Arc::clone(&e.session))
    }

    /// Check whether a session is cached for `key`.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.peek(key).await.is_some()
    }

    /// Keys with a cached session, sorted.
    ///
    /// Never waits for a lookup in progress.
    pub async fn keys(&self) -> Vec<CacheKey> {
        self.inner.occupied.lock().iter().cloned().collect()
    }

    /// Get the current number of cached sessions.
    pub async fn len(&self) -> usize {
        self.inner.occupied.lock().len()
    }

    /// Check if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len().await,
            creations: self.inner.creations.load(Ordering::Relaxed),
            hits: self.inner.hits.load(Ordering::Relaxed),
            evictions: self.inner.evictions.load(Ordering::Relaxed),
            lock: self.inner.config.lock,
        }
    }

    /// Close every cached session: stop keepalives and log out.
    ///
    /// Returns the number of sessions closed.
    pub async fn shutdown(&self) -> usize {
        let mut closed = 0;
        for (key, slot) in self.inner.all_slots() {
            let taken = slot.lock().await.take();
            if let Some(entry) = taken {
                self.inner.record_eviction(&entry, "shutdown");
                entry.session.close().await;
                closed += 1;
            }
            self.inner.prune_slot(&key, &slot);
        }
        info!(closed, "session cache shut down");
        closed
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Current number of cached sessions.
    pub size: usize,

    /// Sessions created since the cache was built.
    pub creations: u64,

    /// Lookups answered from the cache.
    pub hits: u64,

    /// Entries removed for any reason.
    pub evictions: u64,

    /// Lock granularity in effect.
    pub lock: LockGranularity,
}
