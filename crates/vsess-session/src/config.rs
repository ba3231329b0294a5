//! Configuration for cached sessions and the cache itself.

use std::time::Duration;

/// Default interval between keepalive heartbeats.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Shortest allowed interval between keepalive heartbeats.
pub const MIN_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(1);

/// Default bound on connecting to a server and logging in.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Keepalive settings for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveConfig {
    /// Whether a background heartbeat keeps the session alive.
    pub enabled: bool,

    /// Time between heartbeats.
    pub interval: Duration,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }
}

impl KeepAliveConfig {
    /// Keepalive enabled with the given interval, raised to at least
    /// [`MIN_KEEPALIVE_INTERVAL`].
    pub fn every(interval: Duration) -> Self {
        Self {
            enabled: true,
            interval: interval.max(MIN_KEEPALIVE_INTERVAL),
        }
    }

    /// Keepalive turned off. Cached sessions are then verified with a
    /// liveness query on every lookup.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Per-session behaviour flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    /// Keepalive settings.
    pub keepalive: KeepAliveConfig,
}

impl Features {
    /// Create the default feature set (keepalive on, five minute interval).
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the keepalive settings.
    pub fn with_keepalive(mut self, keepalive: KeepAliveConfig) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Turn keepalive off.
    pub fn without_keepalive(mut self) -> Self {
        self.keepalive = KeepAliveConfig::disabled();
        self
    }
}

/// How lookups for different keys are serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockGranularity {
    /// One lock guards every lookup. A slow login blocks lookups for
    /// unrelated keys.
    #[default]
    Global,

    /// Each key has its own lock. Lookups for the same key still see at
    /// most one session created.
    PerKey,
}

/// Configuration for the session cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lock granularity for lookups.
    pub lock: LockGranularity,

    /// Per-request timeout handed to the transport when connecting.
    pub connect_timeout: Option<Duration>,

    /// Deadline for a whole lookup, including waiting for the lock.
    /// `None` waits indefinitely.
    pub acquire_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            lock: LockGranularity::default(),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            acquire_timeout: None,
        }
    }
}

impl CacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lock granularity.
    pub fn with_lock(mut self, lock: LockGranularity) -> Self {
        self.lock = lock;
        self
    }

    /// Set the transport timeout used while connecting.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Bound each lookup by `timeout`.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }
}
