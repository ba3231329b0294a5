//! Keyed cache of authenticated vCenter sessions.
//!
//! This crate keeps one logged-in session per (server, user, datacenter)
//! and hands it to every caller that asks for the same key:
//! - Sessions are created on demand and reused while usable
//! - An optional keepalive heartbeat evicts sessions that die
//! - Lookups for one key never create two sessions concurrently
//! - Virtual machines are resolved by BIOS or instance UUID
//!
//! # Example
//!
//! ```rust,ignore
//! use vsess_session::{CacheConfig, Credentials, SessionCache, SessionRequest};
//! use vsess_client::TlsTrust;
//!
//! let cache = SessionCache::new(CacheConfig::default());
//! let request = SessionRequest::new("vc.example.com", Credentials::new("admin", "secret"))
//!     .with_tls(TlsTrust::from_thumbprint(Some(thumbprint))?);
//!
//! let session = cache.get_or_create(&request).await?;
//! let vm = session.find_by_instance_uuid(uuid).await?;
//! ```

mod cache;
mod config;
mod error;
mod factory;
mod keepalive;
mod key;
mod resolver;
mod session;
mod transport;

pub mod testing;

pub use cache::{CacheEntry, CacheStats, SessionCache};
pub use config::{
    CacheConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_KEEPALIVE_INTERVAL, Features, KeepAliveConfig,
    LockGranularity, MIN_KEEPALIVE_INTERVAL,
};
pub use error::{Error, Result};
pub use factory::ConnectionFactory;
pub use keepalive::{InvalidationHook, KeepAlive, Liveness, NoInvalidation};
pub use key::{CacheKey, Credentials, SessionRequest};
pub use resolver::{datacenter_or_default, resolve_by_uuid};
pub use session::Session;
pub use tokio_util::sync::CancellationToken;
pub use transport::{Connector, Transport, TransportResult, VimConnector};
