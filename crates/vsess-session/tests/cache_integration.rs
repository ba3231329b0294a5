//! Session cache behaviour against the in-memory vCenter.

use std::sync::Arc;
use std::time::Duration;

use vsess_session::testing::{FakeBackend, FakeConnector};
use vsess_session::{
    CacheConfig, CancellationToken, Credentials, Error, Features, KeepAliveConfig,
    LockGranularity, MIN_KEEPALIVE_INTERVAL, SessionCache, SessionRequest,
};

const BIOS_UUID: &str = "42108d47-0a54-5b1c-a3c0-7f3c5d8e9a10";
const INSTANCE_UUID: &str = "50169a0e-77c2-4a1b-9f7e-0d8a2b3c4e5f";

fn backend() -> Arc<FakeBackend> {
    Arc::new(
        FakeBackend::new()
            .with_datacenter("DC0")
            .with_user("admin", "secret")
            .with_vm("DC0", "vm-42", BIOS_UUID, INSTANCE_UUID),
    )
}

fn cache_with(backend: &Arc<FakeBackend>, config: CacheConfig) -> SessionCache {
    SessionCache::with_connector(config, Arc::new(FakeConnector::new(Arc::clone(backend))))
}

fn cache(backend: &Arc<FakeBackend>) -> SessionCache {
    cache_with(backend, CacheConfig::default())
}

fn request() -> SessionRequest {
    SessionRequest::new("vc.test", Credentials::new("admin", "secret"))
        .with_features(Features::new().without_keepalive())
}

fn keepalive_request(interval: Duration) -> SessionRequest {
    request().with_features(Features::new().with_keepalive(KeepAliveConfig::every(interval)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Reuse and re-creation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sequential_lookups_share_one_session() {
    let backend = backend();
    let cache = cache(&backend);

    let first = cache.get_or_create(&request()).await.unwrap();
    let second = cache.get_or_create(&request()).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(backend.logins(), 1);
    assert_eq!(backend.connections(), 1);
    assert_eq!(first.datacenter().name, "DC0");
}

#[tokio::test]
async fn test_clear_forces_new_login() {
    let backend = backend();
    let cache = cache(&backend);

    let first = cache.get_or_create(&request()).await.unwrap();
    assert!(cache.clear(&request().key()).await);
    assert!(!cache.contains(&request().key()).await);

    let second = cache.get_or_create(&request()).await.unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(backend.logins(), 2);
}

#[tokio::test]
async fn test_inactive_session_is_replaced() {
    let backend = backend();
    let cache = cache(&backend);

    let first = cache.get_or_create(&request()).await.unwrap();
    backend.expire_sessions();

    let second = cache.get_or_create(&request()).await.unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(backend.logins(), 2);
    assert_eq!(cache.stats().await.evictions, 1);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn test_plain_session_checks_liveness_on_hit() {
    let backend = backend();
    let cache = cache(&backend);

    cache.get_or_create(&request()).await.unwrap();
    cache.get_or_create(&request()).await.unwrap();
    assert_eq!(backend.activity_checks(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_keepalive_session_skips_liveness_on_hit() {
    let backend = backend();
    let cache = cache(&backend);
    let req = keepalive_request(Duration::from_secs(300));

    let first = cache.get_or_create(&req).await.unwrap();
    let second = cache.get_or_create(&req).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(first.is_keepalive());
    assert_eq!(backend.activity_checks(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────────────────────

async fn concurrent_lookups(lock: LockGranularity) {
    let backend = Arc::new(
        FakeBackend::new()
            .with_datacenter("DC0")
            .with_login_delay("admin", Duration::from_millis(50)),
    );
    let cache = cache_with(&backend, CacheConfig::new().with_lock(lock));

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let cache = cache.clone();
        tasks.push(tokio::spawn(async move {
            cache.get_or_create(&request()).await.map(|s| s.id())
        }));
    }

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap());
    }

    assert_eq!(backend.logins(), 1);
    assert!(ids.iter().all(|id| *id == ids[0]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_log_in_once_global() {
    concurrent_lookups(LockGranularity::Global).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_log_in_once_per_key() {
    concurrent_lookups(LockGranularity::PerKey).await;
}

fn slow_and_fast() -> Arc<FakeBackend> {
    Arc::new(
        FakeBackend::new()
            .with_datacenter("DC0")
            .with_login_delay("slow", Duration::from_secs(10)),
    )
}

fn user_request(user: &str) -> SessionRequest {
    SessionRequest::new("vc.test", Credentials::new(user, "pw"))
        .with_features(Features::new().without_keepalive())
}

async fn start_slow_login(cache: &SessionCache) -> tokio::task::JoinHandle<()> {
    let slow = cache.clone();
    let handle = tokio::spawn(async move {
        slow.get_or_create(&user_request("slow")).await.unwrap();
    });
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    handle
}

#[tokio::test(start_paused = true)]
async fn test_per_key_lock_does_not_block_other_keys() {
    let backend = slow_and_fast();
    let cache = cache_with(&backend, CacheConfig::new().with_lock(LockGranularity::PerKey));
    let slow = start_slow_login(&cache).await;

    let fast = tokio::time::timeout(
        Duration::from_secs(1),
        cache.get_or_create(&user_request("fast")),
    )
    .await;
    assert!(fast.expect("fast key should not wait").is_ok());

    slow.await.unwrap();
    assert_eq!(cache.len().await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_global_lock_serializes_all_keys() {
    let backend = slow_and_fast();
    let cache = cache_with(&backend, CacheConfig::new().with_lock(LockGranularity::Global));
    let slow = start_slow_login(&cache).await;

    let fast = tokio::time::timeout(
        Duration::from_secs(1),
        cache.get_or_create(&user_request("fast")),
    )
    .await;
    assert!(fast.is_err(), "fast key should wait behind the slow login");

    slow.await.unwrap();
    cache.get_or_create(&user_request("fast")).await.unwrap();
    assert_eq!(cache.len().await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_stats_do_not_wait_for_login() {
    let backend = slow_and_fast();
    let cache = cache_with(&backend, CacheConfig::new().with_lock(LockGranularity::Global));
    let slow = start_slow_login(&cache).await;

    let stats = tokio::time::timeout(Duration::from_secs(1), cache.stats())
        .await
        .expect("stats should not wait behind a login");
    assert_eq!(stats.size, 0);
    let keys = tokio::time::timeout(Duration::from_secs(1), cache.keys())
        .await
        .expect("keys should not wait behind a login");
    assert!(keys.is_empty());

    slow.await.unwrap();
    assert_eq!(cache.len().await, 1);
    assert_eq!(cache.keys().await, vec![user_request("slow").key()]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Keepalive
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_zero_keepalive_interval_still_evicts() {
    let backend = backend();
    let cache = cache(&backend);
    let req = request().with_features(Features::new().with_keepalive(KeepAliveConfig {
        enabled: true,
        interval: Duration::ZERO,
    }));

    let first = cache.get_or_create(&req).await.unwrap();
    backend.fail_heartbeats(true);

    tokio::time::sleep(MIN_KEEPALIVE_INTERVAL * 2).await;
    assert_eq!(backend.heartbeats(), 1);
    assert!(first.is_stale());
    assert!(!cache.contains(&req.key()).await);

    backend.fail_heartbeats(false);
    let second = cache.get_or_create(&req).await.unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(backend.logins(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_heartbeat_evicts_within_one_interval() {
    let backend = backend();
    let cache = cache(&backend);
    let req = keepalive_request(Duration::from_secs(10));

    let first = cache.get_or_create(&req).await.unwrap();
    backend.fail_heartbeats(true);

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(!cache.contains(&req.key()).await);
    assert!(first.is_stale());

    backend.fail_heartbeats(false);
    let second = cache.get_or_create(&req).await.unwrap();
    assert_ne!(first.id(), second.id());
    assert!(!second.is_stale());
    assert_eq!(backend.logins(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_healthy_keepalive_keeps_entry() {
    let backend = backend();
    let cache = cache(&backend);
    let req = keepalive_request(Duration::from_secs(10));

    let session = cache.get_or_create(&req).await.unwrap();
    tokio::time::sleep(Duration::from_secs(45)).await;

    assert_eq!(backend.heartbeats(), 4);
    assert!(cache.contains(&req.key()).await);
    assert!(!session.is_stale());
}

#[tokio::test(start_paused = true)]
async fn test_clear_stops_heartbeats() {
    let backend = backend();
    let cache = cache(&backend);
    let req = keepalive_request(Duration::from_secs(10));

    cache.get_or_create(&req).await.unwrap();
    cache.clear(&req.key()).await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.heartbeats(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Failures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_rejected_login_caches_nothing() {
    let backend = backend();
    let cache = cache(&backend);
    let bad = SessionRequest::new("vc.test", Credentials::new("admin", "wrong"))
        .with_features(Features::new().without_keepalive());

    let err = cache.get_or_create(&bad).await.unwrap_err();
    assert!(err.is_auth_error(), "unexpected error: {err}");
    assert!(cache.is_empty().await);

    cache.get_or_create(&request()).await.unwrap();
    assert_eq!(backend.logins(), 1);
}

#[tokio::test]
async fn test_malformed_server_never_connects() {
    let backend = backend();
    let cache = cache(&backend);
    let bad = SessionRequest::new("ftp://vc.test", Credentials::new("admin", "secret"));

    let err = cache.get_or_create(&bad).await.unwrap_err();
    assert!(matches!(err, Error::InvalidServer { .. }), "unexpected error: {err}");
    assert_eq!(backend.connections(), 0);
}

#[tokio::test]
async fn test_unreachable_server_is_retryable() {
    let backend = backend();
    backend.fail_connections(true);
    let cache = cache(&backend);

    let err = cache.get_or_create(&request()).await.unwrap_err();
    assert!(matches!(err, Error::Connect { .. }));
    assert!(err.is_retryable());
    assert!(cache.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_missing_datacenter_logs_out() {
    let backend = backend();
    let cache = cache(&backend);
    let req = keepalive_request(Duration::from_secs(10)).with_datacenter("DC9");

    let err = cache.get_or_create(&req).await.unwrap_err();
    match err {
        Error::DatacenterNotFound { datacenter, .. } => assert_eq!(datacenter, "DC9"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(backend.logouts(), 1);
    assert!(cache.is_empty().await);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.heartbeats(), 0);
}

#[tokio::test]
async fn test_cancelled_lookup() {
    let backend = backend();
    let cache = cache(&backend);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = cache
        .get_or_create_until(&request(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled { .. }));
    assert!(cache.is_empty().await);
    assert_eq!(backend.connections(), 0);
}

fn slow_inventory() -> Arc<FakeBackend> {
    Arc::new(
        FakeBackend::new()
            .with_datacenter("DC0")
            .with_user("admin", "secret")
            .with_inventory_delay(Duration::from_secs(5)),
    )
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_login_logs_out() {
    let backend = slow_inventory();
    let cache = cache(&backend);
    let req = keepalive_request(Duration::from_secs(10));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let err = cache.get_or_create_until(&req, &cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled { .. }), "unexpected error: {err}");

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(backend.logins(), 1);
    assert_eq!(backend.logouts(), 1);
    assert!(cache.is_empty().await);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.heartbeats(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_after_login_logs_out() {
    let backend = slow_inventory();
    let cache = cache_with(
        &backend,
        CacheConfig::new().with_acquire_timeout(Duration::from_secs(2)),
    );

    let err = cache.get_or_create(&request()).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "unexpected error: {err}");

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(backend.logins(), 1);
    assert_eq!(backend.logouts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_acquire_timeout() {
    let backend = slow_and_fast();
    let cache = cache_with(
        &backend,
        CacheConfig::new().with_acquire_timeout(Duration::from_secs(2)),
    );

    let err = cache
        .get_or_create(&user_request("slow"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
    assert!(err.is_retryable());
    assert!(cache.is_empty().await);
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_bios_and_instance_uuid_are_distinct() {
    let backend = backend();
    let cache = cache(&backend);
    let session = cache.get_or_create(&request()).await.unwrap();

    let by_bios = session.find_by_bios_uuid(BIOS_UUID).await.unwrap();
    assert_eq!(by_bios.unwrap().value, "vm-42");
    assert!(session.find_by_instance_uuid(BIOS_UUID).await.unwrap().is_none());

    let by_instance = session.find_by_instance_uuid(INSTANCE_UUID).await.unwrap();
    assert_eq!(by_instance.unwrap().value, "vm-42");
    assert!(session.find_by_bios_uuid(INSTANCE_UUID).await.unwrap().is_none());
}

#[tokio::test]
async fn test_lookup_fault_is_error() {
    let backend = backend();
    let cache = cache(&backend);
    let session = cache.get_or_create(&request()).await.unwrap();
    backend.fail_lookups(true);

    let err = session.find_by_bios_uuid(BIOS_UUID).await.unwrap_err();
    assert!(matches!(err, Error::Lookup { .. }));
}

#[tokio::test]
async fn test_closed_session_is_not_initialized() {
    let backend = backend();
    let cache = cache(&backend);
    let session = cache.get_or_create(&request()).await.unwrap();

    session.close().await;
    assert!(session.is_stale());
    assert_eq!(backend.logouts(), 1);

    let err = session.find_by_bios_uuid(BIOS_UUID).await.unwrap_err();
    assert!(matches!(err, Error::NotInitialized));

    // The cache notices on the next lookup.
    let fresh = cache.get_or_create(&request()).await.unwrap();
    assert_ne!(fresh.id(), session.id());
}

#[tokio::test]
async fn test_default_datacenter() {
    let backend = backend();
    let cache = cache(&backend);

    let session = cache.get_or_create(&request()).await.unwrap();
    assert_eq!(session.datacenter().name, "DC0");
    assert_eq!(
        Some(session.datacenter().reference.clone()),
        backend.datacenter_ref("DC0")
    );
}

#[tokio::test]
async fn test_default_datacenter_ambiguous() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_datacenter("DC0")
            .with_datacenter("DC1"),
    );
    let cache = cache(&backend);

    let err = cache.get_or_create(&request()).await.unwrap_err();
    assert!(matches!(err, Error::AmbiguousDatacenter { count: 2, .. }));

    let named = cache
        .get_or_create(&request().with_datacenter("DC1"))
        .await
        .unwrap();
    assert_eq!(named.datacenter().name, "DC1");
}

// ─────────────────────────────────────────────────────────────────────────────
// Shutdown
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_shutdown_logs_out_everything() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_datacenter("DC0")
            .with_datacenter("DC1"),
    );
    let cache = cache(&backend);
    let req = keepalive_request(Duration::from_secs(10));

    cache
        .get_or_create(&req.clone().with_datacenter("DC0"))
        .await
        .unwrap();
    cache
        .get_or_create(&req.with_datacenter("DC1"))
        .await
        .unwrap();

    assert_eq!(cache.shutdown().await, 2);
    assert!(cache.is_empty().await);
    assert_eq!(backend.logouts(), 2);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.heartbeats(), 0);
}
