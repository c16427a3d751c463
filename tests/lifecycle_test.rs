//! Integration tests for initialize/destroy and the uninitialized degrade path

use ledgercache::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn new_cache() -> LedgerCache {
    LedgerCache::new(AppConfig::default())
}

#[tokio::test]
async fn test_operations_before_initialize_degrade() -> anyhow::Result<()> {
    let cache = new_cache();

    cache.set("k", &1u8, None).await;
    assert_eq!(cache.get::<u8>("k").await, None);
    assert!(!cache.delete("k").await);
    assert_eq!(cache.stats().await, CacheStats::default());
    assert_eq!(cache.get_transaction("sig").await, None);

    let calls = AtomicUsize::new(0);
    for _ in 0..2 {
        let result = cache
            .cache_first(
                "k",
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, anyhow::Error>(7u8) }
                },
                &CacheParams::default(),
            )
            .await?;
        assert!(!result.from_cache);
        assert_eq!(result.data, 7);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_initialize_shares_one_instance() {
    let cache = Arc::new(new_cache());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.initialize().await })
        })
        .collect();
    for handle in handles {
        handle.await.expect("join").expect("initialize");
    }

    cache.set("shared", &"value", None).await;
    cache.initialize().await.expect("initialize again");
    assert_eq!(cache.get::<String>("shared").await.as_deref(), Some("value"));

    cache.destroy().await;
}

#[tokio::test]
async fn test_destroy_stops_accepting_operations() {
    let cache = new_cache();
    cache.initialize().await.expect("initialize");
    let manager = cache.manager().await.expect("manager");
    cache.set("k", &1u8, None).await;

    cache.destroy().await;

    assert!(!cache.is_initialized().await);
    assert!(manager.is_closed());
    assert_eq!(manager.get::<u8>("k").await, None);
    assert_eq!(cache.get::<u8>("k").await, None);
    assert!(cache.health_check().await.is_err());

    // Second destroy is harmless
    cache.destroy().await;
}

#[tokio::test]
async fn test_reinitialize_after_destroy() {
    let cache = new_cache();
    cache.initialize().await.expect("initialize");
    cache.set("k", &1u8, None).await;
    cache.destroy().await;

    cache.initialize().await.expect("re-initialize");
    assert!(cache.health_check().await.is_ok());
    // The in-memory database went away with the old pool
    assert_eq!(cache.get::<u8>("k").await, None);
    cache.set("k", &2u8, None).await;
    assert_eq!(cache.get::<u8>("k").await, Some(2));

    cache.destroy().await;
}

#[tokio::test]
async fn test_config_from_toml() {
    let config = AppConfig::from_toml_str(
        r#"
        [cache]
        max_entries = 500
        eviction_policy = "lfu"

        [store]
        database_url = "sqlite::memory:"
        "#,
    )
    .expect("valid config");
    assert_eq!(config.cache.max_entries, 500);
    assert_eq!(config.cache.eviction_policy, EvictionPolicy::Lfu);

    let cache = LedgerCache::new(config);
    cache.initialize().await.expect("initialize");
    assert_eq!(cache.config().cache.max_entries, 500);
    cache.destroy().await;
}
