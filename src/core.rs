//! Core LedgerCache functionality
//!
//! This module contains the main LedgerCache struct and its implementation,
//! owning the lifecycle of the row store, the cache engine and the sweeper.
//! There is no global instance: the embedding application owns a `LedgerCache`
//! and shares it (usually behind an `Arc`).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use cache_system::{
    AccountRecord, BlockRecord, CacheFirst, CacheManager, CacheParams, CacheStats, Clock,
    DomainCaches, SweepReport, Sweeper, SystemClock, TokenRecord, TransactionRecord, sweep_once,
};
use config::AppConfig;
use row_store::{RowStore, SqliteRowStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, RwLock};

use crate::errors::LedgerCacheError;

/// Everything that exists between `initialize()` and `destroy()`
struct CacheRuntime {
    store: Arc<dyn RowStore>,
    manager: CacheManager,
    domains: DomainCaches,
    sweeper: Mutex<Option<Sweeper>>,
}

/// Main LedgerCache coordinator
pub struct LedgerCache {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    init_lock: Mutex<()>,
    runtime: RwLock<Option<Arc<CacheRuntime>>>,
}

impl std::fmt::Debug for LedgerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self.runtime.try_read() {
            Ok(runtime) if runtime.is_some() => "initialized",
            Ok(_) => "uninitialized",
            Err(_) => "busy",
        };

        f.debug_struct("LedgerCache")
            .field("config", &self.config)
            .field("status", &status)
            .finish()
    }
}

fn not_initialized(operation: &'static str) {
    tracing::warn!(operation, "cache not initialized, degrading");
}

impl LedgerCache {
    /// Create an uninitialized cache. Nothing touches the store until `initialize()`.
    pub fn new(config: AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            init_lock: Mutex::new(()),
            runtime: RwLock::new(None),
        }
    }

    /// Build from `AppConfig::load()`
    pub fn from_env() -> Result<Self, LedgerCacheError> {
        Ok(Self::new(AppConfig::load()?))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Open the store, create the schema and start the sweeper.
    /// Calling it again while initialized does nothing.
    pub async fn initialize(&self) -> Result<(), LedgerCacheError> {
        let _guard = self.init_lock.lock().await;
        if self.runtime.read().await.is_some() {
            return Ok(());
        }

        self.config.validate()?;
        let store: Arc<dyn RowStore> = Arc::new(SqliteRowStore::connect(&self.config.store).await?);
        Self::run_migrations(store.as_ref()).await?;

        let manager = CacheManager::with_clock(
            Arc::clone(&store),
            self.config.cache.clone(),
            Arc::clone(&self.clock),
        );
        let domains = DomainCaches::for_manager(&manager);
        let sweeper = Sweeper::spawn(
            manager.clone(),
            domains.clone(),
            self.config.cache.sweep_interval(),
        );

        *self.runtime.write().await = Some(Arc::new(CacheRuntime {
            store,
            manager,
            domains,
            sweeper: Mutex::new(Some(sweeper)),
        }));

        tracing::info!(
            database_url = %self.config.store.database_url,
            policy = ?self.config.cache.eviction_policy,
            max_entries = self.config.cache.max_entries,
            max_size_bytes = self.config.cache.max_size_bytes,
            "ledger cache initialized"
        );
        Ok(())
    }

    /// Stop the sweeper, close the store and forget the instance.
    /// Safe to call at any time, including before `initialize()`.
    pub async fn destroy(&self) {
        let _guard = self.init_lock.lock().await;
        let Some(runtime) = self.runtime.write().await.take() else {
            return;
        };

        // Stop new operations first, in-flight ones finish or fail on their own
        runtime.manager.close();

        let sweeper = runtime.sweeper.lock().await.take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }
        runtime.store.close().await;

        tracing::info!("ledger cache destroyed");
    }

    pub async fn is_initialized(&self) -> bool {
        self.runtime.read().await.is_some()
    }

    async fn runtime(&self) -> Option<Arc<CacheRuntime>> {
        self.runtime.read().await.clone()
    }

    /// Generic cache handle, `None` while uninitialized
    pub async fn manager(&self) -> Option<CacheManager> {
        self.runtime().await.map(|runtime| runtime.manager.clone())
    }

    /// Structured domain caches, `None` while uninitialized
    pub async fn domains(&self) -> Option<DomainCaches> {
        self.runtime().await.map(|runtime| runtime.domains.clone())
    }

    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        match self.runtime().await {
            Some(runtime) => runtime.manager.get(key).await,
            None => {
                not_initialized("get");
                None
            }
        }
    }

    pub async fn set<T>(&self, key: &str, value: &T, ttl: Option<Duration>)
    where
        T: Serialize + ?Sized,
    {
        match self.runtime().await {
            Some(runtime) => runtime.manager.set(key, value, ttl).await,
            None => not_initialized("set"),
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        match self.runtime().await {
            Some(runtime) => runtime.manager.delete(key).await,
            None => {
                not_initialized("delete");
                false
            }
        }
    }

    /// Remove every generic entry and reset the counters
    pub async fn clear(&self) {
        match self.runtime().await {
            Some(runtime) => runtime.manager.clear().await,
            None => not_initialized("clear"),
        }
    }

    /// Remove every row from the four domain tables
    pub async fn clear_domains(&self) -> u64 {
        match self.runtime().await {
            Some(runtime) => runtime.domains.clear().await,
            None => {
                not_initialized("clear_domains");
                0
            }
        }
    }

    pub async fn stats(&self) -> CacheStats {
        match self.runtime().await {
            Some(runtime) => runtime.manager.stats().await,
            None => {
                not_initialized("stats");
                CacheStats::default()
            }
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        match self.runtime().await {
            Some(runtime) => runtime.manager.contains(key).await,
            None => false,
        }
    }

    pub async fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        self.runtime().await?.manager.remaining_ttl(key).await
    }

    pub async fn invalidate_prefix(&self, prefix: &str) -> u64 {
        match self.runtime().await {
            Some(runtime) => runtime.manager.invalidate_prefix(prefix).await,
            None => {
                not_initialized("invalidate_prefix");
                0
            }
        }
    }

    /// Sweep expired rows now instead of waiting for the timer
    pub async fn sweep_expired(&self) -> SweepReport {
        match self.runtime().await {
            Some(runtime) => sweep_once(&runtime.manager, &runtime.domains).await,
            None => {
                not_initialized("sweep_expired");
                SweepReport::default()
            }
        }
    }

    /// Check store connectivity
    pub async fn health_check(&self) -> Result<(), LedgerCacheError> {
        let runtime = self
            .runtime()
            .await
            .ok_or(LedgerCacheError::NotInitialized)?;
        runtime.manager.ping().await?;
        Ok(())
    }

    pub async fn get_transaction(&self, signature: &str) -> Option<TransactionRecord> {
        self.domains().await?.get_transaction(signature).await
    }

    pub async fn set_transaction(&self, signature: &str, record: &TransactionRecord) {
        match self.domains().await {
            Some(domains) => domains.set_transaction(signature, record).await,
            None => not_initialized("set_transaction"),
        }
    }

    pub async fn get_block(&self, slot: u64) -> Option<BlockRecord> {
        self.domains().await?.get_block(slot).await
    }

    pub async fn set_block(&self, slot: u64, record: &BlockRecord) {
        match self.domains().await {
            Some(domains) => domains.set_block(slot, record).await,
            None => not_initialized("set_block"),
        }
    }

    pub async fn get_account(&self, address: &str) -> Option<AccountRecord> {
        self.domains().await?.get_account(address).await
    }

    pub async fn set_account(&self, address: &str, record: &AccountRecord) {
        match self.domains().await {
            Some(domains) => domains.set_account(address, record).await,
            None => not_initialized("set_account"),
        }
    }

    pub async fn get_token(&self, mint: &str) -> Option<TokenRecord> {
        self.domains().await?.get_token(mint).await
    }

    pub async fn set_token(&self, mint: &str, record: &TokenRecord) {
        match self.domains().await {
            Some(domains) => domains.set_token(mint, record).await,
            None => not_initialized("set_token"),
        }
    }

    /// Cache-first read through the generic namespace. While uninitialized
    /// the loader is called directly and nothing is stored.
    pub async fn cache_first<T, F, Fut, E>(
        &self,
        key: &str,
        loader: F,
        params: &CacheParams,
    ) -> Result<CacheFirst<T>, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.manager().await {
            Some(manager) => manager.cache_first(key, loader, params).await,
            None => load_uncached("cache_first", loader).await,
        }
    }

    pub async fn cache_first_transaction<F, Fut, E>(
        &self,
        signature: &str,
        loader: F,
        params: &CacheParams,
    ) -> Result<CacheFirst<TransactionRecord>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TransactionRecord, E>>,
    {
        match self.domains().await {
            Some(domains) => {
                domains
                    .transactions
                    .cache_first(signature, loader, params)
                    .await
            }
            None => load_uncached("cache_first_transaction", loader).await,
        }
    }

    pub async fn cache_first_block<F, Fut, E>(
        &self,
        slot: u64,
        loader: F,
        params: &CacheParams,
    ) -> Result<CacheFirst<BlockRecord>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<BlockRecord, E>>,
    {
        match self.domains().await {
            Some(domains) => domains.blocks.cache_first(&slot, loader, params).await,
            None => load_uncached("cache_first_block", loader).await,
        }
    }

    pub async fn cache_first_account<F, Fut, E>(
        &self,
        address: &str,
        loader: F,
        params: &CacheParams,
    ) -> Result<CacheFirst<AccountRecord>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccountRecord, E>>,
    {
        match self.domains().await {
            Some(domains) => domains.accounts.cache_first(address, loader, params).await,
            None => load_uncached("cache_first_account", loader).await,
        }
    }

    pub async fn cache_first_token<F, Fut, E>(
        &self,
        mint: &str,
        loader: F,
        params: &CacheParams,
    ) -> Result<CacheFirst<TokenRecord>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TokenRecord, E>>,
    {
        match self.domains().await {
            Some(domains) => domains.tokens.cache_first(mint, loader, params).await,
            None => load_uncached("cache_first_token", loader).await,
        }
    }
}

async fn load_uncached<T, F, Fut, E>(operation: &'static str, loader: F) -> Result<CacheFirst<T>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    not_initialized(operation);
    Ok(CacheFirst {
        data: loader().await?,
        from_cache: false,
    })
}
