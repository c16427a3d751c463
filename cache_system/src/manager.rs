//! Cache manager implementation
//!
//! `CacheManager` is the generic entry store: string keys, serde values,
//! TTL bookkeeping, optional compression, access statistics, and the reactive
//! eviction check on every write.
//!
//! Every operation comes in two forms. `try_*` returns the underlying
//! `CacheError`; the plain form logs it and behaves as if the cache were empty.

use crate::clock::{Clock, SystemClock, duration_to_millis, millis_to_datetime};
use crate::compression::Compressor;
use crate::entry::CacheEntry;
use crate::errors::CacheError;
use crate::eviction::EvictionEngine;
use crate::stats::{CacheCounters, CacheStats, hit_rate};
use config::CacheConfig;
use row_store::{CacheEntryRow, RowStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Generic key/value cache over a `RowStore`
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn RowStore>,
    config: Arc<CacheConfig>,
    codec: Compressor,
    eviction: EvictionEngine,
    counters: Arc<CacheCounters>,
    clock: Arc<dyn Clock>,
    closed: Arc<AtomicBool>,
}

impl Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store_status = if self.is_closed() {
            "closed"
        } else if self.store.is_closed() {
            "store_closed"
        } else {
            "open"
        };

        f.debug_struct("CacheManager")
            .field("config", &self.config)
            .field("codec", &self.codec)
            .field("status", &store_status)
            .finish()
    }
}

impl CacheManager {
    /// Create a new cache manager on the wall clock
    pub fn new(store: Arc<dyn RowStore>, config: CacheConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn RowStore>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            eviction: EvictionEngine::new(&config),
            store,
            config: Arc::new(config),
            codec: Compressor::default(),
            counters: Arc::new(CacheCounters::new()),
            clock,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_compressor(mut self, codec: Compressor) -> Self {
        self.codec = codec;
        self
    }

    /// Get current configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RowStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn counters(&self) -> &CacheCounters {
        &self.counters
    }

    /// Stop accepting operations. Shared by every clone of this manager.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    fn ensure_open(&self) -> Result<(), CacheError> {
        if self.is_closed() {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }

    /// Serialize, then compress when enabled and above the threshold
    fn encode<T>(&self, value: &T) -> Result<(Vec<u8>, bool), CacheError>
    where
        T: Serialize + ?Sized,
    {
        let serialized = serde_json::to_vec(value)?;
        let wants_compression = self.config.enable_compression
            && self.codec.is_available()
            && serialized.len() > self.config.compression_threshold_bytes;

        if !wants_compression {
            return Ok((serialized, false));
        }

        match self.codec.compress(&serialized) {
            Ok(compressed) => Ok((compressed, true)),
            Err(err) => {
                tracing::warn!(error = %err, "compression failed, storing payload uncompressed");
                Ok((serialized, false))
            }
        }
    }

    fn decode<T>(&self, row: &CacheEntryRow) -> Result<T, CacheError>
    where
        T: DeserializeOwned,
    {
        if row.compressed {
            if !self.codec.is_available() {
                return Err(CacheError::CompressionUnavailable);
            }
            let raw = self.codec.decompress(&row.payload)?;
            Ok(serde_json::from_slice(&raw)?)
        } else {
            Ok(serde_json::from_slice(&row.payload)?)
        }
    }

    /// Look up a live entry. Expired rows read as misses but stay in place
    /// until the sweeper or eviction removes them.
    pub async fn try_get<T>(&self, key: &str) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned,
    {
        self.ensure_open()?;
        let now = self.clock.now_millis();

        let row = match self.store.get_entry(key).await? {
            Some(row) if !row.is_expired(now) => row,
            Some(_) => {
                debug_log!(key = %key, "cache miss (expired)");
                self.counters.record_miss();
                return Ok(None);
            }
            None => {
                debug_log!(key = %key, "cache miss");
                self.counters.record_miss();
                return Ok(None);
            }
        };

        let value = self.decode(&row)?;

        if let Err(err) = self.store.touch_entry(key, now).await {
            tracing::warn!(key = %key, error = %err, "failed to record cache access");
        }
        self.counters.record_hit();
        debug_log!(key = %key, "cache hit");
        Ok(Some(value))
    }

    /// Get a value, degrading to `None` on any cache failure
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "cache read failed, treating as miss");
                self.counters.record_miss();
                None
            }
        }
    }

    /// Store a value, replacing any previous entry under `key`
    pub async fn try_set<T>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>
    where
        T: Serialize + ?Sized,
    {
        self.ensure_open()?;
        let (payload, compressed) = self.encode(value)?;
        let size_bytes = payload.len() as u64;
        let now = self.clock.now_millis();

        if let Err(err) = self
            .eviction
            .enforce_size(self.store.as_ref(), &self.counters, now, size_bytes)
            .await
        {
            tracing::warn!(key = %key, error = %err, "eviction check failed, writing anyway");
        }

        let ttl = ttl.unwrap_or_else(|| self.config.default_ttl());
        let row = CacheEntryRow {
            key: key.to_string(),
            payload,
            compressed,
            created_at: now,
            last_accessed: now,
            ttl_ms: duration_to_millis(ttl),
            size_bytes: i64::try_from(size_bytes).unwrap_or(i64::MAX),
            hit_count: 0,
        };
        self.store.upsert_entry(&row).await?;

        debug_log!(key = %key, size_bytes, compressed, "cache set");
        Ok(())
    }

    /// Store a value, dropping the write on any cache failure
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Option<Duration>)
    where
        T: Serialize + ?Sized,
    {
        if let Err(err) = self.try_set(key, value, ttl).await {
            tracing::warn!(key = %key, error = %err, "cache write dropped");
        }
    }

    pub async fn try_delete(&self, key: &str) -> Result<bool, CacheError> {
        self.ensure_open()?;
        Ok(self.store.delete_entry(key).await?)
    }

    /// Delete one entry, returns whether it existed
    pub async fn delete(&self, key: &str) -> bool {
        self.try_delete(key).await.unwrap_or_else(|err| {
            tracing::warn!(key = %key, error = %err, "cache delete failed");
            false
        })
    }

    pub async fn try_clear(&self) -> Result<u64, CacheError> {
        self.ensure_open()?;
        let removed = self.store.clear_entries().await?;
        self.counters.reset();
        Ok(removed)
    }

    /// Remove every entry and reset hit/miss/eviction counters
    pub async fn clear(&self) {
        match self.try_clear().await {
            Ok(removed) => tracing::info!(removed, "cache cleared"),
            Err(err) => {
                self.counters.reset();
                tracing::warn!(error = %err, "cache clear failed");
            }
        }
    }

    /// Entry metadata without touching access statistics
    pub async fn try_peek(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        self.ensure_open()?;
        let now = self.clock.now_millis();
        Ok(self
            .store
            .get_entry(key)
            .await?
            .filter(|row| !row.is_expired(now))
            .map(CacheEntry::from))
    }

    pub async fn peek(&self, key: &str) -> Option<CacheEntry> {
        self.try_peek(key).await.unwrap_or_else(|err| {
            tracing::warn!(key = %key, error = %err, "cache peek failed");
            None
        })
    }

    /// Check if a live entry exists without counting a hit or miss
    pub async fn contains(&self, key: &str) -> bool {
        self.peek(key).await.is_some()
    }

    /// Time left on a live entry
    pub async fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let entry = self.peek(key).await?;
        Some(entry.remaining_ttl(self.clock.now()))
    }

    /// Delete every entry whose key starts with `prefix`
    pub async fn invalidate_prefix(&self, prefix: &str) -> u64 {
        let result = match self.ensure_open() {
            Ok(()) => self
                .store
                .delete_entries_with_prefix(prefix)
                .await
                .map_err(CacheError::from),
            Err(err) => Err(err),
        };

        result.unwrap_or_else(|err| {
            tracing::warn!(prefix = %prefix, error = %err, "prefix invalidation failed");
            0
        })
    }

    pub async fn try_stats(&self) -> Result<CacheStats, CacheError> {
        self.ensure_open()?;
        let totals = self
            .store
            .entry_totals(Some(self.clock.now_millis()))
            .await?;

        let hits = self.counters.hits();
        let misses = self.counters.misses();
        Ok(CacheStats {
            total_entries: u64::try_from(totals.entry_count).unwrap_or(0),
            total_size_bytes: u64::try_from(totals.total_size_bytes).unwrap_or(0),
            hits,
            misses,
            hit_rate: hit_rate(hits, misses),
            evictions: self.counters.evictions(),
            oldest_entry: totals.oldest_created_at.map(millis_to_datetime),
            newest_entry: totals.newest_created_at.map(millis_to_datetime),
        })
    }

    /// Statistics over live entries plus the running counters
    pub async fn stats(&self) -> CacheStats {
        self.try_stats().await.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "cache stats unavailable, reporting counters only");
            CacheStats::from_counters(&self.counters)
        })
    }

    pub async fn try_sweep_expired(&self) -> Result<u64, CacheError> {
        self.ensure_open()?;
        Ok(self
            .store
            .delete_expired_entries(self.clock.now_millis())
            .await?)
    }

    /// Physically remove expired entries, returns how many were removed
    pub async fn sweep_expired(&self) -> u64 {
        self.try_sweep_expired().await.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "expired entry sweep failed");
            0
        })
    }

    /// Ping the store to check connectivity
    pub async fn ping(&self) -> Result<(), CacheError> {
        self.ensure_open()?;
        Ok(self.store.ping().await?)
    }
}
