//! Pressure-driven eviction
//!
//! Before every write the engine compares the physical totals against the
//! configured ceilings and, when over, removes one batch of victims chosen by
//! the configured policy. Expired rows are removed separately by the sweeper.

use crate::errors::CacheError;
use crate::stats::CacheCounters;
use config::{CacheConfig, EvictionPolicy};
use row_store::{EntryTotals, RowStore, VictimOrder};

/// Result of one eviction batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionOutcome {
    pub evicted: u64,
    /// Victims whose delete failed and were skipped
    pub failed: u64,
}

#[derive(Debug, Clone)]
pub struct EvictionEngine {
    policy: EvictionPolicy,
    max_entries: u64,
    max_size_bytes: u64,
}

impl EvictionEngine {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            policy: config.eviction_policy,
            max_entries: config.max_entries,
            max_size_bytes: config.max_size_bytes,
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// 10% of `max_entries`, never less than one
    pub fn batch_size(&self) -> u64 {
        (self.max_entries / 10).max(1)
    }

    pub fn victim_order(&self) -> VictimOrder {
        match self.policy {
            EvictionPolicy::Lru => VictimOrder::LeastRecentlyUsed,
            EvictionPolicy::Lfu => VictimOrder::LeastFrequentlyUsed,
            EvictionPolicy::Ttl => VictimOrder::ExpiredThenOldest,
        }
    }

    /// Whether writing `incoming_bytes` more would break a ceiling
    pub fn over_ceiling(&self, totals: &EntryTotals, incoming_bytes: u64) -> bool {
        let count = u64::try_from(totals.entry_count).unwrap_or(0);
        let size = u64::try_from(totals.total_size_bytes).unwrap_or(0);
        count >= self.max_entries || size.saturating_add(incoming_bytes) > self.max_size_bytes
    }

    /// Reactive check run before a write
    pub async fn enforce_size(
        &self,
        store: &dyn RowStore,
        counters: &CacheCounters,
        now: i64,
        incoming_bytes: u64,
    ) -> Result<EvictionOutcome, CacheError> {
        let totals = store.entry_totals(None).await?;
        if !self.over_ceiling(&totals, incoming_bytes) {
            return Ok(EvictionOutcome::default());
        }

        debug_log!(
            entries = totals.entry_count,
            size_bytes = totals.total_size_bytes,
            policy = ?self.policy,
            "cache over ceiling, evicting"
        );
        self.evict_batch(store, counters, now).await
    }

    /// Remove one batch of victims. Individual delete failures are skipped.
    pub async fn evict_batch(
        &self,
        store: &dyn RowStore,
        counters: &CacheCounters,
        now: i64,
    ) -> Result<EvictionOutcome, CacheError> {
        let victims = store
            .eviction_candidates(self.victim_order(), now, self.batch_size())
            .await?;

        let mut outcome = EvictionOutcome::default();
        for key in victims {
            match store.delete_entry(&key).await {
                Ok(true) => {
                    trace_log!(key = %key, "evicted");
                    outcome.evicted += 1;
                }
                // Swept or deleted concurrently
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "failed to evict cache entry");
                    outcome.failed += 1;
                }
            }
        }

        counters.record_evictions(outcome.evicted);
        if outcome.failed > 0 {
            tracing::warn!(
                evicted = outcome.evicted,
                failed = outcome.failed,
                "partial eviction, cache may stay over its ceiling until the next write"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::manager::CacheManager;
    use crate::test_support::{FailDeleteStore, memory_store};
    use std::sync::Arc;
    use std::time::Duration;

    fn engine(max_entries: u64, max_size_bytes: u64, policy: EvictionPolicy) -> EvictionEngine {
        EvictionEngine::new(&CacheConfig::new(max_size_bytes, max_entries, 60, false, policy))
    }

    fn totals(entry_count: i64, total_size_bytes: i64) -> EntryTotals {
        EntryTotals {
            entry_count,
            total_size_bytes,
            ..EntryTotals::default()
        }
    }

    #[test]
    fn test_batch_size_is_ten_percent_minimum_one() {
        assert_eq!(engine(3, 1_000, EvictionPolicy::Lru).batch_size(), 1);
        assert_eq!(engine(10, 1_000, EvictionPolicy::Lru).batch_size(), 1);
        assert_eq!(engine(25, 1_000, EvictionPolicy::Lru).batch_size(), 2);
        assert_eq!(engine(10_000, 1_000, EvictionPolicy::Lru).batch_size(), 1_000);
    }

    #[test]
    fn test_ceiling_on_count_and_size() {
        let engine = engine(3, 100, EvictionPolicy::Lru);
        assert!(!engine.over_ceiling(&totals(2, 50), 50));
        assert!(engine.over_ceiling(&totals(3, 10), 1));
        assert!(engine.over_ceiling(&totals(1, 60), 41));
    }

    #[test]
    fn test_policy_maps_to_order() {
        assert_eq!(
            engine(1, 1, EvictionPolicy::Lru).victim_order(),
            VictimOrder::LeastRecentlyUsed
        );
        assert_eq!(
            engine(1, 1, EvictionPolicy::Lfu).victim_order(),
            VictimOrder::LeastFrequentlyUsed
        );
        assert_eq!(
            engine(1, 1, EvictionPolicy::Ttl).victim_order(),
            VictimOrder::ExpiredThenOldest
        );
    }

    #[tokio::test]
    async fn test_failed_victim_delete_is_skipped() {
        let store = Arc::new(FailDeleteStore::new(memory_store().await, "k01"));
        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
        let config = CacheConfig::new(1 << 20, 30, 600, false, EvictionPolicy::Lru);
        let manager = CacheManager::with_clock(store.clone(), config.clone(), clock.clone());

        for i in 0..30u32 {
            manager.set(&format!("k{:02}", i), &i, None).await;
            clock.advance(Duration::from_secs(1));
        }

        let engine = EvictionEngine::new(&config);
        assert_eq!(engine.batch_size(), 3);
        let counters = CacheCounters::new();
        let outcome = engine
            .evict_batch(store.as_ref(), &counters, clock.now_millis())
            .await
            .unwrap();

        assert_eq!(outcome, EvictionOutcome { evicted: 2, failed: 1 });
        assert_eq!(counters.evictions(), 2);
        assert!(!manager.contains("k00").await);
        assert!(manager.contains("k01").await);
        assert!(!manager.contains("k02").await);

        manager.set("fresh", &99u32, None).await;
        assert_eq!(manager.get::<u32>("fresh").await, Some(99));
    }
}
