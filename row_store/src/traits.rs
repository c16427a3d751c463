//! Trait definitions
//!
//! `RowStore` is the seam between the cache engine and whatever physically keeps
//! its rows. The engine only relies on point lookups, upserts, deletes by key or
//! predicate, and a handful of aggregates.

use crate::errors::StoreError;
use crate::rows::{AccountRow, BlockRow, CacheEntryRow, EntryTotals, TokenRow, TransactionRow};
use crate::schema::{DomainKey, DomainTable, VictimOrder};
use async_trait::async_trait;
use std::fmt::Debug;

#[async_trait]
pub trait RowStore: Send + Sync + Debug {
    /// Create tables and indexes if they do not exist yet
    async fn migrate(&self) -> Result<(), StoreError>;

    /// Round-trip to the store
    async fn ping(&self) -> Result<(), StoreError>;

    /// Release the physical store. Later calls fail with `StoreError::Closed`.
    async fn close(&self);

    fn is_closed(&self) -> bool;

    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntryRow>, StoreError>;

    /// Insert or replace the entry stored under `row.key`
    async fn upsert_entry(&self, row: &CacheEntryRow) -> Result<(), StoreError>;

    /// Record a read hit. Returns false if the key vanished in between.
    async fn touch_entry(&self, key: &str, accessed_at: i64) -> Result<bool, StoreError>;

    async fn delete_entry(&self, key: &str) -> Result<bool, StoreError>;

    async fn delete_entries_with_prefix(&self, prefix: &str) -> Result<u64, StoreError>;

    async fn clear_entries(&self) -> Result<u64, StoreError>;

    /// Totals over every physical row, or only rows still live at `live_at`
    async fn entry_totals(&self, live_at: Option<i64>) -> Result<EntryTotals, StoreError>;

    /// Delete every row with `created_at + ttl_ms < now`
    async fn delete_expired_entries(&self, now: i64) -> Result<u64, StoreError>;

    async fn eviction_candidates(
        &self,
        order: VictimOrder,
        now: i64,
        limit: u64,
    ) -> Result<Vec<String>, StoreError>;

    async fn get_transaction(&self, signature: &str)
        -> Result<Option<TransactionRow>, StoreError>;
    async fn upsert_transaction(&self, row: &TransactionRow) -> Result<(), StoreError>;

    async fn get_block(&self, slot: i64) -> Result<Option<BlockRow>, StoreError>;
    async fn upsert_block(&self, row: &BlockRow) -> Result<(), StoreError>;

    async fn get_account(&self, address: &str) -> Result<Option<AccountRow>, StoreError>;
    async fn upsert_account(&self, row: &AccountRow) -> Result<(), StoreError>;

    async fn get_token(&self, mint: &str) -> Result<Option<TokenRow>, StoreError>;
    async fn upsert_token(&self, row: &TokenRow) -> Result<(), StoreError>;

    async fn delete_domain_row(
        &self,
        table: DomainTable,
        key: DomainKey<'_>,
    ) -> Result<bool, StoreError>;

    /// Delete every structured row with `cached_at + ttl_ms < now`
    async fn purge_expired_domain_rows(
        &self,
        table: DomainTable,
        now: i64,
    ) -> Result<u64, StoreError>;

    async fn clear_domain_table(&self, table: DomainTable) -> Result<u64, StoreError>;
}
