//! Shared test doubles

use async_trait::async_trait;
use config::StoreConfig;
use row_store::{
    AccountRow, BlockRow, CacheEntryRow, DomainKey, DomainTable, EntryTotals, RowStore,
    SqliteRowStore, StoreError, TokenRow, TransactionRow, VictimOrder,
};
use std::sync::Arc;

/// Fresh migrated in-memory SQLite store
pub async fn memory_store() -> Arc<dyn RowStore> {
    let store = SqliteRowStore::connect(&StoreConfig::default())
        .await
        .expect("in-memory sqlite");
    store.migrate().await.expect("migrate");
    Arc::new(store)
}

/// Store whose every call fails, for exercising the degrade paths
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

fn unavailable<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("injected failure".to_string()))
}

#[async_trait]
impl RowStore for FailingStore {
    async fn migrate(&self) -> Result<(), StoreError> {
        unavailable()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        unavailable()
    }

    async fn close(&self) {}

    fn is_closed(&self) -> bool {
        false
    }

    async fn get_entry(&self, _key: &str) -> Result<Option<CacheEntryRow>, StoreError> {
        unavailable()
    }

    async fn upsert_entry(&self, _row: &CacheEntryRow) -> Result<(), StoreError> {
        unavailable()
    }

    async fn touch_entry(&self, _key: &str, _accessed_at: i64) -> Result<bool, StoreError> {
        unavailable()
    }

    async fn delete_entry(&self, _key: &str) -> Result<bool, StoreError> {
        unavailable()
    }

    async fn delete_entries_with_prefix(&self, _prefix: &str) -> Result<u64, StoreError> {
        unavailable()
    }

    async fn clear_entries(&self) -> Result<u64, StoreError> {
        unavailable()
    }

    async fn entry_totals(&self, _live_at: Option<i64>) -> Result<EntryTotals, StoreError> {
        unavailable()
    }

    async fn delete_expired_entries(&self, _now: i64) -> Result<u64, StoreError> {
        unavailable()
    }

    async fn eviction_candidates(
        &self,
        _order: VictimOrder,
        _now: i64,
        _limit: u64,
    ) -> Result<Vec<String>, StoreError> {
        unavailable()
    }

    async fn get_transaction(&self, _signature: &str) -> Result<Option<TransactionRow>, StoreError> {
        unavailable()
    }

    async fn upsert_transaction(&self, _row: &TransactionRow) -> Result<(), StoreError> {
        unavailable()
    }

    async fn get_block(&self, _slot: i64) -> Result<Option<BlockRow>, StoreError> {
        unavailable()
    }

    async fn upsert_block(&self, _row: &BlockRow) -> Result<(), StoreError> {
        unavailable()
    }

    async fn get_account(&self, _address: &str) -> Result<Option<AccountRow>, StoreError> {
        unavailable()
    }

    async fn upsert_account(&self, _row: &AccountRow) -> Result<(), StoreError> {
        unavailable()
    }

    async fn get_token(&self, _mint: &str) -> Result<Option<TokenRow>, StoreError> {
        unavailable()
    }

    async fn upsert_token(&self, _row: &TokenRow) -> Result<(), StoreError> {
        unavailable()
    }

    async fn delete_domain_row(
        &self,
        _table: DomainTable,
        _key: DomainKey<'_>,
    ) -> Result<bool, StoreError> {
        unavailable()
    }

    async fn purge_expired_domain_rows(
        &self,
        _table: DomainTable,
        _now: i64,
    ) -> Result<u64, StoreError> {
        unavailable()
    }

    async fn clear_domain_table(&self, _table: DomainTable) -> Result<u64, StoreError> {
        unavailable()
    }
}

/// Wraps a working store and fails `delete_entry` for one key only
#[derive(Debug)]
pub struct FailDeleteStore {
    inner: Arc<dyn RowStore>,
    fail_key: String,
}

impl FailDeleteStore {
    pub fn new(inner: Arc<dyn RowStore>, fail_key: impl Into<String>) -> Self {
        Self {
            inner,
            fail_key: fail_key.into(),
        }
    }
}

#[async_trait]
impl RowStore for FailDeleteStore {
    async fn migrate(&self) -> Result<(), StoreError> {
        self.inner.migrate().await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    async fn close(&self) {
        self.inner.close().await
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntryRow>, StoreError> {
        self.inner.get_entry(key).await
    }

    async fn upsert_entry(&self, row: &CacheEntryRow) -> Result<(), StoreError> {
        self.inner.upsert_entry(row).await
    }

    async fn touch_entry(&self, key: &str, accessed_at: i64) -> Result<bool, StoreError> {
        self.inner.touch_entry(key, accessed_at).await
    }

    async fn delete_entry(&self, key: &str) -> Result<bool, StoreError> {
        if key == self.fail_key {
            return unavailable();
        }
        self.inner.delete_entry(key).await
    }

    async fn delete_entries_with_prefix(&self, prefix: &str) -> Result<u64, StoreError> {
        self.inner.delete_entries_with_prefix(prefix).await
    }

    async fn clear_entries(&self) -> Result<u64, StoreError> {
        self.inner.clear_entries().await
    }

    async fn entry_totals(&self, live_at: Option<i64>) -> Result<EntryTotals, StoreError> {
        self.inner.entry_totals(live_at).await
    }

    async fn delete_expired_entries(&self, now: i64) -> Result<u64, StoreError> {
        self.inner.delete_expired_entries(now).await
    }

    async fn eviction_candidates(
        &self,
        order: VictimOrder,
        now: i64,
        limit: u64,
    ) -> Result<Vec<String>, StoreError> {
        self.inner.eviction_candidates(order, now, limit).await
    }

    async fn get_transaction(&self, signature: &str) -> Result<Option<TransactionRow>, StoreError> {
        self.inner.get_transaction(signature).await
    }

    async fn upsert_transaction(&self, row: &TransactionRow) -> Result<(), StoreError> {
        self.inner.upsert_transaction(row).await
    }

    async fn get_block(&self, slot: i64) -> Result<Option<BlockRow>, StoreError> {
        self.inner.get_block(slot).await
    }

    async fn upsert_block(&self, row: &BlockRow) -> Result<(), StoreError> {
        self.inner.upsert_block(row).await
    }

    async fn get_account(&self, address: &str) -> Result<Option<AccountRow>, StoreError> {
        self.inner.get_account(address).await
    }

    async fn upsert_account(&self, row: &AccountRow) -> Result<(), StoreError> {
        self.inner.upsert_account(row).await
    }

    async fn get_token(&self, mint: &str) -> Result<Option<TokenRow>, StoreError> {
        self.inner.get_token(mint).await
    }

    async fn upsert_token(&self, row: &TokenRow) -> Result<(), StoreError> {
        self.inner.upsert_token(row).await
    }

    async fn delete_domain_row(
        &self,
        table: DomainTable,
        key: DomainKey<'_>,
    ) -> Result<bool, StoreError> {
        self.inner.delete_domain_row(table, key).await
    }

    async fn purge_expired_domain_rows(
        &self,
        table: DomainTable,
        now: i64,
    ) -> Result<u64, StoreError> {
        self.inner.purge_expired_domain_rows(table, now).await
    }

    async fn clear_domain_table(&self, table: DomainTable) -> Result<u64, StoreError> {
        self.inner.clear_domain_table(table).await
    }
}
