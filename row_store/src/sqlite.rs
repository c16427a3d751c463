//! SQLite-backed row store
//!
//! All statements are static SQL with `?` parameters. Table and column names
//! only ever come from `schema`.

use crate::errors::StoreError;
use crate::rows::{AccountRow, BlockRow, CacheEntryRow, EntryTotals, TokenRow, TransactionRow};
use crate::schema::{self, DomainKey, DomainTable, VictimOrder};
use crate::traits::RowStore;
use async_trait::async_trait;
use config::StoreConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

const ENTRY_COLUMNS: &str =
    "key, payload, compressed, created_at, last_accessed, ttl_ms, size_bytes, hit_count";

const TOTALS_ALL_SQL: &str = "SELECT COUNT(*) AS entry_count, \
     COALESCE(SUM(size_bytes), 0) AS total_size_bytes, \
     MIN(created_at) AS oldest_created_at, \
     MAX(created_at) AS newest_created_at \
     FROM cache_entries";

const TOTALS_LIVE_SQL: &str = "SELECT COUNT(*) AS entry_count, \
     COALESCE(SUM(size_bytes), 0) AS total_size_bytes, \
     MIN(created_at) AS oldest_created_at, \
     MAX(created_at) AS newest_created_at \
     FROM cache_entries WHERE created_at + ttl_ms >= ?";

/// Row store over an sqlx SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteRowStore {
    pool: SqlitePool,
}

impl SqliteRowStore {
    /// Open the pool described by `config`
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let options =
            SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(config.acquire_timeout());

        // Each in-memory connection is its own database, keep exactly one alive
        if config.is_in_memory() {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            pool_options = pool_options.max_connections(config.max_connections);
        }

        let pool = pool_options.connect_with(options).await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RowStore for SqliteRowStore {
    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in schema::migration_statements() {
            trace_log!(sql = statement, "running migration statement");
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntryRow>, StoreError> {
        let sql = format!("SELECT {} FROM cache_entries WHERE key = ?", ENTRY_COLUMNS);
        let row = sqlx::query_as::<_, CacheEntryRow>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn upsert_entry(&self, row: &CacheEntryRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO cache_entries \
             (key, payload, compressed, created_at, last_accessed, ttl_ms, size_bytes, hit_count) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET \
             payload = excluded.payload, \
             compressed = excluded.compressed, \
             created_at = excluded.created_at, \
             last_accessed = excluded.last_accessed, \
             ttl_ms = excluded.ttl_ms, \
             size_bytes = excluded.size_bytes, \
             hit_count = excluded.hit_count",
        )
        .bind(&row.key)
        .bind(&row.payload)
        .bind(row.compressed)
        .bind(row.created_at)
        .bind(row.last_accessed)
        .bind(row.ttl_ms)
        .bind(row.size_bytes)
        .bind(row.hit_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn touch_entry(&self, key: &str, accessed_at: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE cache_entries SET last_accessed = ?, hit_count = hit_count + 1 WHERE key = ?",
        )
        .bind(accessed_at)
        .bind(key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_entry(&self, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_entries_with_prefix(&self, prefix: &str) -> Result<u64, StoreError> {
        // LIKE folds ASCII case, and base58 keys differ by case alone
        let result = sqlx::query("DELETE FROM cache_entries WHERE substr(key, 1, length(?)) = ?")
            .bind(prefix)
            .bind(prefix)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn clear_entries(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM cache_entries")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn entry_totals(&self, live_at: Option<i64>) -> Result<EntryTotals, StoreError> {
        let totals = match live_at {
            Some(now) => {
                sqlx::query_as::<_, EntryTotals>(TOTALS_LIVE_SQL)
                    .bind(now)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, EntryTotals>(TOTALS_ALL_SQL)
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(totals)
    }

    async fn delete_expired_entries(&self, now: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE created_at + ttl_ms < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn eviction_candidates(
        &self,
        order: VictimOrder,
        now: i64,
        limit: u64,
    ) -> Result<Vec<String>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let query = sqlx::query_scalar::<_, String>(schema::victim_query(order));
        let query = match order {
            VictimOrder::ExpiredThenOldest => query.bind(now).bind(limit),
            VictimOrder::LeastRecentlyUsed | VictimOrder::LeastFrequentlyUsed => query.bind(limit),
        };
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionRow>, StoreError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT signature, slot, block_time, fee, success, data, cached_at, ttl_ms \
             FROM cached_transactions WHERE signature = ?",
        )
        .bind(signature)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert_transaction(&self, row: &TransactionRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO cached_transactions \
             (signature, slot, block_time, fee, success, data, cached_at, ttl_ms) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.signature)
        .bind(row.slot)
        .bind(row.block_time)
        .bind(row.fee)
        .bind(row.success)
        .bind(&row.data)
        .bind(row.cached_at)
        .bind(row.ttl_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_block(&self, slot: i64) -> Result<Option<BlockRow>, StoreError> {
        let row = sqlx::query_as::<_, BlockRow>(
            "SELECT slot, blockhash, parent_slot, block_time, transaction_count, data, cached_at, ttl_ms \
             FROM cached_blocks WHERE slot = ?",
        )
        .bind(slot)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert_block(&self, row: &BlockRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO cached_blocks \
             (slot, blockhash, parent_slot, block_time, transaction_count, data, cached_at, ttl_ms) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.slot)
        .bind(&row.blockhash)
        .bind(row.parent_slot)
        .bind(row.block_time)
        .bind(row.transaction_count)
        .bind(&row.data)
        .bind(row.cached_at)
        .bind(row.ttl_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_account(&self, address: &str) -> Result<Option<AccountRow>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT address, lamports, owner, executable, data, cached_at, ttl_ms \
             FROM cached_accounts WHERE address = ?",
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert_account(&self, row: &AccountRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO cached_accounts \
             (address, lamports, owner, executable, data, cached_at, ttl_ms) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.address)
        .bind(row.lamports)
        .bind(&row.owner)
        .bind(row.executable)
        .bind(&row.data)
        .bind(row.cached_at)
        .bind(row.ttl_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_token(&self, mint: &str) -> Result<Option<TokenRow>, StoreError> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT mint, symbol, name, decimals, supply, data, cached_at, ttl_ms \
             FROM cached_tokens WHERE mint = ?",
        )
        .bind(mint)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert_token(&self, row: &TokenRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO cached_tokens \
             (mint, symbol, name, decimals, supply, data, cached_at, ttl_ms) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.mint)
        .bind(&row.symbol)
        .bind(&row.name)
        .bind(row.decimals)
        .bind(&row.supply)
        .bind(&row.data)
        .bind(row.cached_at)
        .bind(row.ttl_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_domain_row(
        &self,
        table: DomainTable,
        key: DomainKey<'_>,
    ) -> Result<bool, StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            table.table_name(),
            table.key_column()
        );
        let query = sqlx::query(&sql);
        let query = match key {
            DomainKey::Text(text) => query.bind(text),
            DomainKey::Slot(slot) => query.bind(slot),
        };
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_domain_rows(
        &self,
        table: DomainTable,
        now: i64,
    ) -> Result<u64, StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE cached_at + ttl_ms < ?",
            table.table_name()
        );
        let result = sqlx::query(&sql).bind(now).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn clear_domain_table(&self, table: DomainTable) -> Result<u64, StoreError> {
        let sql = format!("DELETE FROM {}", table.table_name());
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteRowStore {
        let store = SqliteRowStore::connect(&StoreConfig::default())
            .await
            .expect("in-memory store");
        store.migrate().await.expect("migrate");
        store
    }

    fn entry(key: &str, created_at: i64, last_accessed: i64, hit_count: i64) -> CacheEntryRow {
        CacheEntryRow {
            key: key.to_string(),
            payload: key.as_bytes().to_vec(),
            compressed: false,
            created_at,
            last_accessed,
            ttl_ms: 1_000,
            size_bytes: key.len() as i64,
            hit_count,
        }
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let store = memory_store().await;
        store.migrate().await.unwrap();
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_replaces_row() {
        let store = memory_store().await;
        store.upsert_entry(&entry("a", 0, 0, 0)).await.unwrap();

        let mut replacement = entry("a", 10, 10, 0);
        replacement.payload = b"second".to_vec();
        store.upsert_entry(&replacement).await.unwrap();

        let totals = store.entry_totals(None).await.unwrap();
        assert_eq!(totals.entry_count, 1);
        let row = store.get_entry("a").await.unwrap().unwrap();
        assert_eq!(row.payload, b"second".to_vec());
        assert_eq!(row.created_at, 10);
    }

    #[tokio::test]
    async fn test_touch_updates_access() {
        let store = memory_store().await;
        store.upsert_entry(&entry("a", 0, 0, 0)).await.unwrap();

        assert!(store.touch_entry("a", 50).await.unwrap());
        assert!(!store.touch_entry("missing", 50).await.unwrap());

        let row = store.get_entry("a").await.unwrap().unwrap();
        assert_eq!(row.last_accessed, 50);
        assert_eq!(row.hit_count, 1);
    }

    #[tokio::test]
    async fn test_totals_live_filter() {
        let store = memory_store().await;
        store.upsert_entry(&entry("old", 0, 0, 0)).await.unwrap();
        store.upsert_entry(&entry("new", 5_000, 5_000, 0)).await.unwrap();

        let all = store.entry_totals(None).await.unwrap();
        assert_eq!(all.entry_count, 2);
        assert_eq!(all.oldest_created_at, Some(0));
        assert_eq!(all.newest_created_at, Some(5_000));

        let live = store.entry_totals(Some(5_500)).await.unwrap();
        assert_eq!(live.entry_count, 1);
        assert_eq!(live.total_size_bytes, 3);
    }

    #[tokio::test]
    async fn test_empty_totals() {
        let store = memory_store().await;
        let totals = store.entry_totals(None).await.unwrap();
        assert_eq!(totals, EntryTotals::default());
    }

    #[tokio::test]
    async fn test_delete_expired_entries() {
        let store = memory_store().await;
        store.upsert_entry(&entry("old", 0, 0, 0)).await.unwrap();
        store.upsert_entry(&entry("new", 5_000, 5_000, 0)).await.unwrap();

        assert_eq!(store.delete_expired_entries(1_000).await.unwrap(), 0);
        assert_eq!(store.delete_expired_entries(1_001).await.unwrap(), 1);
        assert!(store.get_entry("old").await.unwrap().is_none());
        assert!(store.get_entry("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_victim_orders() {
        let store = memory_store().await;
        store.upsert_entry(&entry("a", 300, 100, 5)).await.unwrap();
        store.upsert_entry(&entry("b", 200, 300, 1)).await.unwrap();
        store.upsert_entry(&entry("c", 100, 200, 1)).await.unwrap();

        let lru = store
            .eviction_candidates(VictimOrder::LeastRecentlyUsed, 0, 3)
            .await
            .unwrap();
        assert_eq!(lru, vec!["a", "c", "b"]);

        let lfu = store
            .eviction_candidates(VictimOrder::LeastFrequentlyUsed, 0, 2)
            .await
            .unwrap();
        assert_eq!(lfu, vec!["c", "b"]);

        // only "c" (created 100, ttl 1000) is expired at 1_200
        let ttl = store
            .eviction_candidates(VictimOrder::ExpiredThenOldest, 1_200, 2)
            .await
            .unwrap();
        assert_eq!(ttl, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_prefix_delete_is_literal() {
        let store = memory_store().await;
        store.upsert_entry(&entry("net:tps", 0, 0, 0)).await.unwrap();
        store.upsert_entry(&entry("net:slot", 0, 0, 0)).await.unwrap();
        store.upsert_entry(&entry("network", 0, 0, 0)).await.unwrap();
        store.upsert_entry(&entry("a_b", 0, 0, 0)).await.unwrap();
        store.upsert_entry(&entry("axb", 0, 0, 0)).await.unwrap();

        assert_eq!(store.delete_entries_with_prefix("net:").await.unwrap(), 2);
        assert_eq!(store.delete_entries_with_prefix("a_").await.unwrap(), 1);
        assert!(store.get_entry("network").await.unwrap().is_some());
        assert!(store.get_entry("axb").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_prefix_delete_is_case_sensitive() {
        let store = memory_store().await;
        store.upsert_entry(&entry("account:ABCdef", 0, 0, 0)).await.unwrap();
        store.upsert_entry(&entry("account:abcDEF", 0, 0, 0)).await.unwrap();

        assert_eq!(store.delete_entries_with_prefix("account:ABC").await.unwrap(), 1);
        assert!(store.get_entry("account:ABCdef").await.unwrap().is_none());
        assert!(store.get_entry("account:abcDEF").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_domain_rows_round_trip() {
        let store = memory_store().await;
        let block = BlockRow {
            slot: 250_000_000,
            blockhash: "hash".to_string(),
            parent_slot: 249_999_999,
            block_time: Some(1_700_000_000),
            transaction_count: 1_200,
            data: "{}".to_string(),
            cached_at: 0,
            ttl_ms: 1_000,
        };
        store.upsert_block(&block).await.unwrap();
        assert_eq!(store.get_block(250_000_000).await.unwrap(), Some(block));

        assert_eq!(
            store
                .purge_expired_domain_rows(DomainTable::Blocks, 1_001)
                .await
                .unwrap(),
            1
        );
        assert!(store.get_block(250_000_000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_domain_delete_by_key() {
        let store = memory_store().await;
        let token = TokenRow {
            mint: "So11111111111111111111111111111111111111112".to_string(),
            symbol: Some("SOL".to_string()),
            name: Some("Wrapped SOL".to_string()),
            decimals: 9,
            supply: None,
            data: "{}".to_string(),
            cached_at: 0,
            ttl_ms: 3_600_000,
        };
        store.upsert_token(&token).await.unwrap();

        let deleted = store
            .delete_domain_row(DomainTable::Tokens, DomainKey::Text(&token.mint))
            .await
            .unwrap();
        assert!(deleted);
        assert!(store.get_token(&token.mint).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_closed_store_reports_closed() {
        let store = memory_store().await;
        store.close().await;
        assert!(store.is_closed());
        assert!(matches!(store.get_entry("a").await, Err(StoreError::Closed)));
    }
}
