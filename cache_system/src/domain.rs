//! Structured domain caches
//!
//! Transactions, blocks, accounts and tokens each live in their own table with
//! their own primary key, so they can never collide with a generic string key.
//! Every row carries the TTL it was written with; when the caller does not pick
//! one, the domain's own default applies rather than the generic `default_ttl`.

use crate::clock::{Clock, duration_to_millis};
use crate::errors::CacheError;
use crate::manager::CacheManager;
use async_trait::async_trait;
use config::CacheConfig;
use row_store::{
    AccountRow, BlockRow, DomainKey, DomainRow, DomainTable, RowStore, TokenRow, TransactionRow,
};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Balances move constantly
pub const ACCOUNT_TTL: Duration = Duration::from_secs(5 * 60);
/// Token metadata almost never changes
pub const TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub fee: u64,
    pub success: bool,
    /// Instructions, balances, logs and anything else the explorer renders
    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub slot: u64,
    pub blockhash: String,
    pub parent_slot: u64,
    pub block_time: Option<i64>,
    pub transaction_count: u64,
    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub address: String,
    pub lamports: u64,
    pub owner: String,
    pub executable: bool,
    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub mint: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub decimals: u8,
    pub supply: Option<u64>,
    #[serde(default)]
    pub details: serde_json::Value,
}

fn to_i64(value: u64, field: &str) -> Result<i64, CacheError> {
    i64::try_from(value).map_err(|_| CacheError::Conversion(format!("{} {}", field, value)))
}

fn to_u64(value: i64, field: &str) -> Result<u64, CacheError> {
    u64::try_from(value).map_err(|_| CacheError::Conversion(format!("{} {}", field, value)))
}

fn key_mismatch(field: &str, own: impl Display, key: impl Display) -> CacheError {
    CacheError::Conversion(format!("{} {} does not match key {}", field, own, key))
}

/// Binds a record type to its table, key shape and row conversion
#[async_trait]
pub trait DomainRecord: Sized + Send + Sync + 'static {
    type Key: ?Sized + Sync + Display;
    type Row: DomainRow + Send + Sync;

    const TABLE: DomainTable;

    fn domain_key(key: &Self::Key) -> Result<DomainKey<'_>, CacheError>;

    /// Fails with `Conversion` when the record's own key field differs from `key`
    fn to_row(&self, key: &Self::Key, cached_at: i64, ttl_ms: i64)
        -> Result<Self::Row, CacheError>;

    fn from_row(row: Self::Row) -> Result<Self, CacheError>;

    async fn fetch(store: &dyn RowStore, key: &Self::Key)
        -> Result<Option<Self::Row>, CacheError>;

    async fn write(store: &dyn RowStore, row: &Self::Row) -> Result<(), CacheError>;
}

#[async_trait]
impl DomainRecord for TransactionRecord {
    type Key = str;
    type Row = TransactionRow;

    const TABLE: DomainTable = DomainTable::Transactions;

    fn domain_key(key: &str) -> Result<DomainKey<'_>, CacheError> {
        Ok(DomainKey::Text(key))
    }

    fn to_row(&self, key: &str, cached_at: i64, ttl_ms: i64) -> Result<TransactionRow, CacheError> {
        if self.signature != key {
            return Err(key_mismatch("signature", &self.signature, key));
        }
        Ok(TransactionRow {
            signature: self.signature.clone(),
            slot: to_i64(self.slot, "slot")?,
            block_time: self.block_time,
            fee: to_i64(self.fee, "fee")?,
            success: self.success,
            data: serde_json::to_string(&self.details)?,
            cached_at,
            ttl_ms,
        })
    }

    fn from_row(row: TransactionRow) -> Result<Self, CacheError> {
        Ok(Self {
            slot: to_u64(row.slot, "slot")?,
            fee: to_u64(row.fee, "fee")?,
            details: serde_json::from_str(&row.data)?,
            signature: row.signature,
            block_time: row.block_time,
            success: row.success,
        })
    }

    async fn fetch(store: &dyn RowStore, key: &str) -> Result<Option<TransactionRow>, CacheError> {
        Ok(store.get_transaction(key).await?)
    }

    async fn write(store: &dyn RowStore, row: &TransactionRow) -> Result<(), CacheError> {
        Ok(store.upsert_transaction(row).await?)
    }
}

#[async_trait]
impl DomainRecord for BlockRecord {
    type Key = u64;
    type Row = BlockRow;

    const TABLE: DomainTable = DomainTable::Blocks;

    fn domain_key(key: &u64) -> Result<DomainKey<'_>, CacheError> {
        Ok(DomainKey::Slot(to_i64(*key, "slot")?))
    }

    fn to_row(&self, key: &u64, cached_at: i64, ttl_ms: i64) -> Result<BlockRow, CacheError> {
        if self.slot != *key {
            return Err(key_mismatch("slot", self.slot, key));
        }
        Ok(BlockRow {
            slot: to_i64(*key, "slot")?,
            blockhash: self.blockhash.clone(),
            parent_slot: to_i64(self.parent_slot, "parent_slot")?,
            block_time: self.block_time,
            transaction_count: to_i64(self.transaction_count, "transaction_count")?,
            data: serde_json::to_string(&self.details)?,
            cached_at,
            ttl_ms,
        })
    }

    fn from_row(row: BlockRow) -> Result<Self, CacheError> {
        Ok(Self {
            slot: to_u64(row.slot, "slot")?,
            parent_slot: to_u64(row.parent_slot, "parent_slot")?,
            transaction_count: to_u64(row.transaction_count, "transaction_count")?,
            details: serde_json::from_str(&row.data)?,
            blockhash: row.blockhash,
            block_time: row.block_time,
        })
    }

    async fn fetch(store: &dyn RowStore, key: &u64) -> Result<Option<BlockRow>, CacheError> {
        Ok(store.get_block(to_i64(*key, "slot")?).await?)
    }

    async fn write(store: &dyn RowStore, row: &BlockRow) -> Result<(), CacheError> {
        Ok(store.upsert_block(row).await?)
    }
}

#[async_trait]
impl DomainRecord for AccountRecord {
    type Key = str;
    type Row = AccountRow;

    const TABLE: DomainTable = DomainTable::Accounts;

    fn domain_key(key: &str) -> Result<DomainKey<'_>, CacheError> {
        Ok(DomainKey::Text(key))
    }

    fn to_row(&self, key: &str, cached_at: i64, ttl_ms: i64) -> Result<AccountRow, CacheError> {
        if self.address != key {
            return Err(key_mismatch("address", &self.address, key));
        }
        Ok(AccountRow {
            address: self.address.clone(),
            lamports: to_i64(self.lamports, "lamports")?,
            owner: self.owner.clone(),
            executable: self.executable,
            data: serde_json::to_string(&self.details)?,
            cached_at,
            ttl_ms,
        })
    }

    fn from_row(row: AccountRow) -> Result<Self, CacheError> {
        Ok(Self {
            lamports: to_u64(row.lamports, "lamports")?,
            details: serde_json::from_str(&row.data)?,
            address: row.address,
            owner: row.owner,
            executable: row.executable,
        })
    }

    async fn fetch(store: &dyn RowStore, key: &str) -> Result<Option<AccountRow>, CacheError> {
        Ok(store.get_account(key).await?)
    }

    async fn write(store: &dyn RowStore, row: &AccountRow) -> Result<(), CacheError> {
        Ok(store.upsert_account(row).await?)
    }
}

#[async_trait]
impl DomainRecord for TokenRecord {
    type Key = str;
    type Row = TokenRow;

    const TABLE: DomainTable = DomainTable::Tokens;

    fn domain_key(key: &str) -> Result<DomainKey<'_>, CacheError> {
        Ok(DomainKey::Text(key))
    }

    fn to_row(&self, key: &str, cached_at: i64, ttl_ms: i64) -> Result<TokenRow, CacheError> {
        if self.mint != key {
            return Err(key_mismatch("mint", &self.mint, key));
        }
        Ok(TokenRow {
            mint: self.mint.clone(),
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            decimals: i64::from(self.decimals),
            supply: self.supply.map(|supply| supply.to_string()),
            data: serde_json::to_string(&self.details)?,
            cached_at,
            ttl_ms,
        })
    }

    fn from_row(row: TokenRow) -> Result<Self, CacheError> {
        let decimals = u8::try_from(row.decimals)
            .map_err(|_| CacheError::Conversion(format!("decimals {}", row.decimals)))?;
        let supply = row
            .supply
            .as_deref()
            .map(|supply| {
                supply
                    .parse::<u64>()
                    .map_err(|_| CacheError::Conversion(format!("supply {}", supply)))
            })
            .transpose()?;

        Ok(Self {
            decimals,
            supply,
            details: serde_json::from_str(&row.data)?,
            mint: row.mint,
            symbol: row.symbol,
            name: row.name,
        })
    }

    async fn fetch(store: &dyn RowStore, key: &str) -> Result<Option<TokenRow>, CacheError> {
        Ok(store.get_token(key).await?)
    }

    async fn write(store: &dyn RowStore, row: &TokenRow) -> Result<(), CacheError> {
        Ok(store.upsert_token(row).await?)
    }
}

/// One structured key space with its own default TTL
pub struct DomainCache<R: DomainRecord> {
    store: Arc<dyn RowStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    closed: Arc<AtomicBool>,
    _record: PhantomData<fn() -> R>,
}

impl<R: DomainRecord> Clone for DomainCache<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            ttl: self.ttl,
            closed: Arc::clone(&self.closed),
            _record: PhantomData,
        }
    }
}

impl<R: DomainRecord> Debug for DomainCache<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainCache")
            .field("table", &R::TABLE.table_name())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<R: DomainRecord> DomainCache<R> {
    pub fn new(
        store: Arc<dyn RowStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            clock,
            ttl,
            closed,
            _record: PhantomData,
        }
    }

    /// Default TTL applied when a write does not name one
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn table(&self) -> DomainTable {
        R::TABLE
    }

    fn ensure_open(&self) -> Result<(), CacheError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }

    pub async fn try_get(&self, key: &R::Key) -> Result<Option<R>, CacheError> {
        self.ensure_open()?;
        let now = self.clock.now_millis();
        match R::fetch(self.store.as_ref(), key).await? {
            Some(row) if !row.is_expired(now) => Ok(Some(R::from_row(row)?)),
            _ => Ok(None),
        }
    }

    pub async fn get(&self, key: &R::Key) -> Option<R> {
        match self.try_get(key).await {
            Ok(record) => {
                debug_log!(table = R::TABLE.table_name(), key = %key, hit = record.is_some(), "domain lookup");
                record
            }
            Err(err) => {
                tracing::warn!(
                    table = R::TABLE.table_name(),
                    key = %key,
                    error = %err,
                    "domain cache read failed, treating as miss"
                );
                None
            }
        }
    }

    pub async fn try_set(
        &self,
        key: &R::Key,
        record: &R,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.ensure_open()?;
        let ttl_ms = duration_to_millis(ttl.unwrap_or(self.ttl));
        let row = record.to_row(key, self.clock.now_millis(), ttl_ms)?;
        R::write(self.store.as_ref(), &row).await
    }

    pub async fn set(&self, key: &R::Key, record: &R) {
        self.set_with_ttl(key, record, None).await;
    }

    pub async fn set_with_ttl(&self, key: &R::Key, record: &R, ttl: Option<Duration>) {
        if let Err(err) = self.try_set(key, record, ttl).await {
            tracing::warn!(
                table = R::TABLE.table_name(),
                key = %key,
                error = %err,
                "domain cache write dropped"
            );
        }
    }

    pub async fn delete(&self, key: &R::Key) -> bool {
        let result = async {
            self.ensure_open()?;
            let domain_key = R::domain_key(key)?;
            Ok::<_, CacheError>(self.store.delete_domain_row(R::TABLE, domain_key).await?)
        }
        .await;

        result.unwrap_or_else(|err| {
            tracing::warn!(table = R::TABLE.table_name(), key = %key, error = %err, "domain cache delete failed");
            false
        })
    }

    /// Physically remove rows past their TTL
    pub async fn purge_expired(&self) -> u64 {
        let result = async {
            self.ensure_open()?;
            Ok::<_, CacheError>(
                self.store
                    .purge_expired_domain_rows(R::TABLE, self.clock.now_millis())
                    .await?,
            )
        }
        .await;

        result.unwrap_or_else(|err| {
            tracing::warn!(table = R::TABLE.table_name(), error = %err, "domain sweep failed");
            0
        })
    }

    pub async fn clear(&self) -> u64 {
        let result = async {
            self.ensure_open()?;
            Ok::<_, CacheError>(self.store.clear_domain_table(R::TABLE).await?)
        }
        .await;

        result.unwrap_or_else(|err| {
            tracing::warn!(table = R::TABLE.table_name(), error = %err, "domain cache clear failed");
            0
        })
    }
}

/// Default TTL per domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainTtls {
    pub transactions: Duration,
    pub blocks: Duration,
    pub accounts: Duration,
    pub tokens: Duration,
}

impl DomainTtls {
    /// Finalized transactions and blocks never change, but keep them bounded by
    /// the generic default so the table cannot grow forever
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            transactions: config.default_ttl(),
            blocks: config.default_ttl(),
            accounts: ACCOUNT_TTL,
            tokens: TOKEN_TTL,
        }
    }
}

/// Rows removed by one domain sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DomainSweep {
    pub transactions: u64,
    pub blocks: u64,
    pub accounts: u64,
    pub tokens: u64,
}

impl DomainSweep {
    pub fn total(&self) -> u64 {
        self.transactions + self.blocks + self.accounts + self.tokens
    }
}

/// The four structured caches sharing one store
#[derive(Debug, Clone)]
pub struct DomainCaches {
    pub transactions: DomainCache<TransactionRecord>,
    pub blocks: DomainCache<BlockRecord>,
    pub accounts: DomainCache<AccountRecord>,
    pub tokens: DomainCache<TokenRecord>,
}

impl DomainCaches {
    pub fn new(
        store: Arc<dyn RowStore>,
        clock: Arc<dyn Clock>,
        ttls: DomainTtls,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            transactions: DomainCache::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                ttls.transactions,
                Arc::clone(&closed),
            ),
            blocks: DomainCache::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                ttls.blocks,
                Arc::clone(&closed),
            ),
            accounts: DomainCache::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                ttls.accounts,
                Arc::clone(&closed),
            ),
            tokens: DomainCache::new(store, clock, ttls.tokens, closed),
        }
    }

    /// Share the manager's store, clock and open/closed state
    pub fn for_manager(manager: &CacheManager) -> Self {
        Self::new(
            Arc::clone(manager.store()),
            Arc::clone(manager.clock()),
            DomainTtls::from_config(manager.config()),
            manager.closed_flag(),
        )
    }

    pub async fn get_transaction(&self, signature: &str) -> Option<TransactionRecord> {
        self.transactions.get(signature).await
    }

    pub async fn set_transaction(&self, signature: &str, record: &TransactionRecord) {
        self.transactions.set(signature, record).await
    }

    pub async fn get_block(&self, slot: u64) -> Option<BlockRecord> {
        self.blocks.get(&slot).await
    }

    pub async fn set_block(&self, slot: u64, record: &BlockRecord) {
        self.blocks.set(&slot, record).await
    }

    pub async fn get_account(&self, address: &str) -> Option<AccountRecord> {
        self.accounts.get(address).await
    }

    pub async fn set_account(&self, address: &str, record: &AccountRecord) {
        self.accounts.set(address, record).await
    }

    pub async fn get_token(&self, mint: &str) -> Option<TokenRecord> {
        self.tokens.get(mint).await
    }

    pub async fn set_token(&self, mint: &str, record: &TokenRecord) {
        self.tokens.set(mint, record).await
    }

    pub async fn sweep_expired(&self) -> DomainSweep {
        DomainSweep {
            transactions: self.transactions.purge_expired().await,
            blocks: self.blocks.purge_expired().await,
            accounts: self.accounts.purge_expired().await,
            tokens: self.tokens.purge_expired().await,
        }
    }

    /// Empty all four tables, returns the number of rows removed
    pub async fn clear(&self) -> u64 {
        self.transactions.clear().await
            + self.blocks.clear().await
            + self.accounts.clear().await
            + self.tokens.clear().await
    }
}
