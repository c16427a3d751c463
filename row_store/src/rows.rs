//! Typed rows
//!
//! Every table the cache owns has exactly one row struct here. Rows are decoded
//! once at the store boundary; nothing above this crate sees untyped data.
//! All timestamps are Unix milliseconds.

use sqlx::FromRow;

/// Row of the generic `cache_entries` table
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CacheEntryRow {
    pub key: String,
    pub payload: Vec<u8>,
    pub compressed: bool,
    pub created_at: i64,
    pub last_accessed: i64,
    pub ttl_ms: i64,
    pub size_bytes: i64,
    pub hit_count: i64,
}

impl CacheEntryRow {
    pub fn expires_at(&self) -> i64 {
        self.created_at.saturating_add(self.ttl_ms)
    }

    /// An entry is expired once `now` is strictly past `created_at + ttl`
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at()
    }
}

/// Aggregate over `cache_entries`
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct EntryTotals {
    pub entry_count: i64,
    pub total_size_bytes: i64,
    pub oldest_created_at: Option<i64>,
    pub newest_created_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TransactionRow {
    pub signature: String,
    pub slot: i64,
    pub block_time: Option<i64>,
    pub fee: i64,
    pub success: bool,
    /// JSON document with the remaining transaction fields
    pub data: String,
    pub cached_at: i64,
    pub ttl_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct BlockRow {
    pub slot: i64,
    pub blockhash: String,
    pub parent_slot: i64,
    pub block_time: Option<i64>,
    pub transaction_count: i64,
    pub data: String,
    pub cached_at: i64,
    pub ttl_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AccountRow {
    pub address: String,
    pub lamports: i64,
    pub owner: String,
    pub executable: bool,
    pub data: String,
    pub cached_at: i64,
    pub ttl_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TokenRow {
    pub mint: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub decimals: i64,
    /// Raw supply as a decimal string, u64 supplies do not fit an SQLite INTEGER
    pub supply: Option<String>,
    pub data: String,
    pub cached_at: i64,
    pub ttl_ms: i64,
}

/// Expiry bookkeeping shared by the structured rows
pub trait DomainRow {
    fn cached_at(&self) -> i64;
    fn ttl_ms(&self) -> i64;

    fn is_expired(&self, now: i64) -> bool {
        now > self.cached_at().saturating_add(self.ttl_ms())
    }
}

macro_rules! impl_domain_row {
    ($($row:ty),* $(,)?) => {
        $(
            impl DomainRow for $row {
                fn cached_at(&self) -> i64 {
                    self.cached_at
                }

                fn ttl_ms(&self) -> i64 {
                    self.ttl_ms
                }
            }
        )*
    };
}

impl_domain_row!(TransactionRow, BlockRow, AccountRow, TokenRow);
