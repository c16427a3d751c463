//! Convenience re-exports for common row-store usage

pub use crate::errors::StoreError;
pub use crate::rows::{
    AccountRow, BlockRow, CacheEntryRow, DomainRow, EntryTotals, TokenRow, TransactionRow,
};
pub use crate::schema::{DomainKey, DomainTable, VictimOrder};
pub use crate::sqlite::SqliteRowStore;
pub use crate::traits::RowStore;

// Common external dependencies
pub use async_trait::async_trait;
pub use sqlx;
