//! Row Store - persistent storage layer for the LedgerCache engine
//!
//! This crate provides the `RowStore` trait the cache engine writes through,
//! strongly typed rows for every cache table, and an sqlx SQLite implementation.

/// Migration statement tracing, compiled only with the `debug-logging` feature
#[cfg(feature = "debug-logging")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod errors;
pub mod prelude;
pub mod rows;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use errors::StoreError;
pub use rows::{
    AccountRow, BlockRow, CacheEntryRow, DomainRow, EntryTotals, TokenRow, TransactionRow,
};
pub use schema::{DomainKey, DomainTable, VictimOrder};
pub use sqlite::SqliteRowStore;
pub use traits::RowStore;
