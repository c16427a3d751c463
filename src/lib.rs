//! # LedgerCache
//!
//! A local analytics cache for a blockchain explorer: a generic key/value
//! cache with TTL, compression and LRU/LFU/TTL eviction, structured caches for
//! transactions, blocks, accounts and tokens, and cache-first retrieval.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ledgercache::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = LedgerCache::new(AppConfig::default());
//!     cache.initialize().await?;
//!
//!     let stats = cache
//!         .cache_first(
//!             "network:stats",
//!             || async { Ok::<_, std::io::Error>(vec![3_412u64, 287_000_000]) },
//!             &CacheParams::default(),
//!         )
//!         .await?;
//!     println!("from cache: {}", stats.from_cache);
//!
//!     cache.destroy().await;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod migration;
pub mod prelude;

// Re-export the main public types for convenience
pub use core::LedgerCache;
pub use errors::LedgerCacheError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, EvictionPolicy, StoreConfig};

// Re-export internal crates used by the public API
pub use cache_system;
pub use row_store;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
