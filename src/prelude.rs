//! Convenience re-exports for common LedgerCache usage
//!
//! # Example
//!
//! ```rust
//! use ledgercache::prelude::*;
//!
//! let cache = LedgerCache::new(AppConfig::default());
//! # let _ = cache;
//! ```

// Core LedgerCache components
pub use crate::core::LedgerCache;
pub use crate::errors::LedgerCacheError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, EvictionPolicy, StoreConfig};

// Re-export cache system
pub use cache_system::prelude::*;

// Row store seam for custom backends
pub use row_store::{RowStore, SqliteRowStore, StoreError};

// Common external dependencies
pub use async_trait;
pub use sqlx;
pub use tokio;
