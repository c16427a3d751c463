//! Convenience re-exports for common cache-system usage

// Core cache system components
pub use crate::domain::{
    AccountRecord, BlockRecord, DomainCache, DomainCaches, TokenRecord, TransactionRecord,
};
pub use crate::errors::CacheError;
pub use crate::keys::CacheKey;
pub use crate::manager::CacheManager;
pub use crate::params::CacheParams;
pub use crate::retrieval::{CacheFirst, cache_first};
pub use crate::stats::CacheStats;
pub use crate::sweeper::{SweepReport, Sweeper};

// Re-export centralized config
pub use config::{CacheConfig, EvictionPolicy};

// Common external dependencies
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;
