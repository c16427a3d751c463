//! Error types for the LedgerCache crate
//!
//! Only lifecycle operations report errors. Everything else on `LedgerCache`
//! degrades to a miss or a no-op and logs instead.

use cache_system::CacheError;
use config::ConfigError;
use row_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerCacheError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Row store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Cache is not initialized")]
    NotInitialized,
}
