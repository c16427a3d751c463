//! Error types for cache operations
//!
//! Every fallible cache operation returns `CacheError` from its `try_*` form.
//! The public non-`try` forms log these and degrade to a miss or a no-op.

use row_store::StoreError;
use thiserror::Error;

/// Cache system errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Compression error: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Payload is compressed but no compression codec is available")]
    CompressionUnavailable,

    #[error("Value out of range: {0}")]
    Conversion(String),

    #[error("Cache is closed")]
    Closed,
}

impl CacheError {
    /// Storage-side failures, as opposed to bad payloads
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, CacheError::Storage(_) | CacheError::Closed)
    }
}
