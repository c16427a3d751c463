//! Cache system for the LedgerCache engine
//!
//! This crate provides the generic key/value cache with TTL, compression and
//! pressure-driven eviction, the structured domain caches, cache-first
//! retrieval and the background expiry sweeper.

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

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

pub mod clock;
pub mod compression;
pub mod domain;
pub mod entry;
pub mod errors;
pub mod eviction;
pub mod keys;
pub mod manager;
pub mod params;
pub mod prelude;
pub mod retrieval;
pub mod stats;
pub mod sweeper;

#[cfg(test)]
mod test_support;

// Re-export centralized config
pub use config::{CacheConfig, EvictionPolicy};

pub use clock::{Clock, ManualClock, SystemClock};
pub use compression::Compressor;
pub use domain::{
    ACCOUNT_TTL, AccountRecord, BlockRecord, DomainCache, DomainCaches, DomainRecord, DomainSweep,
    DomainTtls, TOKEN_TTL, TokenRecord, TransactionRecord,
};
pub use entry::CacheEntry;
pub use errors::CacheError;
pub use eviction::{EvictionEngine, EvictionOutcome};
pub use keys::CacheKey;
pub use manager::CacheManager;
pub use params::CacheParams;
pub use retrieval::{CacheFirst, CacheSource, cache_first};
pub use stats::{CacheCounters, CacheStats};
pub use sweeper::{SweepReport, Sweeper, sweep_once};
