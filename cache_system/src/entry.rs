//! Cache entry metadata
//!
//! `CacheEntry` is the engine's view of a `cache_entries` row, with timestamps
//! and TTL in chrono/std types instead of raw milliseconds.

use crate::clock::{duration_to_millis, millis_to_datetime, millis_to_duration};
use chrono::{DateTime, Utc};
use row_store::CacheEntryRow;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub key: String,
    #[serde(skip)]
    pub payload: Vec<u8>,
    pub compressed: bool,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub ttl: Duration,
    /// Size of `payload` as stored, after compression
    pub size_bytes: u64,
    pub hit_count: u64,
}

impl CacheEntry {
    pub fn expires_at(&self) -> DateTime<Utc> {
        millis_to_datetime(
            self.created_at
                .timestamp_millis()
                .saturating_add(duration_to_millis(self.ttl)),
        )
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    /// Time left before expiry, zero once expired
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at() - now).to_std().unwrap_or(Duration::ZERO)
    }
}

impl From<CacheEntryRow> for CacheEntry {
    fn from(row: CacheEntryRow) -> Self {
        Self {
            key: row.key,
            payload: row.payload,
            compressed: row.compressed,
            created_at: millis_to_datetime(row.created_at),
            last_accessed: millis_to_datetime(row.last_accessed),
            ttl: millis_to_duration(row.ttl_ms),
            size_bytes: u64::try_from(row.size_bytes).unwrap_or(0),
            hit_count: u64::try_from(row.hit_count).unwrap_or(0),
        }
    }
}

impl From<CacheEntry> for CacheEntryRow {
    fn from(entry: CacheEntry) -> Self {
        Self {
            key: entry.key,
            payload: entry.payload,
            compressed: entry.compressed,
            created_at: entry.created_at.timestamp_millis(),
            last_accessed: entry.last_accessed.timestamp_millis(),
            ttl_ms: duration_to_millis(entry.ttl),
            size_bytes: i64::try_from(entry.size_bytes).unwrap_or(i64::MAX),
            hit_count: i64::try_from(entry.hit_count).unwrap_or(i64::MAX),
        }
    }
}
