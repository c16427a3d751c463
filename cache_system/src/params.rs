//! Cache parameter configuration
//!
//! This module defines the CacheParams struct
//! for configuring a single cache-first call.

use std::time::Duration;

/// Per-call options for `cache_first`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheParams {
    /// TTL for the stored result, `None` uses the target cache's default
    pub ttl: Option<Duration>,
    /// Skip the lookup and always call the loader
    pub force_refresh: bool,
    /// When false, neither read nor write the cache
    pub enabled: bool,
}

impl Default for CacheParams {
    fn default() -> Self {
        Self {
            ttl: None,
            force_refresh: false,
            enabled: true,
        }
    }
}

impl CacheParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether a lookup should be attempted before loading
    pub fn reads_cache(&self) -> bool {
        self.enabled && !self.force_refresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_read_and_write() {
        let params = CacheParams::default();
        assert!(params.enabled);
        assert!(!params.force_refresh);
        assert!(params.reads_cache());
        assert_eq!(params.ttl, None);
    }

    #[test]
    fn test_builders() {
        let params = CacheParams::new()
            .with_ttl(Duration::from_secs(30))
            .force_refresh();
        assert_eq!(params.ttl, Some(Duration::from_secs(30)));
        assert!(params.enabled);
        assert!(!params.reads_cache());
        assert!(!CacheParams::new().disabled().reads_cache());
    }
}
