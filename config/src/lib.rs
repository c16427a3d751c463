//! # Configuration Management for LedgerCache
//!
//! This crate provides centralized configuration structures for the cache engine
//! and the persistent row store it writes through.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{CacheConfig, EvictionPolicy, StoreConfig};
//!
//! let cache_config = CacheConfig::new(
//!     50 * 1024 * 1024, // max_size_bytes
//!     10_000,           // max_entries
//!     1800,             // default_ttl_seconds
//!     true,             // enable_compression
//!     EvictionPolicy::Lru,
//! );
//!
//! let store_config = StoreConfig::new("sqlite://explorer-cache.db".to_string(), 4);
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [cache]
//! max_size_bytes = 52428800
//! max_entries = 10000
//! default_ttl_seconds = 1800
//! enable_compression = true
//! compression_threshold_bytes = 1024
//! eviction_policy = "lru"
//! sweep_interval_seconds = 300
//!
//! [store]
//! database_url = "sqlite://explorer-cache.db"
//! max_connections = 4
//! acquire_timeout_seconds = 5
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from LEDGERCACHE_CONFIG, ./ledgercache.toml, or defaults
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./ledgercache.toml";
const CONFIG_PATH_VAR: &str = "LEDGERCACHE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Victim ordering used when the cache has to release space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently accessed entries go first
    #[default]
    Lru,
    /// Fewest hits go first, ties broken by access time
    Lfu,
    /// Already expired entries go first, then the oldest created
    Ttl,
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Cache engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_size_bytes: u64,
    pub max_entries: u64,
    pub default_ttl_seconds: u64,
    pub enable_compression: bool,
    /// Serialized payloads strictly larger than this are compressed
    pub compression_threshold_bytes: usize,
    pub eviction_policy: EvictionPolicy,
    pub sweep_interval_seconds: u64,
}

/// Persistent row store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl AppConfig {
    /// Load configuration from the TOML file named in the environment, the default
    /// path, or fall back to built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is not an error
        let _ = dotenvy::dotenv();

        let config = if let Ok(config_path) = env::var(CONFIG_PATH_VAR) {
            Self::from_file(&config_path)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.store.validate()
    }
}

impl CacheConfig {
    /// Create a new cache configuration
    pub fn new(
        max_size_bytes: u64,
        max_entries: u64,
        default_ttl_seconds: u64,
        enable_compression: bool,
        eviction_policy: EvictionPolicy,
    ) -> Self {
        Self {
            max_size_bytes,
            max_entries,
            default_ttl_seconds,
            enable_compression,
            eviction_policy,
            ..Self::default()
        }
    }

    pub fn with_compression_threshold(mut self, threshold_bytes: usize) -> Self {
        self.compression_threshold_bytes = threshold_bytes;
        self
    }

    pub fn with_sweep_interval(mut self, seconds: u64) -> Self {
        self.sweep_interval_seconds = seconds;
        self
    }

    /// Get default TTL as Duration
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size_bytes == 0 {
            return Err(ConfigError::Invalid(
                "Cache max_size_bytes must be greater than 0".to_string(),
            ));
        }
        if self.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "Cache max_entries must be greater than 0".to_string(),
            ));
        }
        if self.default_ttl_seconds == 0 {
            return Err(ConfigError::Invalid(
                "Cache default_ttl_seconds must be greater than 0".to_string(),
            ));
        }
        if self.sweep_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "Cache sweep_interval_seconds must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 50 * 1024 * 1024,
            max_entries: 10_000,
            default_ttl_seconds: 30 * 60,
            enable_compression: true,
            compression_threshold_bytes: 1024,
            eviction_policy: EvictionPolicy::Lru,
            sweep_interval_seconds: 5 * 60,
        }
    }
}

impl StoreConfig {
    /// Create a new store configuration
    pub fn new(database_url: String, max_connections: u32) -> Self {
        Self {
            database_url,
            max_connections,
            ..Self::default()
        }
    }

    /// In-memory SQLite databases exist per connection
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.is_empty() {
            return Err(ConfigError::Invalid(
                "Store database_url cannot be empty".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "Store max_connections must be greater than 0".to_string(),
            ));
        }
        if self.acquire_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "Store acquire_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 4,
            acquire_timeout_seconds: 5,
        }
    }
}
