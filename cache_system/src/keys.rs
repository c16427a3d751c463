//! Cache key building
//!
//! Keys are colon-separated: `namespace:part:part`. The namespace prefix is
//! what `CacheManager::invalidate_prefix` operates on.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: String,
    parts: Vec<String>,
}

impl CacheKey {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            parts: Vec::new(),
        }
    }

    pub fn part(mut self, part: impl fmt::Display) -> Self {
        self.parts.push(part.to_string());
        self
    }

    /// Append a short hash of an arbitrary value, for query parameters and
    /// other inputs too long to embed. Stable within one build only.
    pub fn hashed<T: Hash + ?Sized>(self, value: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        self.part(format_args!("{:x}", hasher.finish()))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `namespace:` prefix matching every key built from this namespace
    pub fn prefix(&self) -> String {
        format!("{}:", self.namespace)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.namespace)?;
        for part in &self.parts {
            write!(f, ":{}", part)?;
        }
        Ok(())
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}
