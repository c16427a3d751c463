//! Cache-first retrieval
//!
//! Look the key up, and on a miss call the loader, store what it returns and
//! hand it back. Loader errors reach the caller untouched and nothing is
//! stored for them. Cache failures never do: a failed lookup is a miss and a
//! failed write is dropped.
//!
//! Concurrent misses on the same key each call their own loader.

use crate::domain::{DomainCache, DomainRecord};
use crate::manager::CacheManager;
use crate::params::CacheParams;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// A value together with where it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheFirst<T> {
    pub data: T,
    pub from_cache: bool,
}

impl<T> CacheFirst<T> {
    pub fn into_data(self) -> T {
        self.data
    }
}

/// Anything `cache_first` can read through. Both operations are infallible
/// at this level; implementations log and degrade.
#[async_trait]
pub trait CacheSource<K: ?Sized + Sync, V: Send + Sync>: Send + Sync {
    async fn lookup(&self, key: &K) -> Option<V>;

    async fn store(&self, key: &K, value: &V, ttl: Option<Duration>);
}

#[async_trait]
impl<V> CacheSource<str, V> for CacheManager
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn lookup(&self, key: &str) -> Option<V> {
        self.get(key).await
    }

    async fn store(&self, key: &str, value: &V, ttl: Option<Duration>) {
        self.set(key, value, ttl).await
    }
}

#[async_trait]
impl<R: DomainRecord> CacheSource<R::Key, R> for DomainCache<R> {
    async fn lookup(&self, key: &R::Key) -> Option<R> {
        self.get(key).await
    }

    async fn store(&self, key: &R::Key, value: &R, ttl: Option<Duration>) {
        self.set_with_ttl(key, value, ttl).await
    }
}

pub async fn cache_first<S, K, V, F, Fut, E>(
    source: &S,
    key: &K,
    loader: F,
    params: &CacheParams,
) -> Result<CacheFirst<V>, E>
where
    S: CacheSource<K, V> + ?Sized,
    K: ?Sized + Sync + Display,
    V: Send + Sync,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    if params.reads_cache() {
        if let Some(data) = source.lookup(key).await {
            return Ok(CacheFirst {
                data,
                from_cache: true,
            });
        }
    } else {
        debug_log!(key = %key, enabled = params.enabled, "cache lookup skipped");
    }

    let data = loader().await?;

    if params.enabled {
        source.store(key, &data, params.ttl).await;
    }

    Ok(CacheFirst {
        data,
        from_cache: false,
    })
}

impl CacheManager {
    /// Cache-first read through the generic key/value namespace
    pub async fn cache_first<T, F, Fut, E>(
        &self,
        key: &str,
        loader: F,
        params: &CacheParams,
    ) -> Result<CacheFirst<T>, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        cache_first(self, key, loader, params).await
    }
}

impl<R: DomainRecord> DomainCache<R> {
    pub async fn cache_first<F, Fut, E>(
        &self,
        key: &R::Key,
        loader: F,
        params: &CacheParams,
    ) -> Result<CacheFirst<R>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        cache_first(self, key, loader, params).await
    }
}
