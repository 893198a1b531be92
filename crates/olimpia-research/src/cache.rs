//! Time-bounded cache for market-data responses
//!
//! Ticker validation and the metrics stage ask the feed for the same symbol
//! within seconds of each other; the cache lets them share one download.

use cached::{Cached, TimedCache};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cache key: symbol plus the feed endpoint and its parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub endpoint: &'static str,
    pub params: String,
}

impl CacheKey {
    pub fn new(symbol: &str, endpoint: &'static str, params: impl ToString) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            endpoint,
            params: params.to_string(),
        }
    }
}

/// Shared cache of JSON-encoded responses
#[derive(Clone)]
pub struct MarketCache {
    inner: Arc<RwLock<TimedCache<CacheKey, serde_json::Value>>>,
}

impl MarketCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        // TimedCache evicts on read, so reads take the write lock
        let mut cache = self.inner.write().await;
        cache.cache_get(key).cloned()
    }

    pub async fn insert(&self, key: CacheKey, value: serde_json::Value) {
        let mut cache = self.inner.write().await;
        let _ = cache.cache_set(key, value);
    }

    /// Return the cached value or run `fetch` and cache its success
    ///
    /// Errors are not cached, so a failed download is retried on the next call.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: CacheKey, fetch: F) -> Result<serde_json::Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<serde_json::Value, E>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!(symbol = %key.symbol, endpoint = key.endpoint, "Cache hit");
            return Ok(value);
        }

        tracing::debug!(symbol = %key.symbol, endpoint = key.endpoint, "Cache miss");
        let value = fetch().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.cache_size()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
