//! Read-through cache shared by the upstream-facing services.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ApiError;

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    map: HashMap<String, CacheEntry>,
}

impl CacheInner {
    fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.body.clone())
    }

    /// Insert `body`, sweeping expired entries on the way.
    fn put(&mut self, key: String, body: String, ttl: Duration) {
        let now = Instant::now();
        self.sweep(now);
        self.map.insert(
            key,
            CacheEntry {
                body,
                expires_at: now + ttl,
            },
        );
    }

    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, entry| entry.is_live(now));
        before - self.map.len()
    }
}

/// Cache-aside store keyed by resource identity.
///
/// Values are held as JSON text with an absolute expiry. Reads after expiry
/// are misses, and every write drops entries that have expired. There is no
/// single-flight: concurrent misses for one key each
/// run their loader and the last writer wins.
#[derive(Debug, Clone)]
pub struct CacheAsideStore {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
}

impl Default for CacheAsideStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheAsideStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::default())),
        }
    }

    /// Return the live value under `key`, or run `loader` and store its
    /// result for `ttl`.
    ///
    /// A failed loader writes nothing and its error is returned unchanged.
    pub async fn get_or_load<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(value) = self.get::<T>(key).await {
            debug!(key, "cache hit");
            return Ok(value);
        }

        debug!(key, "cache miss");
        let value = loader().await?;
        self.put(key, &value, ttl).await;
        Ok(value)
    }

    /// Live value under `key`. Entries that no longer decode as `T` are misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let body = self.inner.read().await.get(key)?;
        match serde_json::from_str(&body) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(key, %error, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl`. A zero TTL stores nothing.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let body = match serde_json::to_string(value) {
            Ok(body) => body,
            Err(error) => {
                warn!(key, %error, "value could not be cached");
                return;
            }
        };

        self.inner.write().await.put(key.to_string(), body, ttl);
    }

    /// Drop the entry under `key`. Returns whether one existed.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.inner.write().await.map.remove(key).is_some()
    }

    /// Drop every entry whose key starts with `prefix`.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut store = self.inner.write().await;
        let before = store.map.len();
        store.map.retain(|key, _| !key.starts_with(prefix));
        before - store.map.len()
    }

    /// Remove expired entries.
    pub async fn clear_expired(&self) -> usize {
        self.inner.write().await.sweep(Instant::now())
    }

    pub async fn clear(&self) {
        self.inner.write().await.map.clear();
    }

    /// Number of entries, including expired ones not yet cleared.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
