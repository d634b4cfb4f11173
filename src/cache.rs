// src/cache.rs
//! Shared snapshot cache: TTL (expire-after-write) plus a size bound.
//!
//! Backed by `moka`, which is lock-striped and safe for concurrent readers
//! and writers. Entries are stored by value and never mutated in place.

use std::time::Duration;

use moka::future::Cache;

use crate::config::CacheConfig;
use crate::service::WeatherSnapshot;

#[derive(Clone)]
pub struct SnapshotCache {
    inner: Cache<String, WeatherSnapshot>,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(max_size: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_size)
            .time_to_live(ttl)
            .build();
        Self { inner, ttl }
    }

    pub fn from_config(cfg: &CacheConfig) -> Self {
        Self::new(cfg.max_size, cfg.ttl())
    }

    pub async fn get(&self, key: &str) -> Option<WeatherSnapshot> {
        self.inner.get(key).await
    }

    pub async fn put(&self, key: String, value: WeatherSnapshot) {
        self.inner.insert(key, value).await;
    }

    /// Invalidate every entry; subsequent `get`s miss immediately.
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Approximate entry count (moka applies evictions lazily).
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    pub fn max_capacity(&self) -> Option<u64> {
        self.inner.policy().max_capacity()
    }

    #[cfg(test)]
    pub(crate) async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}
