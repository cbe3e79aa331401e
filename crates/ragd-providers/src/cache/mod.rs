//! Moka-backed response cache
//!
//! TTL-LRU cache for composed query responses. Capacity and TTL come from
//! configuration (defaults: 1000 entries, 300s). Hit/miss counters feed
//! the metrics endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use ragd_domain::error::Result;
use ragd_domain::ports::{CacheProvider, CacheStats};

/// TTL-LRU cache provider built on Moka
pub struct MokaResponseCache {
    cache: Cache<String, String>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MokaResponseCache {
    /// Create a cache with the given capacity and entry TTL.
    #[must_use]
    pub fn new(max_capacity: u64, time_to_live: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(time_to_live)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl CacheProvider for MokaResponseCache {
    async fn get_json(&self, key: &str) -> Result<Option<String>> {
        match self.cache.get(key).await {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set_json(&self, key: &str, value: &str) -> Result<()> {
        self.cache.insert(key.to_owned(), value.to_owned()).await;
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks().await;
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
        }
    }

    fn provider_name(&self) -> &str {
        "moka"
    }
}

impl std::fmt::Debug for MokaResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaResponseCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn miss_then_hit_updates_counters() {
        let cache = MokaResponseCache::new(10, Duration::from_secs(60));

        assert_eq!(cache.get_json("k").await.expect("get"), None);
        cache.set_json("k", "{\"answer\":42}").await.expect("set");
        assert_eq!(
            cache.get_json("k").await.expect("get"),
            Some("{\"answer\":42}".to_owned())
        );

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate_percent() - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = MokaResponseCache::new(10, Duration::from_millis(20));
        cache.set_json("k", "v").await.expect("set");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.get_json("k").await.expect("get"), None);
    }
}
