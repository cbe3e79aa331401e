//! Cache Provider Port
//!
//! JSON-valued cache with per-entry TTL, used by the query service.
//! Implementations must be thread-safe; the same instance is shared by
//! every query handler.

use async_trait::async_trait;

use crate::error::Result;

/// Cache effectiveness counters
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CacheStats {
    /// Lookup hits since process start
    pub hits: u64,
    /// Lookup misses since process start
    pub misses: u64,
    /// Entries currently resident
    pub entries: u64,
}

impl CacheStats {
    /// Hit rate in percent (0 when nothing was looked up yet).
    #[must_use]
    pub fn hit_rate_percent(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                self.hits as f64 / total as f64 * 100.0
            }
        }
    }
}

/// Port for JSON-string caches
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Look up a cached JSON value.
    async fn get_json(&self, key: &str) -> Result<Option<String>>;

    /// Store a JSON value under the cache's TTL.
    async fn set_json(&self, key: &str, value: &str) -> Result<()>;

    /// Current hit/miss/entry counters.
    async fn stats(&self) -> CacheStats;

    /// Stable provider identifier (`moka`)
    fn provider_name(&self) -> &str;
}
