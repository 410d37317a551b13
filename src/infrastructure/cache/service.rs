//! Cache trait and lookup result types.

use crate::domain::entities::UrlMapping;
use async_trait::async_trait;
use std::time::Duration;

/// Result of a cache probe.
///
/// `Negative` is a cached assertion that the code does not exist; it damps
/// lookup storms for bad URLs and is distinct from a plain miss.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(UrlMapping),
    Negative,
    Miss,
}

/// Trait for caching URL mapping snapshots keyed by short code.
///
/// Implementations must be thread-safe and fail open: a cache that cannot
/// answer reports a miss, and write errors are logged and dropped so cache
/// trouble never disrupts the request flow. Cached mappings are value
/// snapshots; storage remains the source of truth.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::MemoryCache`] - in-process L1 (moka)
/// - [`crate::infrastructure::cache::RedisCache`] - shared L2 with TTL support
/// - [`crate::infrastructure::cache::TieredCache`] - L1 over L2 composition
/// - [`crate::infrastructure::cache::NullCache`] - no-op fallback
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlCache: Send + Sync {
    /// Probes the cache for a short code.
    async fn get(&self, code: &str) -> CacheLookup;

    /// Stores a mapping snapshot. `ttl` overrides the configured positive
    /// TTL (used to align cache lifetime with an imminent expiry).
    async fn put(&self, code: &str, mapping: &UrlMapping, ttl: Option<Duration>);

    /// Records that the code is known not to exist, with the shorter
    /// negative TTL.
    async fn put_negative(&self, code: &str);

    /// Drops any entry for the code, positive or negative, from every tier.
    async fn invalidate(&self, code: &str);

    /// Reports whether the cache backend is reachable.
    async fn health_check(&self) -> bool;
}
