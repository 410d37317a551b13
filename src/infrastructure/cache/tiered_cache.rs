//! Two-tier cache composition: in-process L1 over a shared L2.

use super::memory_cache::MemoryCache;
use super::service::{CacheLookup, UrlCache};
use crate::domain::entities::UrlMapping;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// L1 (process-local) in front of L2 (shared).
///
/// Reads stop at the first tier that answers; an L2 hit backfills L1 so
/// subsequent reads stay in-process. Writes and negative entries go to
/// both tiers. Invalidation clears L2 before L1, so a racing read cannot
/// repopulate L1 from an entry that is about to disappear.
pub struct TieredCache {
    l1: MemoryCache,
    l2: Arc<dyn UrlCache>,
}

impl TieredCache {
    pub fn new(l1: MemoryCache, l2: Arc<dyn UrlCache>) -> Self {
        Self { l1, l2 }
    }
}

#[async_trait]
impl UrlCache for TieredCache {
    async fn get(&self, code: &str) -> CacheLookup {
        match self.l1.get(code).await {
            CacheLookup::Hit(mapping) => {
                metrics::counter!("cache_hits_total", "tier" => "l1").increment(1);
                return CacheLookup::Hit(mapping);
            }
            CacheLookup::Negative => {
                metrics::counter!("cache_negative_hits_total", "tier" => "l1").increment(1);
                return CacheLookup::Negative;
            }
            CacheLookup::Miss => {}
        }

        match self.l2.get(code).await {
            CacheLookup::Hit(mapping) => {
                metrics::counter!("cache_hits_total", "tier" => "l2").increment(1);
                self.l1.put(code, &mapping, None).await;
                CacheLookup::Hit(mapping)
            }
            CacheLookup::Negative => {
                metrics::counter!("cache_negative_hits_total", "tier" => "l2").increment(1);
                self.l1.put_negative(code).await;
                CacheLookup::Negative
            }
            CacheLookup::Miss => {
                metrics::counter!("cache_misses_total").increment(1);
                CacheLookup::Miss
            }
        }
    }

    async fn put(&self, code: &str, mapping: &UrlMapping, ttl: Option<Duration>) {
        self.l1.put(code, mapping, ttl).await;
        self.l2.put(code, mapping, ttl).await;
    }

    async fn put_negative(&self, code: &str) {
        self.l1.put_negative(code).await;
        self.l2.put_negative(code).await;
    }

    async fn invalidate(&self, code: &str) {
        // L2 first: clearing L1 first would let a concurrent read refill it
        // from the still-populated shared tier.
        self.l2.invalidate(code).await;
        self.l1.invalidate(code).await;
    }

    async fn health_check(&self) -> bool {
        self.l2.health_check().await
    }
}
