//! In-process L1 cache backed by moka.
//!
//! Small and short-lived: its job is to absorb read skew on hot codes
//! between shared-cache round trips, so TTLs are seconds, not minutes.

use super::service::{CacheLookup, UrlCache};
use crate::domain::entities::UrlMapping;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Stored {
    Found(UrlMapping),
    Negative,
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    stored: Stored,
    ttl: Duration,
}

/// Per-entry expiry so negative entries age out faster than positive ones.
struct EntryTtl;

impl moka::Expiry<String, MemoryEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded in-process LRU with per-entry TTL.
pub struct MemoryCache {
    cache: Cache<String, MemoryEntry>,
    pos_ttl: Duration,
    neg_ttl: Duration,
}

impl MemoryCache {
    /// Creates an L1 cache holding at most `capacity` entries.
    pub fn new(capacity: u64, pos_ttl: Duration, neg_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .expire_after(EntryTtl)
            .build();

        Self {
            cache,
            pos_ttl,
            neg_ttl,
        }
    }
}

#[async_trait]
impl UrlCache for MemoryCache {
    async fn get(&self, code: &str) -> CacheLookup {
        match self.cache.get(code).await {
            Some(MemoryEntry {
                stored: Stored::Found(mapping),
                ..
            }) => CacheLookup::Hit(mapping),
            Some(MemoryEntry {
                stored: Stored::Negative,
                ..
            }) => CacheLookup::Negative,
            None => CacheLookup::Miss,
        }
    }

    async fn put(&self, code: &str, mapping: &UrlMapping, ttl: Option<Duration>) {
        let ttl = ttl.map_or(self.pos_ttl, |t| t.min(self.pos_ttl));
        self.cache
            .insert(
                code.to_string(),
                MemoryEntry {
                    stored: Stored::Found(mapping.clone()),
                    ttl,
                },
            )
            .await;
    }

    async fn put_negative(&self, code: &str) {
        self.cache
            .insert(
                code.to_string(),
                MemoryEntry {
                    stored: Stored::Negative,
                    ttl: self.neg_ttl,
                },
            )
            .await;
    }

    async fn invalidate(&self, code: &str) {
        self.cache.invalidate(code).await;
    }

    async fn health_check(&self) -> bool {
        true
    }
}
