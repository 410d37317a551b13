//! No-op cache for testing or a missing shared tier.

use super::service::{CacheLookup, UrlCache};
use crate::domain::entities::UrlMapping;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// A cache implementation that stores nothing.
///
/// Stands in for the shared tier when Redis is unavailable or unconfigured;
/// every probe is a miss and writes succeed immediately.
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        debug!("Using NullCache (shared cache tier disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlCache for NullCache {
    async fn get(&self, _code: &str) -> CacheLookup {
        CacheLookup::Miss
    }

    async fn put(&self, _code: &str, _mapping: &UrlMapping, _ttl: Option<Duration>) {}

    async fn put_negative(&self, _code: &str) {}

    async fn invalidate(&self, _code: &str) {}

    async fn health_check(&self) -> bool {
        true
    }
}
