//! Two-tier caching for the redirect hot path.

pub mod memory_cache;
pub mod null_cache;
pub mod redis_cache;
pub mod service;
pub mod tiered_cache;

pub use memory_cache::MemoryCache;
pub use null_cache::NullCache;
pub use redis_cache::{CacheConnectError, RedisCache};
pub use service::{CacheLookup, UrlCache};
pub use tiered_cache::TieredCache;

#[cfg(test)]
pub use service::MockUrlCache;
