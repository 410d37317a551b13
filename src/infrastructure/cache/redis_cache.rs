//! Redis-backed shared (L2) cache.

use super::service::{CacheLookup, UrlCache};
use crate::domain::entities::UrlMapping;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Value stored under a key whose code is known not to exist. Chosen to be
/// unparseable as a mapping snapshot so legacy readers fall back to a miss.
const NEGATIVE_SENTINEL: &str = "!";

/// Errors establishing the Redis connection. Operational errors after
/// connect are logged and degrade to misses instead of propagating.
#[derive(Debug)]
pub enum CacheConnectError {
    Connection(String),
}

impl fmt::Display for CacheConnectError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "Cache connection error: {}", e),
        }
    }
}

impl std::error::Error for CacheConnectError {}

/// Shared cache holding JSON snapshots of mappings (or the negative
/// sentinel) under `url:<code>`, with per-entry TTL.
///
/// Uses `ConnectionManager` for connection reuse. All operations are
/// fail-open.
pub struct RedisCache {
    client: ConnectionManager,
    pos_ttl: Duration,
    neg_ttl: Duration,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CacheConnectError::Connection`] if the URL is malformed,
    /// the connection cannot be established, or PING fails.
    pub async fn connect(
        cache_url: &str,
        pos_ttl: Duration,
        neg_ttl: Duration,
    ) -> Result<Self, CacheConnectError> {
        info!("Connecting to shared cache");

        let client = Client::open(cache_url).map_err(|e| {
            CacheConnectError::Connection(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheConnectError::Connection(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheConnectError::Connection(format!("Redis PING failed: {}", e)))?;

        info!("Connected to shared cache");

        Ok(Self {
            client: manager,
            pos_ttl,
            neg_ttl,
            key_prefix: "url:".to_string(),
        })
    }

    /// Constructs the full Redis key with namespace prefix.
    fn build_key(&self, short_code: &str) -> String {
        format!("{}{}", self.key_prefix, short_code)
    }
}

#[async_trait]
impl UrlCache for RedisCache {
    async fn get(&self, code: &str) -> CacheLookup {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(value)) if value == NEGATIVE_SENTINEL => {
                debug!("Cache NEGATIVE HIT: {}", code);
                CacheLookup::Negative
            }
            Ok(Some(value)) => match serde_json::from_str::<UrlMapping>(&value) {
                Ok(mapping) => {
                    debug!("Cache HIT: {}", code);
                    CacheLookup::Hit(mapping)
                }
                Err(e) => {
                    // An undecodable snapshot is treated as a miss and evicted.
                    warn!("Undecodable cache entry for {}: {}", code, e);
                    let _ = conn.del::<_, i32>(&key).await;
                    CacheLookup::Miss
                }
            },
            Ok(None) => {
                debug!("Cache MISS: {}", code);
                CacheLookup::Miss
            }
            Err(e) => {
                error!("Redis GET error for {}: {}", code, e);
                CacheLookup::Miss
            }
        }
    }

    async fn put(&self, code: &str, mapping: &UrlMapping, ttl: Option<Duration>) {
        let key = self.build_key(code);
        let mut conn = self.client.clone();
        let ttl = ttl.map_or(self.pos_ttl, |t| t.min(self.pos_ttl));

        let payload = match serde_json::to_string(mapping) {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to serialize mapping for {}: {}", code, e);
                return;
            }
        };

        match conn
            .set_ex::<_, _, ()>(&key, payload, ttl.as_secs().max(1))
            .await
        {
            Ok(_) => debug!("Cache SET: {} (TTL: {}s)", code, ttl.as_secs()),
            Err(e) => warn!("Redis SET error for {}: {}", code, e),
        }
    }

    async fn put_negative(&self, code: &str) {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        match conn
            .set_ex::<_, _, ()>(&key, NEGATIVE_SENTINEL, self.neg_ttl.as_secs().max(1))
            .await
        {
            Ok(_) => debug!(
                "Cache SET negative: {} (TTL: {}s)",
                code,
                self.neg_ttl.as_secs()
            ),
            Err(e) => warn!("Redis SET error for {}: {}", code, e),
        }
    }

    async fn invalidate(&self, code: &str) {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        match conn.del::<_, i32>(&key).await {
            Ok(deleted) => {
                if deleted > 0 {
                    debug!("Cache INVALIDATE: {}", code);
                }
            }
            Err(e) => warn!("Redis DEL error for {}: {}", code, e),
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
