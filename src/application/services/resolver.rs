//! Hot-path redirect resolution.
//!
//! Reads through the two-tier cache; the repository is consulted only on a
//! miss. Access accounting and analytics are queued, never awaited, so the
//! redirect decision is bounded by one cache probe plus at most one
//! repository read.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use chrono::Utc;

use crate::domain::click_event::ClickEvent;
use crate::domain::entities::UrlMapping;
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheLookup, UrlCache};

/// Outcome of resolving a short code.
#[derive(Debug, Clone)]
pub enum Resolution {
    Found(UrlMapping),
    NotFound,
    Expired,
}

/// Request context forwarded into the click event.
#[derive(Debug, Clone, Default)]
pub struct ClickContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

/// Resolves short codes for the redirect host.
pub struct ResolverService {
    repository: Arc<dyn UrlRepository>,
    cache: Arc<dyn UrlCache>,
    click_sender: mpsc::Sender<ClickEvent>,
}

impl ResolverService {
    pub fn new(
        repository: Arc<dyn UrlRepository>,
        cache: Arc<dyn UrlCache>,
        click_sender: mpsc::Sender<ClickEvent>,
    ) -> Self {
        Self {
            repository,
            cache,
            click_sender,
        }
    }

    /// Resolves a short code.
    ///
    /// # Algorithm
    ///
    /// 1. Cache probe. A negative hit answers `NotFound` without touching
    ///    the repository.
    /// 2. On a miss, read the repository. An absent (or soft-deleted) code
    ///    is negative-cached and answers `NotFound`.
    /// 3. Expired mappings answer `Expired` and are never cached in either
    ///    direction: an `update_expiry` may revive them at any time.
    /// 4. Live mappings are cached (TTL clamped to the remaining lifetime)
    ///    and a click event is queued best-effort.
    ///
    /// # Errors
    ///
    /// Only repository failures surface, as [`AppError::Internal`]. Cache
    /// trouble degrades silently to repository reads.
    pub async fn resolve(&self, code: &str, ctx: ClickContext) -> Result<Resolution, AppError> {
        match self.cache.get(code).await {
            CacheLookup::Hit(mapping) => {
                // A snapshot may outlive the mapping's expiry inside the
                // cache TTL window.
                if mapping.is_expired() {
                    return Ok(Resolution::Expired);
                }
                self.record_click(&mapping, ctx);
                Ok(Resolution::Found(mapping))
            }
            CacheLookup::Negative => Ok(Resolution::NotFound),
            CacheLookup::Miss => {
                let Some(mapping) = self.repository.find_by_code(code).await? else {
                    self.cache.put_negative(code).await;
                    return Ok(Resolution::NotFound);
                };

                if mapping.is_expired() {
                    return Ok(Resolution::Expired);
                }

                let ttl = mapping.expires_at.map(|expires_at| {
                    let secs = (expires_at - Utc::now()).num_seconds().max(1);
                    Duration::from_secs(secs as u64)
                });
                self.cache.put(code, &mapping, ttl).await;

                self.record_click(&mapping, ctx);
                Ok(Resolution::Found(mapping))
            }
        }
    }

    /// Queues a click event; a full queue drops the event.
    fn record_click(&self, mapping: &UrlMapping, ctx: ClickContext) {
        let event = ClickEvent::new(
            mapping.short_code.clone(),
            mapping.owner_id,
            ctx.ip,
            ctx.user_agent.as_deref(),
            ctx.referrer.as_deref(),
        );

        if self.click_sender.try_send(event).is_err() {
            metrics::counter!("click_events_dropped_total").increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockUrlRepository;
    use crate::infrastructure::cache::MockUrlCache;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;
    use uuid::Uuid;

    fn mapping(code: &str) -> UrlMapping {
        UrlMapping {
            id: 1,
            short_code: code.to_string(),
            long_url: "https://example.com/page".to_string(),
            long_url_hash: "hash".to_string(),
            owner_id: Some(Uuid::new_v4()),
            is_custom_alias: false,
            access_count: 5,
            created_at: Utc::now() - ChronoDuration::days(1),
            expires_at: None,
            last_accessed_at: None,
            is_deleted: false,
            deleted_at: None,
        }
    }

    fn resolver(
        repo: MockUrlRepository,
        cache: MockUrlCache,
    ) -> (ResolverService, mpsc::Receiver<ClickEvent>) {
        let (tx, rx) = mpsc::channel(16);
        (
            ResolverService::new(Arc::new(repo), Arc::new(cache), tx),
            rx,
        )
    }

    #[tokio::test]
    async fn test_cache_hit_skips_repository_and_queues_click() {
        let mut repo = MockUrlRepository::new();
        repo.expect_find_by_code().times(0);

        let mut cache = MockUrlCache::new();
        let m = mapping("abc12Xy");
        cache
            .expect_get()
            .returning(move |_| CacheLookup::Hit(m.clone()));

        let (resolver, mut rx) = resolver(repo, cache);

        let resolution = resolver
            .resolve(
                "abc12Xy",
                ClickContext {
                    ip: Some("10.0.0.1".to_string()),
                    user_agent: Some("curl/8".to_string()),
                    referrer: None,
                },
            )
            .await
            .unwrap();

        match resolution {
            Resolution::Found(m) => assert_eq!(m.long_url, "https://example.com/page"),
            other => panic!("expected Found, got {:?}", other),
        }

        let click = rx.try_recv().unwrap();
        assert_eq!(click.short_code, "abc12Xy");
        assert_eq!(click.ip.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_negative_hit_short_circuits() {
        let mut repo = MockUrlRepository::new();
        repo.expect_find_by_code().times(0);

        let mut cache = MockUrlCache::new();
        cache.expect_get().returning(|_| CacheLookup::Negative);

        let (resolver, mut rx) = resolver(repo, cache);

        let resolution = resolver
            .resolve("missing1", ClickContext::default())
            .await
            .unwrap();

        assert!(matches!(resolution, Resolution::NotFound));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_miss_with_absent_code_negative_caches() {
        let mut repo = MockUrlRepository::new();
        repo.expect_find_by_code()
            .times(1)
            .returning(|_| Ok(None));

        let mut cache = MockUrlCache::new();
        cache.expect_get().returning(|_| CacheLookup::Miss);
        cache
            .expect_put_negative()
            .withf(|code| code == "missing1")
            .times(1)
            .return_const(());

        let (resolver, _rx) = resolver(repo, cache);

        let resolution = resolver
            .resolve("missing1", ClickContext::default())
            .await
            .unwrap();

        assert!(matches!(resolution, Resolution::NotFound));
    }

    #[tokio::test]
    async fn test_miss_with_live_mapping_populates_cache() {
        let mut repo = MockUrlRepository::new();
        let m = mapping("abc12Xy");
        repo.expect_find_by_code()
            .times(1)
            .returning(move |_| Ok(Some(m.clone())));

        let mut cache = MockUrlCache::new();
        cache.expect_get().returning(|_| CacheLookup::Miss);
        cache
            .expect_put()
            .withf(|code, _, ttl| code == "abc12Xy" && ttl.is_none())
            .times(1)
            .return_const(());

        let (resolver, mut rx) = resolver(repo, cache);

        let resolution = resolver
            .resolve("abc12Xy", ClickContext::default())
            .await
            .unwrap();

        assert!(matches!(resolution, Resolution::Found(_)));
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_cache_ttl_clamped_to_remaining_lifetime() {
        let mut repo = MockUrlRepository::new();
        let mut m = mapping("abc12Xy");
        m.expires_at = Some(Utc::now() + ChronoDuration::minutes(10));
        repo.expect_find_by_code()
            .returning(move |_| Ok(Some(m.clone())));

        let mut cache = MockUrlCache::new();
        cache.expect_get().returning(|_| CacheLookup::Miss);
        cache
            .expect_put()
            .withf(|_, _, ttl| {
                // TTL must not outlive the expiry.
                ttl.is_some_and(|t| t <= Duration::from_secs(600))
            })
            .times(1)
            .return_const(());

        let (resolver, _rx) = resolver(repo, cache);

        resolver
            .resolve("abc12Xy", ClickContext::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_expired_mapping_is_expired_and_never_cached() {
        let mut repo = MockUrlRepository::new();
        let mut m = mapping("abc12Xy");
        m.expires_at = Some(Utc::now() - ChronoDuration::seconds(10));
        repo.expect_find_by_code()
            .returning(move |_| Ok(Some(m.clone())));

        let mut cache = MockUrlCache::new();
        cache.expect_get().returning(|_| CacheLookup::Miss);
        cache.expect_put().times(0);
        cache.expect_put_negative().times(0);

        let (resolver, mut rx) = resolver(repo, cache);

        let resolution = resolver
            .resolve("abc12Xy", ClickContext::default())
            .await
            .unwrap();

        assert!(matches!(resolution, Resolution::Expired));
        // Expired resolutions record no click.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_cached_snapshot_past_expiry_is_expired() {
        let mut cache = MockUrlCache::new();
        let mut m = mapping("abc12Xy");
        m.expires_at = Some(Utc::now() - ChronoDuration::seconds(1));
        cache
            .expect_get()
            .returning(move |_| CacheLookup::Hit(m.clone()));

        let repo = MockUrlRepository::new();
        let (resolver, _rx) = resolver(repo, cache);

        let resolution = resolver
            .resolve("abc12Xy", ClickContext::default())
            .await
            .unwrap();

        assert!(matches!(resolution, Resolution::Expired));
    }

    #[tokio::test]
    async fn test_repository_failure_surfaces_internal() {
        let mut repo = MockUrlRepository::new();
        repo.expect_find_by_code()
            .returning(|_| Err(AppError::internal("db down", json!({}))));

        let mut cache = MockUrlCache::new();
        cache.expect_get().returning(|_| CacheLookup::Miss);

        let (resolver, _rx) = resolver(repo, cache);

        let err = resolver
            .resolve("abc12Xy", ClickContext::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_full_click_queue_does_not_block_resolution() {
        let mut cache = MockUrlCache::new();
        let m = mapping("abc12Xy");
        cache
            .expect_get()
            .returning(move |_| CacheLookup::Hit(m.clone()));

        let (tx, _rx) = mpsc::channel(1);
        // Saturate the queue.
        tx.try_send(ClickEvent::new("x".to_string(), None, None, None, None))
            .unwrap();

        let resolver = ResolverService::new(
            Arc::new(MockUrlRepository::new()),
            Arc::new(cache),
            tx,
        );

        let resolution = resolver
            .resolve("abc12Xy", ClickContext::default())
            .await
            .unwrap();

        assert!(matches!(resolution, Resolution::Found(_)));
    }
}
