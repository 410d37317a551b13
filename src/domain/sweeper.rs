//! Long-lived sweeper: expiry notifications and hard deletion.
//!
//! Two duties on one interval:
//! - mappings whose expiry fell inside the window since the last pass get
//!   a cache invalidation and a `url.expired` webhook;
//! - soft-deleted rows older than the grace period are physically removed.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::entities::WebhookEvent;
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::infrastructure::cache::UrlCache;
use crate::infrastructure::notifier::Notifier;

/// Sweeper knobs.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub interval: Duration,
    /// Soft-deleted rows older than this many days are hard-deleted.
    pub grace_days: i64,
}

/// What one pass accomplished, for logging.
#[derive(Debug, Default)]
pub struct SweepStats {
    pub expired: usize,
    pub hard_deleted: u64,
}

/// Runs a single sweep over `[window_start, now)`.
pub async fn sweep_once<R, C>(
    repository: &R,
    cache: &C,
    notifier: &Notifier,
    window_start: DateTime<Utc>,
    now: DateTime<Utc>,
    grace_days: i64,
) -> Result<SweepStats, AppError>
where
    R: UrlRepository + ?Sized,
    C: UrlCache + ?Sized,
{
    let mut stats = SweepStats::default();

    let expired = repository.find_expiring(window_start, now).await?;
    for mapping in expired {
        cache.invalidate(&mapping.short_code).await;
        notifier.notify(
            mapping.owner_id,
            WebhookEvent::UrlExpired,
            json!({
                "short_code": mapping.short_code,
                "long_url": mapping.long_url,
                "expired_at": mapping.expires_at,
            }),
        );
        stats.expired += 1;
    }

    let cutoff = now - ChronoDuration::days(grace_days);
    let stale_ids = repository.find_soft_deleted_older_than(cutoff).await?;
    if !stale_ids.is_empty() {
        stats.hard_deleted = repository.hard_delete(&stale_ids).await?;
    }

    Ok(stats)
}

/// Runs the sweeper until the task is aborted at shutdown.
///
/// Each pass covers the window since the previous one, so a given expiry is
/// notified once under normal operation. A failed pass keeps its window and
/// retries it on the next tick.
pub async fn run_sweeper<R, C>(
    repository: Arc<R>,
    cache: Arc<C>,
    notifier: Notifier,
    config: SweeperConfig,
) where
    R: UrlRepository + ?Sized,
    C: UrlCache + ?Sized,
{
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        grace_days = config.grace_days,
        "Sweeper started"
    );

    let mut ticker = tokio::time::interval(config.interval);
    // The immediate first tick would re-notify expiries from before startup.
    ticker.tick().await;

    let mut window_start = Utc::now();

    loop {
        ticker.tick().await;
        let now = Utc::now();

        match sweep_once(
            repository.as_ref(),
            cache.as_ref(),
            &notifier,
            window_start,
            now,
            config.grace_days,
        )
        .await
        {
            Ok(stats) => {
                if stats.expired > 0 || stats.hard_deleted > 0 {
                    tracing::info!(
                        expired = stats.expired,
                        hard_deleted = stats.hard_deleted,
                        "Sweep completed"
                    );
                }
                metrics::counter!("sweeper_expired_total").increment(stats.expired as u64);
                metrics::counter!("sweeper_hard_deleted_total").increment(stats.hard_deleted);
                window_start = now;
            }
            Err(e) => {
                // Keep the window; the next pass retries it.
                tracing::error!(error = %e, "Sweep failed");
            }
        }
    }
}
