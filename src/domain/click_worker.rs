//! Background worker for processing click events asynchronously.
//!
//! The redirect path only pushes onto a bounded channel; this worker does
//! the accounting (best-effort access counter), forwards the raw event to
//! the analytics sink, and fires sampled `url.clicked` webhooks.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::domain::click_event::ClickEvent;
use crate::domain::entities::WebhookEvent;
use crate::domain::repositories::UrlRepository;
use crate::infrastructure::analytics::AnalyticsSink;
use crate::infrastructure::notifier::Notifier;
use serde_json::json;

/// Click worker knobs.
#[derive(Debug, Clone)]
pub struct ClickWorkerConfig {
    /// Maximum events processed concurrently.
    pub concurrency: usize,
    /// `url.clicked` webhooks fire for 1 in N clicks; 0 disables them.
    pub webhook_sample_rate: u64,
}

/// Handles one click event.
async fn process_click<R, A>(
    event: ClickEvent,
    repository: Arc<R>,
    analytics: Arc<A>,
    notifier: Notifier,
    notify_click: bool,
) where
    R: UrlRepository + ?Sized,
    A: AnalyticsSink + ?Sized,
{
    // Counter bump first; it is the only part with durable effect.
    repository.increment_access(&event.short_code).await;

    analytics.publish_click(&event).await;

    if notify_click {
        notifier.notify(
            event.owner_id,
            WebhookEvent::UrlClicked,
            json!({
                "short_code": event.short_code,
                "occurred_at": event.occurred_at,
                "ip": event.ip,
                "user_agent": event.user_agent,
                "referrer": event.referrer,
            }),
        );
    }

    metrics::counter!("click_worker_processed_total").increment(1);
}

/// Runs the background click worker with bounded concurrency.
///
/// Reads [`ClickEvent`]s from `rx` and processes up to
/// `config.concurrency` events in parallel. The mpsc buffer absorbs
/// bursts beyond that; the redirect path drops events when even the
/// buffer is full.
///
/// # Graceful shutdown
///
/// The worker exits when the sending side of the channel is dropped.
/// Before returning, all in-flight tasks are drained so no accepted
/// events are lost.
pub async fn run_click_worker<R, A>(
    mut rx: mpsc::Receiver<ClickEvent>,
    repository: Arc<R>,
    analytics: Arc<A>,
    notifier: Notifier,
    config: ClickWorkerConfig,
) where
    R: UrlRepository + ?Sized + 'static,
    A: AnalyticsSink + ?Sized + 'static,
{
    tracing::info!(concurrency = config.concurrency, "Click worker started");

    let mut join_set: JoinSet<()> = JoinSet::new();
    let seen = AtomicU64::new(0);

    while let Some(event) = rx.recv().await {
        metrics::counter!("click_worker_received_total").increment(1);

        // Clean up already-finished tasks to keep join_set size accurate.
        while join_set.try_join_next().is_some() {}

        // If at capacity, wait for one slot to free up before spawning more.
        if join_set.len() >= config.concurrency {
            join_set.join_next().await;
        }

        let n = seen.fetch_add(1, Ordering::Relaxed);
        let notify_click = config.webhook_sample_rate > 0
            && n % config.webhook_sample_rate == 0
            && event.owner_id.is_some();

        let repository = repository.clone();
        let analytics = analytics.clone();
        let notifier = notifier.clone();

        join_set.spawn(async move {
            process_click(event, repository, analytics, notifier, notify_click).await;
        });
    }

    // Drain all in-flight tasks before returning so no events are lost on shutdown.
    while join_set.join_next().await.is_some() {}

    tracing::info!("Click worker stopped");
}
