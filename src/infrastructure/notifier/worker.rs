//! Background worker delivering queued webhook jobs.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;

use super::signing::sign_payload;
use super::transport::{TransportError, WebhookTransport};
use crate::domain::entities::{DeliveryOutcome, WebhookJob};
use crate::domain::repositories::UserRepository;

/// Delivery worker knobs.
#[derive(Debug, Clone)]
pub struct WebhookWorkerConfig {
    /// Retry budget for transient failures, on top of the first attempt.
    pub max_retries: usize,
    /// Maximum in-flight deliveries.
    pub concurrency: usize,
}

/// One attempt's failure, classified for the retry policy.
#[derive(Debug)]
struct AttemptFailure {
    outcome: DeliveryOutcome,
    detail: String,
}

/// Classifies an HTTP status into a delivery outcome.
fn classify_status(status: u16) -> DeliveryOutcome {
    match status {
        200..=299 => DeliveryOutcome::Delivered,
        400..=499 => DeliveryOutcome::PermanentFailure,
        _ => DeliveryOutcome::TransientFailure,
    }
}

/// Resolves settings, signs, and delivers a single job with retries.
///
/// A job whose owner has webhooks disabled (or the event switched off) is
/// a silent no-op. Transient failures (connection errors, timeouts, 5xx)
/// retry with exponential backoff up to the configured budget; 4xx is
/// permanent and dropped immediately. Delivery is never guaranteed.
async fn deliver_job<U, T>(job: WebhookJob, users: Arc<U>, transport: Arc<T>, max_retries: usize)
where
    U: UserRepository + ?Sized,
    T: WebhookTransport + ?Sized,
{
    let settings = match users.notification_settings(job.owner_id).await {
        Ok(Some(settings)) => settings,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(owner = %job.owner_id, error = %e, "Webhook settings lookup failed");
            metrics::counter!("webhook_dropped_total", "reason" => "settings_lookup").increment(1);
            return;
        }
    };

    let Some(target) = settings.target_for(job.event) else {
        return;
    };
    let target = target.to_string();

    let body = json!({
        "event": job.event.as_str(),
        "timestamp": Utc::now().to_rfc3339(),
        "data": job.data,
    })
    .to_string();

    let signature = settings
        .webhook_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|secret| sign_payload(secret, body.as_bytes()));

    // Doubling schedule: 500 ms, 1 s, 2 s, ...
    let strategy = ExponentialBackoff::from_millis(2)
        .factor(250)
        .take(max_retries);

    let event_name = job.event.as_str();
    let op = || {
        let transport = transport.clone();
        let target = target.clone();
        let signature = signature.clone();
        let body = body.clone();

        async move {
            match transport.deliver(&target, signature, body).await {
                Ok(status) => match classify_status(status) {
                    DeliveryOutcome::Delivered => Ok(()),
                    outcome => Err(AttemptFailure {
                        outcome,
                        detail: format!("HTTP {}", status),
                    }),
                },
                Err(TransportError::Timeout) => Err(AttemptFailure {
                    outcome: DeliveryOutcome::TransientFailure,
                    detail: "timeout".to_string(),
                }),
                Err(TransportError::Connection(detail)) => Err(AttemptFailure {
                    outcome: DeliveryOutcome::TransientFailure,
                    detail,
                }),
            }
        }
    };

    let on_error = |failure: &AttemptFailure| {
        let transient = failure.outcome == DeliveryOutcome::TransientFailure;
        if transient {
            metrics::counter!("webhook_retried_total").increment(1);
            tracing::warn!(
                event = event_name,
                detail = %failure.detail,
                "Webhook delivery failed, retrying"
            );
        }
        transient
    };

    match RetryIf::spawn(strategy, op, on_error).await {
        Ok(()) => {
            metrics::counter!("webhook_delivered_total").increment(1);
            tracing::debug!(event = event_name, "Webhook delivered");
        }
        Err(failure) => {
            metrics::counter!("webhook_failed_total").increment(1);
            tracing::error!(
                event = event_name,
                outcome = ?failure.outcome,
                detail = %failure.detail,
                "Webhook delivery abandoned"
            );
        }
    }
}

/// Runs the webhook delivery worker with bounded concurrency.
///
/// Reads [`WebhookJob`]s from `rx` and delivers up to
/// `config.concurrency` jobs in parallel. The worker exits when the
/// sending side of the channel closes, draining in-flight deliveries
/// first. Each delivery carries its own timeout and keeps running even if
/// the request that triggered it has long since completed.
pub async fn run_webhook_worker<U, T>(
    mut rx: mpsc::Receiver<WebhookJob>,
    users: Arc<U>,
    transport: Arc<T>,
    config: WebhookWorkerConfig,
) where
    U: UserRepository + ?Sized + 'static,
    T: WebhookTransport + ?Sized + 'static,
{
    tracing::info!(concurrency = config.concurrency, "Webhook worker started");

    let mut join_set: JoinSet<()> = JoinSet::new();

    while let Some(job) = rx.recv().await {
        metrics::counter!("webhook_received_total").increment(1);

        // Clean up already-finished tasks to keep join_set size accurate.
        while join_set.try_join_next().is_some() {}

        if join_set.len() >= config.concurrency {
            join_set.join_next().await;
        }

        let users = users.clone();
        let transport = transport.clone();
        let max_retries = config.max_retries;

        join_set.spawn(async move {
            deliver_job(job, users, transport, max_retries).await;
        });
    }

    // Drain in-flight deliveries before returning.
    while join_set.join_next().await.is_some() {}

    tracing::info!("Webhook worker stopped");
}
