//! Webhook notification: enqueue handle, signing, transport, worker.

pub mod signing;
pub mod transport;
pub mod worker;

pub use signing::sign_payload;
pub use transport::{HttpTransport, SIGNATURE_HEADER, TransportError, WEBHOOK_USER_AGENT, WebhookTransport};
pub use worker::{WebhookWorkerConfig, run_webhook_worker};

#[cfg(test)]
pub use transport::MockWebhookTransport;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::domain::entities::{WebhookEvent, WebhookJob};

/// Cheap, non-blocking handle for enqueueing webhook notifications.
///
/// Settings are resolved by the worker, so a disabled webhook costs the
/// foreground path nothing beyond a channel push. Anonymous owners are a
/// no-op. On a full queue, `url.clicked` jobs are shed immediately;
/// lifecycle events fall back to an async send off the caller's path, so
/// the triggering request never blocks.
#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::Sender<WebhookJob>,
}

impl Notifier {
    pub fn new(sender: mpsc::Sender<WebhookJob>) -> Self {
        Self { sender }
    }

    /// Enqueues an event for an owner. `None` owners (anonymous mappings)
    /// have nowhere to deliver and return immediately.
    pub fn notify(&self, owner_id: Option<Uuid>, event: WebhookEvent, data: Value) {
        let Some(owner_id) = owner_id else {
            return;
        };

        let job = WebhookJob {
            owner_id,
            event,
            data,
        };

        match self.sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                if job.event.is_sheddable() {
                    metrics::counter!("webhook_shed_total").increment(1);
                    tracing::warn!(event = job.event.as_str(), "Webhook queue full, shedding");
                } else {
                    // Lifecycle events are worth waiting for, but not on the
                    // caller's stack.
                    let sender = self.sender.clone();
                    tokio::spawn(async move {
                        if sender.send(job).await.is_err() {
                            tracing::warn!("Webhook queue closed, event lost");
                        }
                    });
                }
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!("Webhook queue closed, event lost");
            }
        }
    }
}
