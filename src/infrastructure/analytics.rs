//! Click event emission toward the external analytics pipeline.
//!
//! The core only produces raw events; aggregation and authoritative totals
//! live outside this service.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{debug, warn};

use crate::domain::click_event::ClickEvent;

/// Sink for raw click events.
///
/// Emission is fire-and-forget: failures are logged and counted, never
/// surfaced to the redirect path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn publish_click(&self, event: &ClickEvent);
}

/// Publishes click events onto a Redis stream consumed by the analytics
/// pipeline.
pub struct RedisAnalyticsSink {
    client: ConnectionManager,
    stream_key: String,
}

impl RedisAnalyticsSink {
    pub fn new(client: ConnectionManager) -> Self {
        Self {
            client,
            stream_key: "analytics:clicks".to_string(),
        }
    }
}

#[async_trait]
impl AnalyticsSink for RedisAnalyticsSink {
    async fn publish_click(&self, event: &ClickEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Failed to serialize click event");
                return;
            }
        };

        let mut conn = self.client.clone();
        let result: Result<String, redis::RedisError> = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg("event")
            .arg(payload)
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => {
                metrics::counter!("analytics_events_published_total").increment(1);
                debug!(code = %event.short_code, "Click event published");
            }
            Err(e) => {
                metrics::counter!("analytics_events_dropped_total").increment(1);
                warn!(error = %e, "Failed to publish click event");
            }
        }
    }
}

/// Discards click events when no analytics backend is configured.
pub struct NullAnalyticsSink;

#[async_trait]
impl AnalyticsSink for NullAnalyticsSink {
    async fn publish_click(&self, event: &ClickEvent) {
        debug!(code = %event.short_code, "Click event discarded (analytics disabled)");
    }
}
