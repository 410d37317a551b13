//! Webhook lifecycle events and outbound delivery jobs.

use serde_json::Value;
use uuid::Uuid;

/// Lifecycle events deliverable to owner-configured webhook endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEvent {
    UrlCreated,
    UrlClicked,
    UrlExpired,
    UrlDeleted,
    Test,
}

impl WebhookEvent {
    /// Wire name carried in the payload's `event` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEvent::UrlCreated => "url.created",
            WebhookEvent::UrlClicked => "url.clicked",
            WebhookEvent::UrlExpired => "url.expired",
            WebhookEvent::UrlDeleted => "url.deleted",
            WebhookEvent::Test => "webhook.test",
        }
    }

    /// Clicked events are the only class shed first under queue pressure.
    pub fn is_sheddable(&self) -> bool {
        matches!(self, WebhookEvent::UrlClicked)
    }
}

/// A queued outbound notification. Settings are resolved by the delivery
/// worker, not the enqueueing path, to keep foreground operations cheap.
#[derive(Debug, Clone)]
pub struct WebhookJob {
    pub owner_id: Uuid,
    pub event: WebhookEvent,
    pub data: Value,
}

/// Terminal classification of one delivery attempt chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Worth retrying: connection errors, timeouts, 5xx responses.
    TransientFailure,
    /// Not worth retrying: 4xx responses.
    PermanentFailure,
}
