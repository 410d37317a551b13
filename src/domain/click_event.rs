//! Click event emitted by the redirect hot path.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A single redirect hit, queued for asynchronous processing.
///
/// Serializable so the analytics sink can forward the raw event to the
/// external aggregation pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ClickEvent {
    pub short_code: String,
    /// Owner of the mapping at resolve time; lets the click worker dispatch
    /// `url.clicked` webhooks without a second repository read.
    pub owner_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

impl ClickEvent {
    pub fn new(
        short_code: String,
        owner_id: Option<Uuid>,
        ip: Option<String>,
        user_agent: Option<&str>,
        referrer: Option<&str>,
    ) -> Self {
        Self {
            short_code,
            owner_id,
            occurred_at: Utc::now(),
            ip,
            user_agent: user_agent.map(str::to_string),
            referrer: referrer.map(str::to_string),
        }
    }
}
