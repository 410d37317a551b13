//! User entity and per-user preferences.
//!
//! The core reads users; it never creates or mutates them. Credential
//! issuance and account management live outside this service.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::webhook::WebhookEvent;

/// Ordinal capability level. Ordering matters: `Standard < Premium <
/// Enterprise`, so tier gates compare with `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Standard,
    Premium,
    Enterprise,
}

impl Tier {
    /// Parses the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Tier::Standard),
            "premium" => Some(Tier::Premium),
            "enterprise" => Some(Tier::Enterprise),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Standard => "standard",
            Tier::Premium => "premium",
            Tier::Enterprise => "enterprise",
        }
    }

    /// Maximum TTL in days for mappings created at this tier, `None`
    /// meaning unlimited.
    pub fn max_ttl_days(&self) -> Option<i64> {
        match self {
            Tier::Standard => Some(365),
            Tier::Premium | Tier::Enterprise => None,
        }
    }

    /// Whether mappings at this tier may carry no expiry at all.
    pub fn allows_no_expiry(&self) -> bool {
        !matches!(self, Tier::Standard)
    }
}

/// What `create` does when the same owner shortens the same URL twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateStrategy {
    ReuseExisting,
    #[default]
    GenerateNew,
}

impl DuplicateStrategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reuse_existing" => Some(DuplicateStrategy::ReuseExisting),
            "generate_new" => Some(DuplicateStrategy::GenerateNew),
            _ => None,
        }
    }
}

/// A registered user as seen by the core.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub tier: Tier,
    pub is_active: bool,
    pub is_admin: bool,
    pub duplicate_strategy: DuplicateStrategy,
    pub default_ttl_days: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Per-user webhook endpoint configuration.
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub user_id: Uuid,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub on_created: bool,
    pub on_clicked: bool,
    pub on_expired: bool,
    pub on_deleted: bool,
}

impl NotificationSettings {
    /// Returns the target URL if webhooks are configured and the event is
    /// enabled for this user.
    pub fn target_for(&self, event: WebhookEvent) -> Option<&str> {
        let enabled = match event {
            WebhookEvent::UrlCreated => self.on_created,
            WebhookEvent::UrlClicked => self.on_clicked,
            WebhookEvent::UrlExpired => self.on_expired,
            WebhookEvent::UrlDeleted => self.on_deleted,
            // Test deliveries fire whenever a URL is configured.
            WebhookEvent::Test => true,
        };

        if !enabled {
            return None;
        }
        self.webhook_url.as_deref().filter(|u| !u.is_empty())
    }
}
