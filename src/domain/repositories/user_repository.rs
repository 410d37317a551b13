//! Repository trait for user and notification-settings reads.
//!
//! The core never writes these tables; provisioning is external.

use crate::domain::entities::{NotificationSettings, User};
use crate::error::AppError;
use async_trait::async_trait;
use uuid::Uuid;

/// Read-only access to users and their webhook configuration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Looks up a user by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Looks up a user by the HMAC of their opaque API credential.
    ///
    /// The raw credential never reaches storage; only its keyed hash does.
    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<User>, AppError>;

    /// Fetches a user's webhook settings, if any are configured.
    async fn notification_settings(
        &self,
        user_id: Uuid,
    ) -> Result<Option<NotificationSettings>, AppError>;
}
