//! PostgreSQL implementation of user and notification-settings reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{DuplicateStrategy, NotificationSettings, Tier, User};
use crate::domain::repositories::UserRepository;
use crate::error::AppError;

/// Private row type; tier and duplicate-strategy land as text and are
/// parsed into their domain enums on the way out.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    tier: String,
    is_active: bool,
    is_admin: bool,
    duplicate_strategy: String,
    default_ttl_days: Option<i32>,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        let tier = Tier::parse(&self.tier).unwrap_or_else(|| {
            tracing::warn!(user_id = %self.id, tier = %self.tier, "Unknown tier in storage");
            Tier::Standard
        });
        let duplicate_strategy = DuplicateStrategy::parse(&self.duplicate_strategy)
            .unwrap_or_default();

        User {
            id: self.id,
            email: self.email,
            tier,
            is_active: self.is_active,
            is_admin: self.is_admin,
            duplicate_strategy,
            default_ttl_days: self.default_ttl_days,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SettingsRow {
    user_id: Uuid,
    webhook_url: Option<String>,
    webhook_secret: Option<String>,
    on_created: bool,
    on_clicked: bool,
    on_expired: bool,
    on_deleted: bool,
}

impl SettingsRow {
    fn into_settings(self) -> NotificationSettings {
        NotificationSettings {
            user_id: self.user_id,
            webhook_url: self.webhook_url,
            webhook_secret: self.webhook_secret,
            on_created: self.on_created,
            on_clicked: self.on_clicked,
            on_expired: self.on_expired,
            on_deleted: self.on_deleted,
        }
    }
}

const USER_COLUMNS: &str =
    "id, email, tier, is_active, is_admin, duplicate_strategy, default_ttl_days, created_at";

/// PostgreSQL repository for user reads.
pub struct PgUserRepository {
    pool: Arc<PgPool>,
}

impl PgUserRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE api_token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn notification_settings(
        &self,
        user_id: Uuid,
    ) -> Result<Option<NotificationSettings>, AppError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            SELECT user_id, webhook_url, webhook_secret,
                   on_created, on_clicked, on_expired, on_deleted
            FROM notification_settings
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(SettingsRow::into_settings))
    }
}
