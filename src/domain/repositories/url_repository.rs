//! Repository trait for URL mapping data access.

use crate::domain::entities::{NewUrlMapping, UrlMapping};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Whitelisted sort columns for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    CreatedAt,
    AccessCount,
    LastAccessedAt,
    ShortCode,
    ExpiresAt,
}

impl SortColumn {
    /// Column name as it appears in SQL. Values are fixed at compile time,
    /// never interpolated from user input.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortColumn::CreatedAt => "created_at",
            SortColumn::AccessCount => "access_count",
            SortColumn::LastAccessedAt => "last_accessed_at",
            SortColumn::ShortCode => "short_code",
            SortColumn::ExpiresAt => "expires_at",
        }
    }

    /// Parses the query-string form; unknown values are rejected rather
    /// than defaulted so typos surface.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created_at" => Some(SortColumn::CreatedAt),
            "access_count" => Some(SortColumn::AccessCount),
            "last_accessed_at" => Some(SortColumn::LastAccessedAt),
            "short_code" => Some(SortColumn::ShortCode),
            "expires_at" => Some(SortColumn::ExpiresAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Filter, sort and page parameters for owner listings.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Case-insensitive substring match over `short_code` and `long_url`.
    pub search: Option<String>,
    pub is_custom_alias: Option<bool>,
    pub has_expiry: Option<bool>,
    pub is_expired: Option<bool>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub min_access_count: Option<i64>,
    pub max_access_count: Option<i64>,
    pub sort_by: SortColumn,
    pub order: SortOrder,
    /// 1-indexed.
    pub page: i64,
    pub page_size: i64,
}

/// One page of results plus the unpaged total.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Per-element outcomes of a batch soft-delete. The batch is not atomic;
/// codes that were absent, already deleted, or out of scope land in
/// `failed`.
#[derive(Debug, Clone, Default)]
pub struct BulkDeleteOutcome {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

/// Repository interface for URL mappings.
///
/// Single-row operations are atomic; uniqueness of active short codes is
/// enforced by the storage layer and surfaced as [`AppError::AliasTaken`].
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Atomically inserts a non-deleted mapping.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::AliasTaken`] when the short code is already held
    /// by a non-deleted row (the partial unique index), and
    /// [`AppError::Internal`] on database errors.
    async fn create(&self, new: NewUrlMapping) -> Result<UrlMapping, AppError>;

    /// Finds a mapping by short code, excluding soft-deleted rows.
    async fn find_by_code(&self, code: &str) -> Result<Option<UrlMapping>, AppError>;

    /// Most recent non-deleted, non-expired mapping with the given dedup
    /// hash and owner. Owner scoping is strict: anonymous hashes never
    /// match user-owned rows and vice-versa.
    async fn find_active_by_hash(
        &self,
        hash: &str,
        owner_id: Option<Uuid>,
    ) -> Result<Option<UrlMapping>, AppError>;

    /// Replaces the expiry of a non-deleted mapping (`None` clears it).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no non-deleted row matches.
    async fn update_expiry(
        &self,
        code: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<UrlMapping, AppError>;

    /// Marks a mapping deleted. Returns the deletion timestamp, or `None`
    /// when no non-deleted row matched (idempotent tail).
    async fn soft_delete(&self, code: &str) -> Result<Option<DateTime<Utc>>, AppError>;

    /// Soft-deletes a batch, optionally scoped to an owner (admins pass
    /// `None`). Reports per-element outcomes.
    async fn bulk_soft_delete(
        &self,
        codes: &[String],
        owner_scope: Option<Uuid>,
    ) -> Result<BulkDeleteOutcome, AppError>;

    /// Best-effort counter bump plus `last_accessed_at = now()`.
    ///
    /// Failures are logged and swallowed; the redirect path must never
    /// block or fail on accounting.
    async fn increment_access(&self, code: &str);

    /// Lists an owner's non-deleted mappings with filters, sort and
    /// pagination.
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        query: &ListQuery,
    ) -> Result<Page<UrlMapping>, AppError>;

    /// Non-deleted mappings whose expiry falls inside `[from, to)`.
    async fn find_expiring(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UrlMapping>, AppError>;

    /// Row ids of soft-deleted mappings whose deletion predates `cutoff`.
    ///
    /// Keyed by row id rather than code: deleted codes are not unique, a
    /// reissued code may have a deleted namesake.
    async fn find_soft_deleted_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<i64>, AppError>;

    /// Physically removes soft-deleted rows by id. Returns the number of
    /// rows removed.
    async fn hard_delete(&self, ids: &[i64]) -> Result<u64, AppError>;
}
