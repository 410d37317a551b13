//! PostgreSQL implementation of the URL mapping repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{NewUrlMapping, UrlMapping};
use crate::domain::repositories::{BulkDeleteOutcome, ListQuery, Page, UrlRepository};
use crate::error::AppError;

const MAPPING_COLUMNS: &str = "id, short_code, long_url, long_url_hash, owner_id, \
     is_custom_alias, access_count, created_at, expires_at, last_accessed_at, \
     is_deleted, deleted_at";

/// PostgreSQL repository for URL mappings.
///
/// Uniqueness of active short codes rests on the partial unique index
/// `url_mappings_active_code_key`; a violation surfaces to callers as
/// [`AppError::AliasTaken`] via the shared SQLx error mapping.
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
}

impl PgUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

/// Escapes LIKE wildcards in a user-supplied search term.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Appends the shared WHERE clause for owner listings.
fn push_list_filters(qb: &mut QueryBuilder<'_, Postgres>, owner_id: Uuid, query: &ListQuery) {
    qb.push(" WHERE owner_id = ");
    qb.push_bind(owner_id);
    qb.push(" AND NOT is_deleted");

    if let Some(ref search) = query.search {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (short_code ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR long_url ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    if let Some(is_custom) = query.is_custom_alias {
        qb.push(" AND is_custom_alias = ");
        qb.push_bind(is_custom);
    }

    if let Some(has_expiry) = query.has_expiry {
        if has_expiry {
            qb.push(" AND expires_at IS NOT NULL");
        } else {
            qb.push(" AND expires_at IS NULL");
        }
    }

    if let Some(is_expired) = query.is_expired {
        if is_expired {
            qb.push(" AND expires_at IS NOT NULL AND expires_at <= now()");
        } else {
            qb.push(" AND (expires_at IS NULL OR expires_at > now())");
        }
    }

    if let Some(from) = query.created_from {
        qb.push(" AND created_at >= ");
        qb.push_bind(from);
    }
    if let Some(to) = query.created_to {
        qb.push(" AND created_at <= ");
        qb.push_bind(to);
    }

    if let Some(min) = query.min_access_count {
        qb.push(" AND access_count >= ");
        qb.push_bind(min);
    }
    if let Some(max) = query.max_access_count {
        qb.push(" AND access_count <= ");
        qb.push_bind(max);
    }
}

#[async_trait]
impl UrlRepository for PgUrlRepository {
    async fn create(&self, new: NewUrlMapping) -> Result<UrlMapping, AppError> {
        let mapping = sqlx::query_as::<_, UrlMapping>(&format!(
            r#"
            INSERT INTO url_mappings
                (short_code, long_url, long_url_hash, owner_id, is_custom_alias, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MAPPING_COLUMNS}
            "#
        ))
        .bind(&new.short_code)
        .bind(&new.long_url)
        .bind(&new.long_url_hash)
        .bind(new.owner_id)
        .bind(new.is_custom_alias)
        .bind(new.expires_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(mapping)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<UrlMapping>, AppError> {
        let mapping = sqlx::query_as::<_, UrlMapping>(&format!(
            r#"
            SELECT {MAPPING_COLUMNS}
            FROM url_mappings
            WHERE short_code = $1 AND NOT is_deleted
            "#
        ))
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(mapping)
    }

    async fn find_active_by_hash(
        &self,
        hash: &str,
        owner_id: Option<Uuid>,
    ) -> Result<Option<UrlMapping>, AppError> {
        // IS NOT DISTINCT FROM keeps the owner scoping strict for the
        // anonymous (NULL) case as well.
        let mapping = sqlx::query_as::<_, UrlMapping>(&format!(
            r#"
            SELECT {MAPPING_COLUMNS}
            FROM url_mappings
            WHERE long_url_hash = $1
              AND owner_id IS NOT DISTINCT FROM $2
              AND NOT is_deleted
              AND (expires_at IS NULL OR expires_at > now())
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(hash)
        .bind(owner_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(mapping)
    }

    async fn update_expiry(
        &self,
        code: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<UrlMapping, AppError> {
        let mapping = sqlx::query_as::<_, UrlMapping>(&format!(
            r#"
            UPDATE url_mappings
            SET expires_at = $2
            WHERE short_code = $1 AND NOT is_deleted
            RETURNING {MAPPING_COLUMNS}
            "#
        ))
        .bind(code)
        .bind(expires_at)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or_else(|| {
            AppError::not_found("Short URL not found", serde_json::json!({ "code": code }))
        })?;

        Ok(mapping)
    }

    async fn soft_delete(&self, code: &str) -> Result<Option<DateTime<Utc>>, AppError> {
        let deleted_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            UPDATE url_mappings
            SET is_deleted = TRUE, deleted_at = now()
            WHERE short_code = $1 AND NOT is_deleted
            RETURNING deleted_at
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(deleted_at)
    }

    async fn bulk_soft_delete(
        &self,
        codes: &[String],
        owner_scope: Option<Uuid>,
    ) -> Result<BulkDeleteOutcome, AppError> {
        let deleted: Vec<String> = if let Some(owner_id) = owner_scope {
            sqlx::query_scalar(
                r#"
                UPDATE url_mappings
                SET is_deleted = TRUE, deleted_at = now()
                WHERE short_code = ANY($1) AND NOT is_deleted AND owner_id = $2
                RETURNING short_code
                "#,
            )
            .bind(codes)
            .bind(owner_id)
            .fetch_all(self.pool.as_ref())
            .await?
        } else {
            sqlx::query_scalar(
                r#"
                UPDATE url_mappings
                SET is_deleted = TRUE, deleted_at = now()
                WHERE short_code = ANY($1) AND NOT is_deleted
                RETURNING short_code
                "#,
            )
            .bind(codes)
            .fetch_all(self.pool.as_ref())
            .await?
        };

        let failed = codes
            .iter()
            .filter(|c| !deleted.contains(c))
            .cloned()
            .collect();

        Ok(BulkDeleteOutcome { deleted, failed })
    }

    async fn increment_access(&self, code: &str) {
        let result = sqlx::query(
            r#"
            UPDATE url_mappings
            SET access_count = access_count + 1, last_accessed_at = now()
            WHERE short_code = $1 AND NOT is_deleted
            "#,
        )
        .bind(code)
        .execute(self.pool.as_ref())
        .await;

        if let Err(e) = result {
            // Accounting is best-effort; the redirect has already been served.
            metrics::counter!("access_count_update_failures_total").increment(1);
            tracing::warn!(code, error = %e, "Failed to record access");
        }
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        query: &ListQuery,
    ) -> Result<Page<UrlMapping>, AppError> {
        let mut count_qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM url_mappings");
        push_list_filters(&mut count_qb, owner_id, query);

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool.as_ref())
            .await?;

        let mut items_qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {MAPPING_COLUMNS} FROM url_mappings"));
        push_list_filters(&mut items_qb, owner_id, query);

        // Sort column and direction come from closed enums, never from input.
        items_qb.push(format!(
            " ORDER BY {} {} NULLS LAST",
            query.sort_by.as_sql(),
            query.order.as_sql()
        ));

        let offset = (query.page - 1).max(0) * query.page_size;
        items_qb.push(" LIMIT ");
        items_qb.push_bind(query.page_size);
        items_qb.push(" OFFSET ");
        items_qb.push_bind(offset);

        let items = items_qb
            .build_query_as::<UrlMapping>()
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(Page { items, total })
    }

    async fn find_expiring(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UrlMapping>, AppError> {
        let mappings = sqlx::query_as::<_, UrlMapping>(&format!(
            r#"
            SELECT {MAPPING_COLUMNS}
            FROM url_mappings
            WHERE NOT is_deleted
              AND expires_at >= $1
              AND expires_at < $2
            ORDER BY expires_at
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(mappings)
    }

    async fn find_soft_deleted_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM url_mappings
            WHERE is_deleted AND deleted_at < $1
            "#,
        )
        .bind(cutoff)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(ids)
    }

    async fn hard_delete(&self, ids: &[i64]) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM url_mappings
            WHERE id = ANY($1) AND is_deleted
            "#,
        )
        .bind(ids)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }
}
