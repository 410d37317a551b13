//! Request and response DTOs for the URL endpoints.
//!
//! Boundary naming: snake_case fields (`short_code`, `long_url`,
//! `is_custom_alias`, `expires_at`); camelCase aliases are accepted on
//! input for compatibility with the older request scheme. The delete
//! response's `deletedAt` and the pagination block are camelCase on the
//! wire by contract.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use std::sync::LazyLock;
use validator::Validate;

use crate::domain::entities::UrlMapping;
use crate::domain::repositories::{ListQuery, SortColumn, SortOrder};
use crate::error::AppError;

/// Compiled regex for custom alias validation.
static ALIAS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,50}$").unwrap());

/// Request to create a short URL.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUrlRequest {
    /// The destination URL (absolute HTTP/HTTPS, at most 2048 characters).
    #[validate(length(max = 2048), url(message = "Invalid URL format"))]
    pub url: String,

    /// Optional user-chosen short code.
    #[serde(default, alias = "customAlias")]
    #[validate(regex(path = "*ALIAS_REGEX"))]
    pub custom_alias: Option<String>,

    /// Optional lifetime in days; tier limits apply.
    #[serde(default, alias = "expiryDays")]
    #[validate(range(min = 1, max = 3650))]
    pub expiry_days: Option<i64>,
}

/// Body of a successful create.
#[derive(Debug, Serialize)]
pub struct CreatedUrlResponse {
    pub short_code: String,
    pub short_url: String,
    pub long_url: String,
    pub is_custom_alias: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub was_reused: bool,
    pub created_at: DateTime<Utc>,
}

/// One mapping in a listing.
#[derive(Debug, Serialize)]
pub struct UrlSummary {
    pub short_code: String,
    pub short_url: String,
    pub long_url: String,
    pub is_custom_alias: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub access_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl UrlSummary {
    pub fn from_mapping(mapping: &UrlMapping, short_url: String) -> Self {
        Self {
            short_code: mapping.short_code.clone(),
            short_url,
            long_url: mapping.long_url.clone(),
            is_custom_alias: mapping.is_custom_alias,
            created_at: mapping.created_at,
            expires_at: mapping.expires_at,
            access_count: mapping.access_count,
            last_accessed_at: mapping.last_accessed_at,
        }
    }
}

/// Body of the API resolve form (`GET /urls/{code}`).
#[derive(Debug, Serialize)]
pub struct UrlInfoResponse {
    pub long_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub access_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

/// Body of a successful delete.
#[derive(Debug, Serialize)]
pub struct DeleteUrlResponse {
    pub short_code: String,
    #[serde(rename = "deletedAt")]
    pub deleted_at: DateTime<Utc>,
}

/// Request to replace a mapping's expiry. A `null` (or absent)
/// `expires_at` clears the expiry, for tiers that allow it.
#[derive(Debug, Deserialize)]
pub struct UpdateExpiryRequest {
    #[serde(default, alias = "expiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Body of a successful expiry update.
#[derive(Debug, Serialize)]
pub struct UpdatedExpiryResponse {
    pub short_code: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request for a batch soft-delete.
#[derive(Debug, Deserialize, Validate)]
pub struct BulkDeleteRequest {
    #[validate(length(min = 1, max = 100))]
    pub codes: Vec<String>,
}

/// Per-element outcome of a batch soft-delete.
#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

/// Query parameters for the alias availability probe.
#[derive(Debug, Deserialize)]
pub struct CheckAliasParams {
    pub alias: String,
}

/// Body of the alias availability probe.
#[derive(Debug, Serialize)]
pub struct CheckAliasResponse {
    pub available: bool,
    pub suggestions: Vec<String>,
}

/// Query parameters for listing the caller's URLs.
///
/// Uses `serde_with` to parse numeric and boolean filters from query
/// strings.
#[serde_as]
#[derive(Debug, Deserialize, Default)]
pub struct ListUrlsParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<u32>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page_size: Option<u32>,

    #[serde(default)]
    pub search: Option<String>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub is_custom_alias: Option<bool>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub has_expiry: Option<bool>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub is_expired: Option<bool>,

    #[serde(default)]
    pub created_from: Option<DateTime<Utc>>,

    #[serde(default)]
    pub created_to: Option<DateTime<Utc>>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub min_access_count: Option<i64>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub max_access_count: Option<i64>,

    #[serde(default)]
    pub sort_by: Option<String>,

    #[serde(default)]
    pub order: Option<String>,
}

impl ListUrlsParams {
    /// Validates the parameters and converts them to the repository
    /// contract.
    ///
    /// # Defaults
    ///
    /// - `page`: 1
    /// - `page_size`: 25 (valid range 1-100)
    /// - sort: `created_at desc`
    pub fn into_query(self) -> Result<(ListQuery, u32, u32), AppError> {
        let page = self.page.unwrap_or(1);
        let page_size = self.page_size.unwrap_or(25);

        if page == 0 {
            return Err(AppError::invalid_url(
                "Page must be greater than 0",
                serde_json::json!({ "page": page }),
            ));
        }
        if !(1..=100).contains(&page_size) {
            return Err(AppError::invalid_url(
                "Page size must be between 1 and 100",
                serde_json::json!({ "page_size": page_size }),
            ));
        }

        let sort_by = match self.sort_by.as_deref() {
            None => SortColumn::default(),
            Some(raw) => SortColumn::parse(raw).ok_or_else(|| {
                AppError::invalid_url(
                    "Unknown sort column",
                    serde_json::json!({ "sort_by": raw }),
                )
            })?,
        };

        let order = match self.order.as_deref() {
            None => SortOrder::default(),
            Some(raw) => SortOrder::parse(raw).ok_or_else(|| {
                AppError::invalid_url(
                    "Sort order must be 'asc' or 'desc'",
                    serde_json::json!({ "order": raw }),
                )
            })?,
        };

        let query = ListQuery {
            search: self.search.filter(|s| !s.trim().is_empty()),
            is_custom_alias: self.is_custom_alias,
            has_expiry: self.has_expiry,
            is_expired: self.is_expired,
            created_from: self.created_from,
            created_to: self.created_to,
            min_access_count: self.min_access_count,
            max_access_count: self.max_access_count,
            sort_by,
            order,
            page: i64::from(page),
            page_size: i64::from(page_size),
        };

        Ok((query, page, page_size))
    }
}
