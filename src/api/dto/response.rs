//! Response envelope shared by all wrapped API endpoints.
//!
//! Success bodies follow `{success, data, meta}`; errors are produced by
//! [`crate::error::AppError`] as `{success, error, message, details, meta}`.
//! The redirect host bypasses the envelope entirely.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Response metadata.
#[derive(Debug, Serialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
}

impl Meta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
        }
    }
}

/// Standard success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub meta: Meta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: Meta::now(),
        }
    }
}

/// Envelope for paginated listings; the pagination block sits beside the
/// data array, matching the wire contract.
#[derive(Debug, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
    pub meta: Meta,
}

impl<T: Serialize> ListResponse<T> {
    pub fn ok(data: Vec<T>, pagination: PaginationMeta) -> Self {
        Self {
            success: true,
            data,
            pagination,
            meta: Meta::now(),
        }
    }
}

/// Pagination block. Field names are camelCase on the wire, per contract.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: u32,
    pub page_size: u32,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationMeta {
    pub fn new(current_page: u32, page_size: u32, total_items: i64) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            (total_items + i64::from(page_size) - 1) / i64::from(page_size)
        };

        Self {
            current_page,
            page_size,
            total_items,
            total_pages,
            has_next_page: i64::from(current_page) < total_pages,
            has_prev_page: current_page > 1,
        }
    }
}
