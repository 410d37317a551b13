//! Handlers for the `/api/v1/urls` endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::api::dto::{
    ApiResponse, BulkDeleteRequest, BulkDeleteResponse, CheckAliasParams, CheckAliasResponse,
    CreateUrlRequest, CreatedUrlResponse, DeleteUrlResponse, ListResponse, ListUrlsParams,
    PaginationMeta, UpdateExpiryRequest, UpdatedExpiryResponse, UrlInfoResponse, UrlSummary,
};
use crate::application::services::CreateUrlCommand;
use crate::domain::entities::Principal;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short URL.
///
/// # Endpoint
///
/// `POST /api/v1/urls` - anonymous callers are allowed; their mappings are
/// unowned and carry the guest expiry ceiling.
///
/// # Responses
///
/// - `201` with the created (or reused) mapping
/// - `400 INVALID_URL` / `400 INVALID_ALIAS`
/// - `409 ALIAS_TAKEN` (with suggestions in the details)
/// - `503 GENERATION_FAILED` when the allocator loses every retry
pub async fn create_url_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateUrlRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = state
        .url_service
        .create(
            &principal,
            CreateUrlCommand {
                long_url: payload.url,
                custom_alias: payload.custom_alias,
                expiry_days: payload.expiry_days,
            },
        )
        .await?;

    let mapping = &outcome.mapping;
    let body = CreatedUrlResponse {
        short_code: mapping.short_code.clone(),
        short_url: state.url_service.short_url(&mapping.short_code),
        long_url: mapping.long_url.clone(),
        is_custom_alias: mapping.is_custom_alias,
        expires_at: mapping.expires_at,
        was_reused: outcome.was_reused,
        created_at: mapping.created_at,
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(body))))
}

/// Lists the caller's URLs with filters, sort and pagination.
///
/// # Endpoint
///
/// `GET /api/v1/urls` - requires authentication; owners see only their own
/// mappings.
pub async fn list_urls_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<ListUrlsParams>,
) -> Result<impl IntoResponse, AppError> {
    let (query, page, page_size) = params.into_query()?;

    let result = state.url_service.list(&principal, &query).await?;

    let data = result
        .items
        .iter()
        .map(|m| UrlSummary::from_mapping(m, state.url_service.short_url(&m.short_code)))
        .collect();

    Ok(Json(ListResponse::ok(
        data,
        PaginationMeta::new(page, page_size, result.total),
    )))
}

/// Resolves a short code through the API (no redirect, no click).
///
/// # Endpoint
///
/// `GET /api/v1/urls/{code}`
///
/// # Responses
///
/// - `200` with destination and access metadata
/// - `404 NOT_FOUND` for unknown or soft-deleted codes
/// - `410 GONE` for expired ones
pub async fn get_url_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mapping = state.url_service.get_info(&code).await?;

    Ok(Json(ApiResponse::ok(UrlInfoResponse {
        long_url: mapping.long_url,
        created_at: mapping.created_at,
        expires_at: mapping.expires_at,
        access_count: mapping.access_count,
        last_accessed_at: mapping.last_accessed_at,
    })))
}

/// Soft-deletes a short URL.
///
/// # Endpoint
///
/// `DELETE /api/v1/urls/{code}` - owner or admin only; anonymous mappings
/// are closed to this surface.
pub async fn delete_url_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let deleted_at = state.url_service.delete(&principal, &code).await?;

    Ok(Json(ApiResponse::ok(DeleteUrlResponse {
        short_code: code,
        deleted_at,
    })))
}

/// Replaces a mapping's expiry.
///
/// # Endpoint
///
/// `PATCH /api/v1/urls/{code}/expiry` - owner or admin only. `null`
/// clears the expiry where the tier allows it.
pub async fn update_expiry_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(code): Path<String>,
    Json(payload): Json<UpdateExpiryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mapping = state
        .url_service
        .update_expiry(&principal, &code, payload.expires_at)
        .await?;

    Ok(Json(ApiResponse::ok(UpdatedExpiryResponse {
        short_code: mapping.short_code,
        expires_at: mapping.expires_at,
    })))
}

/// Soft-deletes a batch of the caller's URLs.
///
/// # Endpoint
///
/// `POST /api/v1/urls/bulk-delete` - premium tier and above. Outcomes are
/// reported per code; the batch is not atomic.
pub async fn bulk_delete_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = state
        .url_service
        .bulk_delete(&principal, payload.codes)
        .await?;

    Ok(Json(ApiResponse::ok(BulkDeleteResponse {
        deleted: outcome.deleted,
        failed: outcome.failed,
    })))
}

/// Probes whether an alias is free.
///
/// # Endpoint
///
/// `GET /api/v1/urls/check-alias?alias=…`
///
/// Reserved or taken aliases report `available: false` with alternatives;
/// a malformed alias is `400 INVALID_ALIAS`.
pub async fn check_alias_handler(
    State(state): State<AppState>,
    Query(params): Query<CheckAliasParams>,
) -> Result<impl IntoResponse, AppError> {
    let availability = state.url_service.check_alias(&params.alias).await?;

    Ok(Json(ApiResponse::ok(CheckAliasResponse {
        available: availability.available,
        suggestions: availability.suggestions,
    })))
}

/// Fires a `webhook.test` delivery at the caller's configured endpoint.
///
/// # Endpoint
///
/// `POST /api/v1/webhooks/test` - requires authentication. Delivery is
/// asynchronous; a `200` means the event was queued, not received.
pub async fn webhook_test_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, AppError> {
    state.url_service.send_test_webhook(&principal).await?;

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "queued": true
    }))))
}
