//! Application error types and HTTP response conversion.
//!
//! Defines a unified error type ([`AppError`]) with one variant per stable
//! wire code. Every API response body follows the
//! `{success, error, message, details, meta}` envelope; the redirect host
//! bypasses this module and emits raw HTTP statuses.
//!
//! ## Wire codes
//!
//! | Variant | Status | Code |
//! |---|---|---|
//! | [`AppError::InvalidUrl`] | 400 | `INVALID_URL` |
//! | [`AppError::InvalidAlias`] | 400 | `INVALID_ALIAS` |
//! | [`AppError::AliasTaken`] | 409 | `ALIAS_TAKEN` |
//! | [`AppError::NotFound`] | 404 | `NOT_FOUND` |
//! | [`AppError::Gone`] | 410 | `GONE` |
//! | [`AppError::Unauthenticated`] | 401 | `UNAUTHORIZED` |
//! | [`AppError::Forbidden`] | 403 | `FORBIDDEN` |
//! | [`AppError::InsufficientTier`] | 403 | `INSUFFICIENT_TIER` |
//! | [`AppError::GenerationExhausted`] | 503 | `GENERATION_FAILED` |
//! | [`AppError::Internal`] | 500 | `INTERNAL_ERROR` |
//!
//! ## Database error mapping
//!
//! SQLx errors are converted via [`From<SqlxError>`]:
//! - Unique constraint violation on the active-code index → [`AppError::AliasTaken`]
//! - Check violations → [`AppError::InvalidUrl`]
//! - Row not found → [`AppError::NotFound`]
//! - Pool/connection issues → [`AppError::Internal`] with retry hints
//!
//! All database errors emit counters via `metrics::counter!`.

use axum::{
    Json,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::Error as SqlxError;
use validator::ValidationErrors;

/// JSON error envelope returned to API consumers.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    details: Value,
    meta: ErrorMeta,
}

#[derive(Serialize)]
struct ErrorMeta {
    timestamp: chrono::DateTime<Utc>,
}

/// Structured error information, used where a batch response embeds
/// per-element failures instead of failing the whole request.
#[derive(Debug, Serialize, Clone)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

/// Application-level error with a stable wire code and HTTP mapping.
#[derive(Debug)]
pub enum AppError {
    InvalidUrl { message: String, details: Value },
    InvalidAlias { message: String, details: Value },
    AliasTaken { message: String, details: Value },
    NotFound { message: String, details: Value },
    Gone { message: String, details: Value },
    Unauthenticated { message: String, details: Value },
    Forbidden { message: String, details: Value },
    InsufficientTier { message: String, details: Value },
    GenerationExhausted { message: String, details: Value },
    Internal { message: String, details: Value },
}

impl AppError {
    /// Creates an invalid-URL error (400 `INVALID_URL`).
    pub fn invalid_url(message: impl Into<String>, details: Value) -> Self {
        Self::InvalidUrl {
            message: message.into(),
            details,
        }
    }

    /// Creates an invalid-alias error (400 `INVALID_ALIAS`).
    pub fn invalid_alias(message: impl Into<String>, details: Value) -> Self {
        Self::InvalidAlias {
            message: message.into(),
            details,
        }
    }

    /// Creates an alias-conflict error (409 `ALIAS_TAKEN`).
    pub fn alias_taken(message: impl Into<String>, details: Value) -> Self {
        Self::AliasTaken {
            message: message.into(),
            details,
        }
    }

    /// Creates a not-found error (404 `NOT_FOUND`).
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }

    /// Creates a gone error (410 `GONE`) for expired mappings.
    pub fn gone(message: impl Into<String>, details: Value) -> Self {
        Self::Gone {
            message: message.into(),
            details,
        }
    }

    /// Creates an unauthenticated error (401 `UNAUTHORIZED`).
    pub fn unauthenticated(message: impl Into<String>, details: Value) -> Self {
        Self::Unauthenticated {
            message: message.into(),
            details,
        }
    }

    /// Creates a forbidden error (403 `FORBIDDEN`).
    pub fn forbidden(message: impl Into<String>, details: Value) -> Self {
        Self::Forbidden {
            message: message.into(),
            details,
        }
    }

    /// Creates a tier-gate error (403 `INSUFFICIENT_TIER`).
    pub fn insufficient_tier(message: impl Into<String>, details: Value) -> Self {
        Self::InsufficientTier {
            message: message.into(),
            details,
        }
    }

    /// Creates a generation-exhausted error (503 `GENERATION_FAILED`).
    pub fn generation_exhausted(message: impl Into<String>, details: Value) -> Self {
        Self::GenerationExhausted {
            message: message.into(),
            details,
        }
    }

    /// Creates an internal server error (500 `INTERNAL_ERROR`).
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Stable wire code for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidUrl { .. } => "INVALID_URL",
            AppError::InvalidAlias { .. } => "INVALID_ALIAS",
            AppError::AliasTaken { .. } => "ALIAS_TAKEN",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Gone { .. } => "GONE",
            AppError::Unauthenticated { .. } => "UNAUTHORIZED",
            AppError::Forbidden { .. } => "FORBIDDEN",
            AppError::InsufficientTier { .. } => "INSUFFICIENT_TIER",
            AppError::GenerationExhausted { .. } => "GENERATION_FAILED",
            AppError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for the variant.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidUrl { .. } | AppError::InvalidAlias { .. } => StatusCode::BAD_REQUEST,
            AppError::AliasTaken { .. } => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Gone { .. } => StatusCode::GONE,
            AppError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } | AppError::InsufficientTier { .. } => StatusCode::FORBIDDEN,
            AppError::GenerationExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converts the error into structured error info for batch embedding.
    pub fn to_error_info(self) -> ErrorInfo {
        let code = self.code();
        let (message, details) = self.into_parts();
        ErrorInfo {
            code,
            message,
            details,
        }
    }

    fn into_parts(self) -> (String, Value) {
        match self {
            AppError::InvalidUrl { message, details }
            | AppError::InvalidAlias { message, details }
            | AppError::AliasTaken { message, details }
            | AppError::NotFound { message, details }
            | AppError::Gone { message, details }
            | AppError::Unauthenticated { message, details }
            | AppError::Forbidden { message, details }
            | AppError::InsufficientTier { message, details }
            | AppError::GenerationExhausted { message, details }
            | AppError::Internal { message, details } => (message, details),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let add_www_authenticate = matches!(self, AppError::Unauthenticated { .. });

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(code, "Internal error surfaced to client");
        }

        let (message, details) = self.into_parts();

        let body = ErrorBody {
            success: false,
            error: code,
            message,
            details,
            meta: ErrorMeta {
                timestamp: Utc::now(),
            },
        };

        if add_www_authenticate {
            let mut headers = HeaderMap::new();
            headers.insert(header::WWW_AUTHENTICATE, "Bearer".parse().unwrap());
            (status, headers, Json(body)).into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}

impl From<SqlxError> for AppError {
    fn from(e: SqlxError) -> Self {
        map_sqlx_error(e)
    }
}

/// Maps SQLx errors to application errors with detailed context.
///
/// Constraint violations, connection issues, and other database errors map to
/// the wire table, with metrics emission per failure class.
pub fn map_sqlx_error(e: SqlxError) -> AppError {
    #[cfg(debug_assertions)]
    tracing::debug!(error = ?e, "Full sqlx error in debug mode");

    match &e {
        SqlxError::Database(db_err) => {
            if db_err.is_unique_violation() {
                metrics::counter!("database_errors_total", "type" => "unique_violation")
                    .increment(1);

                let constraint = db_err.constraint().unwrap_or("unknown");
                let message = match constraint {
                    "url_mappings_active_code_key" => "This short code is already in use",
                    "users_email_key" => "Email already registered",
                    "users_api_token_hash_key" => "Token already exists",
                    _ => {
                        tracing::warn!(
                            constraint = constraint,
                            "Unknown unique constraint violated"
                        );
                        "Resource already exists"
                    }
                };

                return AppError::alias_taken(
                    message,
                    json!({
                        "constraint": constraint,
                        "type": "unique_violation"
                    }),
                );
            }

            if db_err.is_foreign_key_violation() {
                metrics::counter!("database_errors_total", "type" => "foreign_key_violation")
                    .increment(1);

                let constraint = db_err.constraint().unwrap_or("unknown");
                tracing::warn!(constraint = constraint, "Foreign key constraint violated");

                return AppError::invalid_url(
                    "Referenced resource not found",
                    json!({
                        "constraint": constraint,
                        "type": "foreign_key_violation"
                    }),
                );
            }

            if db_err.is_check_violation() {
                metrics::counter!("database_errors_total", "type" => "check_violation")
                    .increment(1);

                let constraint = db_err.constraint().unwrap_or("unknown");
                tracing::warn!(constraint = constraint, "Check constraint violated");

                return AppError::invalid_url(
                    "Data validation failed",
                    json!({
                        "constraint": constraint,
                        "type": "check_violation"
                    }),
                );
            }

            tracing::error!(
                code = ?db_err.code(),
                message = ?db_err.message(),
                constraint = ?db_err.constraint(),
                "Unhandled database error"
            );
            metrics::counter!("database_errors_total", "type" => "other").increment(1);

            AppError::internal(
                "Database constraint violation",
                json!({ "code": db_err.code() }),
            )
        }

        SqlxError::RowNotFound => {
            metrics::counter!("database_errors_total", "type" => "row_not_found").increment(1);
            AppError::not_found("Record not found", json!({}))
        }

        SqlxError::PoolTimedOut => {
            tracing::warn!("Database connection pool timed out");
            metrics::counter!("database_errors_total", "type" => "pool_timeout").increment(1);
            AppError::internal(
                "Service temporarily unavailable",
                json!({ "retryable": true, "type": "pool_timeout" }),
            )
        }

        SqlxError::PoolClosed => {
            tracing::error!("Database connection pool is closed");
            metrics::counter!("database_errors_total", "type" => "pool_closed").increment(1);
            AppError::internal(
                "Service unavailable",
                json!({ "retryable": false, "type": "pool_closed" }),
            )
        }

        SqlxError::Io(_) => {
            tracing::warn!(error = ?e, "Database I/O error");
            metrics::counter!("database_errors_total", "type" => "io_error").increment(1);
            AppError::internal(
                "Database connection issue",
                json!({ "retryable": true, "type": "io_error" }),
            )
        }

        SqlxError::Protocol(_) => {
            tracing::error!(error = ?e, "Database protocol error");
            metrics::counter!("database_errors_total", "type" => "protocol_error").increment(1);
            AppError::internal(
                "Database protocol error",
                json!({ "retryable": false, "type": "protocol_error" }),
            )
        }

        _ => {
            tracing::error!(error = ?e, "Unexpected database error");
            metrics::counter!("database_errors_total", "type" => "unknown").increment(1);
            AppError::internal("Database operation failed", json!({}))
        }
    }
}

impl std::error::Error for AppError {}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.code();
        match self {
            AppError::InvalidUrl { message, .. }
            | AppError::InvalidAlias { message, .. }
            | AppError::AliasTaken { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Gone { message, .. }
            | AppError::Unauthenticated { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::InsufficientTier { message, .. }
            | AppError::GenerationExhausted { message, .. }
            | AppError::Internal { message, .. } => write!(f, "{}: {}", code, message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let alias_related = errors.field_errors().contains_key("custom_alias")
            || errors.field_errors().contains_key("alias");

        let details = json!({
            "fields": errors
                .field_errors()
                .iter()
                .map(|(field, errors)| {
                    (
                        field.to_string(),
                        errors
                            .iter()
                            .map(|e| {
                                json!({
                                    "code": e.code,
                                    "message": e.message.as_ref().map(|m| m.to_string()),
                                    "params": e.params
                                })
                            })
                            .collect::<Vec<_>>()
                    )
                })
                .collect::<std::collections::HashMap<_, _>>()
        });

        if alias_related {
            AppError::InvalidAlias {
                message: "Alias validation failed".to_string(),
                details,
            }
        } else {
            AppError::InvalidUrl {
                message: "Request validation failed".to_string(),
                details,
            }
        }
    }
}
