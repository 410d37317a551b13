//! Liveness endpoint.

use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    cache: bool,
}

/// Reports liveness plus cache reachability.
///
/// # Endpoint
///
/// `GET /health` - always `200`; a degraded cache only flips the `cache`
/// field, since the service keeps serving from the repository without it.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthBody {
        status: "ok",
        cache: state.cache.health_check().await,
    })
}
