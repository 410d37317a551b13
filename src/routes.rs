//! Router configuration.

use axum::routing::{get, patch, post};
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use crate::api::handlers::{
    bulk_delete_handler, check_alias_handler, create_url_handler, delete_url_handler,
    get_url_handler, health_handler, list_urls_handler, redirect_handler, update_expiry_handler,
    webhook_test_handler,
};
use crate::api::middleware::{auth, rate_limit, tracing};
use crate::state::AppState;

/// Constructs the application router.
///
/// # Route structure
///
/// - `/{code}` - redirect host (public, raw responses)
/// - `/health` - liveness
/// - `/api/v1/urls…` - REST surface; the principal layer runs on every
///   API route and handlers enforce auth/ownership/tier themselves
/// - `/api/v1/webhooks/test` - webhook configuration test
///
/// # Middleware
///
/// - Tracing on everything
/// - Principal extraction on the API
/// - Per-IP rate limiting: a general layer on the API, a stricter one on
///   the fan-out endpoints
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    let heavy = Router::new()
        .route("/urls/bulk-delete", post(bulk_delete_handler))
        .route("/webhooks/test", post(webhook_test_handler))
        .layer(rate_limit::strict_layer());

    let api = Router::new()
        .route("/urls", post(create_url_handler).get(list_urls_handler))
        .route("/urls/check-alias", get(check_alias_handler))
        .route(
            "/urls/{code}",
            get(get_url_handler).delete(delete_url_handler),
        )
        .route("/urls/{code}/expiry", patch(update_expiry_handler))
        .layer(rate_limit::layer())
        .merge(heavy)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer));

    let router = Router::new()
        .route("/{code}", get(redirect_handler))
        .route("/health", get(health_handler))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
