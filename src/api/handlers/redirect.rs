//! Handler for the redirect host.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::application::services::{ClickContext, Resolution};
use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its destination.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Responses
///
/// The redirect host never wraps bodies:
/// - `301` or `302` (configurable) with `Location` and
///   `Cache-Control: no-store` on success
/// - `410 Gone` for expired mappings
/// - `404 Not Found` for unknown or deleted codes
///
/// Access accounting and the click event are queued in the background;
/// the redirect decision never waits on them.
pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Response, AppError> {
    let ctx = ClickContext {
        ip: Some(addr.ip().to_string()),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        referrer: headers
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    let response = match state.resolver.resolve(&code, ctx).await? {
        Resolution::Found(mapping) => {
            let status = if state.redirect_permanent {
                StatusCode::MOVED_PERMANENTLY
            } else {
                StatusCode::FOUND
            };

            (
                status,
                [
                    (header::LOCATION, mapping.long_url),
                    (header::CACHE_CONTROL, "no-store".to_string()),
                ],
            )
                .into_response()
        }
        Resolution::Expired => (StatusCode::GONE, "This short URL has expired").into_response(),
        Resolution::NotFound => (StatusCode::NOT_FOUND, "Short URL not found").into_response(),
    };

    Ok(response)
}
