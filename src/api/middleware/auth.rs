//! Principal extraction middleware.
//!
//! Unlike a classic auth gate, this layer never rejects a missing
//! credential: creation is open to guests, so requests without one proceed
//! as [`Principal::Anonymous`] and handlers enforce their own
//! requirements. A credential that is present but invalid is still a hard
//! `401`.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use crate::{domain::entities::Principal, error::AppError, state::AppState};

/// Header carrying a per-user API key, as an alternative to bearer auth.
const API_KEY_HEADER: &str = "x-api-key";

/// Pulls the opaque credential out of the request headers.
///
/// `Authorization: Bearer <token>` wins over `X-API-Key: <key>`; both
/// resolve through the same token table.
fn extract_credential(headers: &HeaderMap) -> Option<String> {
    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        let token = bearer.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolves the caller's [`Principal`] and stores it in request
/// extensions.
///
/// # Errors
///
/// Returns `401 UNAUTHORIZED` when a credential is present but unknown,
/// revoked, or belongs to an inactive account.
pub async fn layer(
    State(st): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = match extract_credential(req.headers()) {
        Some(credential) => st.auth_service.authenticate(&credential).await?,
        None => Principal::Anonymous,
    };

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
