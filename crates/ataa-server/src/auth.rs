use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;

use crate::{token::Claims, AppState};

/// Verified dashboard claims, attached to the request for downstream handlers.
#[derive(Debug, Clone)]
pub struct AuthClaims(pub Claims);

/// Axum middleware that validates `Authorization: Bearer <token>`.
///
/// Every failure collapses to the same generic 401 — whether the token was
/// malformed, forged, or expired is only distinguishable in the debug log,
/// never in the response.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token.map(|t| state.tokens.verify(t)) {
        Some(Ok(claims)) => {
            request.extensions_mut().insert(AuthClaims(claims));
            next.run(request).await
        }
        Some(Err(e)) => {
            debug!(error = %e, "rejected dashboard token");
            unauthorized()
        }
        None => unauthorized(),
    }
}

/// The one unauthorized response shape used by the middleware and the login
/// handler alike.
pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "unauthorized"})),
    )
        .into_response()
}
