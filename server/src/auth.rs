//! Bearer-token gate for the configuration surface.

use crate::api::{AppState, ErrorBody};
use crate::metrics_defs::AUTH_FAILURES;
use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use shared::counter;
use std::sync::Arc;

/// Reject requests whose `Authorization: Bearer <token>` does not match the
/// configured secret. Failures are a bare 401; which check failed is not
/// disclosed.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(token) if token == state.auth_token => next.run(request).await,
        _ => {
            counter!(AUTH_FAILURES).increment(1);
            (StatusCode::UNAUTHORIZED, Json(ErrorBody::new("unauthorized"))).into_response()
        }
    }
}
