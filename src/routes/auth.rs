//! Optional HTTP Basic auth for the admin and conversion pages.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::app_state::AppState;

const REALM: &str = r#"Basic realm="edition-admin""#;

/// Reject requests without the configured credentials. A no-op when no
/// admin password is set.
pub async fn require_basic_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(password) = state.config.admin_password.as_deref() else {
        return next.run(req).await;
    };

    if credentials_match(req.headers(), &state.config.admin_user, password) {
        return next.run(req).await;
    }

    tracing::warn!(path = %req.uri().path(), "Rejected unauthenticated request");
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, REALM)],
        "Authentication required",
    )
        .into_response()
}

fn credentials_match(headers: &HeaderMap, user: &str, password: &str) -> bool {
    let Some(encoded) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
    else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    decoded
        .split_once(':')
        .is_some_and(|(u, p)| u == user && p == password)
}
