//! Authentication middleware

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use phase_edms::AuthenticatedUser;

use crate::auth::service::AuthService;
use crate::state::AppState;

/// API key from `X-API-Key` or `Authorization: Bearer`
fn extract_api_key(request: &Request<Body>) -> Option<String> {
    if let Some(value) = request.headers().get("X-API-Key") {
        value.to_str().ok().map(|s| s.trim().to_string())
    } else if let Some(value) = request.headers().get(header::AUTHORIZATION) {
        value
            .to_str()
            .ok()
            .and_then(|auth_str| auth_str.strip_prefix("Bearer "))
            .map(|s| s.trim().to_string())
    } else {
        None
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(api_key) = extract_api_key(&request) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Missing API key",
                "hint": "Provide X-API-Key header or Authorization: Bearer <key>"
            })),
        )
            .into_response();
    };

    let auth_service = AuthService::new(state.pool.clone());
    match auth_service.verify_api_key(&api_key).await {
        Ok(user) => {
            tracing::debug!(user_id = user.id, "Request authenticated");
            request.extensions_mut().insert(AuthenticatedUser(user.id));
            next.run(request).await
        }
        Err(e) => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Invalid API key",
                "message": e.to_string()
            })),
        )
            .into_response(),
    }
}
