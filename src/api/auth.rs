use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::domain::Caller;

/// Resolves the caller from an API key and attaches it to the request.
///
/// Accepted sources:
/// 1. `X-Api-Key` header
/// 2. `Authorization: Bearer <api_key>` header
///
/// Handlers take the identity from the `Caller` extension only; nothing in
/// a request body or path can change who the caller is.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(key) = extract_api_key(&headers) {
        match state.store().verify_api_key(&key).await {
            Ok(Some(user)) => {
                tracing::Span::current().record("user_id", &user.id);
                request.extensions_mut().insert(Caller::authenticated(user.id));
                return Ok(next.run(request).await.into_response());
            }
            Ok(None) => {}
            Err(e) => return Err(ApiError::internal(format!("Authentication error: {e}"))),
        }
    }

    let response = (
        StatusCode::UNAUTHORIZED,
        axum::Json(ApiResponse::<()>::error("Unauthorized")),
    );
    Ok(response.into_response())
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}
