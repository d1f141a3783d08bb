//! Signed-in account endpoint.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::state::{AppState, AppUser};

/// Handler for GET /me
///
/// Returns the account summary, or 401 when nobody is signed in.
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.auth.account_summary(&headers, AppUser::details).await {
        Some(summary) => Json(summary).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Not authenticated" })),
        )
            .into_response(),
    }
}
