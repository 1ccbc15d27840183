// src/api/http/admin.rs
// Admin-gated endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::post,
};

use crate::state::AppState;
use super::error::ApiError;
use super::extract::AdminUser;

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new().route("/users/{id}/promote", post(promote_user))
}

/// POST /api/admin/users/{id}/promote — elevate a user to admin. The
/// AdminUser extractor enforces the gate; the service records actor and
/// target in the activity log.
async fn promote_user(
    State(state): State<Arc<AppState>>,
    AdminUser(actor): AdminUser,
    Path(target_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let promoted = state.auth.promote_to_admin(&actor, target_id).await?;
    Ok(Json(promoted.to_response()))
}
