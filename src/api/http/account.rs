// src/api/http/account.rs
// Self-service account endpoints: password change and profile updates

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{patch, post},
};
use serde::Deserialize;

use crate::auth::AuthError;
use crate::state::AppState;
use crate::users::ProfileUpdate;
use super::error::ApiError;
use super::extract::CurrentUser;

pub fn create_account_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/password", post(change_password))
        .route("/profile", patch(update_profile))
}

#[derive(Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

/// POST /api/account/password — local-provider accounts only; federated
/// accounts get a distinct "use your original provider" error.
async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .auth
        .change_password(&user, &req.current_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/account/profile — username/name/avatar updates.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    if update.is_empty() {
        return Err(ApiError(AuthError::validation("no fields to update")));
    }
    let updated = state.users.update_profile(user.id, update).await?;
    Ok(Json(updated.to_response()))
}
