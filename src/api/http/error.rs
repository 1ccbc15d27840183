// src/api/http/error.rs
// HTTP mapping for the auth error taxonomy

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::auth::AuthError;

/// Response-side wrapper around [`AuthError`]. Internal detail (database
/// failures, provider errors) is logged here and replaced with a generic
/// message before it reaches the client.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AuthError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid credentials".to_string())
            }
            AuthError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "not authenticated".to_string())
            }
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            AuthError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AuthError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AuthError::ProviderMismatch => (StatusCode::BAD_REQUEST, self.0.to_string()),
            AuthError::ExternalProvider(detail) => {
                // The user sees a generic failure; the detail is ours.
                error!("External provider failure: {}", detail);
                (StatusCode::UNAUTHORIZED, "authentication failed".to_string())
            }
            AuthError::Database(e) => {
                error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            AuthError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
