// src/api/http/mod.rs

pub mod account;
pub mod admin;
pub mod auth;
pub mod error;
pub mod extract;
pub mod health;
pub mod middleware;

use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state, routing::get};

use crate::state::AppState;

pub use account::create_account_router;
pub use admin::create_admin_router;
pub use auth::create_auth_router;
pub use error::ApiError;
pub use extract::{AdminUser, CurrentUser, MaybeUser};
pub use health::{health_check, liveness_check, readiness_check};
pub use middleware::AuthSession;

/// Assemble the full application router. The session-resolution middleware
/// wraps every route, so handlers only ever look at request extensions.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
        .nest("/api/auth", create_auth_router())
        .nest("/api/account", create_account_router())
        .nest("/api/admin", create_admin_router())
        .layer(from_fn_with_state(state.clone(), middleware::resolve_session))
        .with_state(state)
}
