// src/api/http/auth.rs
// Login, registration, logout, identity, and federated-login endpoints

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use serde::Deserialize;

use crate::activity::{NewActivity, actions};
use crate::auth::{AuthError, Credentials, RegisterParams, Session};
use crate::state::AppState;
use crate::users::Provider;
use super::error::ApiError;
use super::extract::{CurrentUser, MaybeUser};
use super::middleware::{clear_session_cookie, session_cookie};

pub fn create_auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/dev", post(dev_login))
        .route("/{provider}", get(oauth_start))
        .route("/{provider}/callback", get(oauth_callback))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct DevLoginRequest {
    email: String,
    name: Option<String>,
    #[serde(default)]
    admin: bool,
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: String,
    state: String,
}

fn cookie_header(state: &AppState, session: &Session) -> [(header::HeaderName, header::HeaderValue); 1] {
    [(
        header::SET_COOKIE,
        session_cookie(
            &state.session_cookie,
            &session.token,
            session.expires_at - session.created_at,
        ),
    )]
}

/// POST /api/auth/register — create a local account and log it in.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(params): Json<RegisterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.auth.register_local(params).await?;
    let session = state.sessions.create(user.id).await?;
    Ok((
        StatusCode::CREATED,
        cookie_header(&state, &session),
        Json(user.to_response()),
    ))
}

/// POST /api/auth/login — local credential login.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state
        .auth
        .authenticate(Credentials::Local {
            username: req.username,
            password: req.password,
        })
        .await?;
    let session = state.sessions.create(auth.user.id).await?;
    Ok((
        cookie_header(&state, &session),
        Json(auth.user.to_response()),
    ))
}

/// POST /api/auth/logout — destroy the session, clear the cookie. Idempotent:
/// an anonymous or stale call still succeeds, it just logs nothing.
async fn logout(
    State(state): State<Arc<AppState>>,
    MaybeUser(session): MaybeUser,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(auth_session) = session {
        state.sessions.delete(&auth_session.token).await?;
        state
            .activity
            .record_best_effort(
                NewActivity::new(
                    actions::LOGOUT,
                    format!("{} signed out", auth_session.user.username),
                )
                .user(auth_session.user.id),
            )
            .await;
    }
    Ok((
        [(header::SET_COOKIE, clear_session_cookie(&state.session_cookie))],
        Json(serde_json::json!({ "status": "ok" })),
    ))
}

/// GET /api/auth/me — the identity behind the session cookie.
async fn me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(user.to_response())
}

/// POST /api/auth/dev — credential-free login for development. In production
/// this route answers 404 and provisions nothing.
async fn dev_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DevLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if state.environment.is_production() {
        return Err(ApiError(AuthError::not_found("not found")));
    }

    let auth = state
        .auth
        .authenticate(Credentials::Dev {
            email: req.email,
            name: req.name,
            admin: req.admin,
        })
        .await?;
    let session = state.sessions.create(auth.user.id).await?;
    Ok((
        cookie_header(&state, &session),
        Json(auth.user.to_response()),
    ))
}

fn federated_provider(name: &str) -> Result<Provider, ApiError> {
    match Provider::from_str(name) {
        Ok(p @ (Provider::Google | Provider::Facebook)) => Ok(p),
        _ => Err(ApiError(AuthError::not_found(format!(
            "unknown provider '{}'",
            name
        )))),
    }
}

/// GET /api/auth/{provider} — redirect to the provider's consent screen.
async fn oauth_start(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let provider = federated_provider(&provider)?;
    let handler = state.oauth.get(provider).ok_or_else(|| {
        ApiError(AuthError::not_found(format!(
            "{} login is not configured",
            provider.as_str()
        )))
    })?;
    let url = handler.authorize_url().await?;
    Ok(Redirect::temporary(&url))
}

/// GET /api/auth/{provider}/callback — complete the federated login.
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let provider = federated_provider(&provider)?;
    let handler = state.oauth.get(provider).ok_or_else(|| {
        ApiError(AuthError::not_found(format!(
            "{} login is not configured",
            provider.as_str()
        )))
    })?;

    let profile = handler.exchange_code(&query.code, &query.state).await?;
    let auth = state
        .auth
        .authenticate(Credentials::Federated(profile))
        .await?;
    let session = state.sessions.create(auth.user.id).await?;
    Ok((cookie_header(&state, &session), Redirect::to("/")))
}
