// tests/http_api_test.rs
// The HTTP surface end to end: cookies, route policy, status codes

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use evently_backend::api::http::build_router;
use evently_backend::config::Environment;
use evently_backend::users::Role;

mod common;

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, format!("evently_sid={}", cookie));
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should complete");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, json)
}

/// Pull the session token out of a Set-Cookie header.
fn session_token(headers: &axum::http::HeaderMap) -> Option<String> {
    let raw = headers.get(header::SET_COOKIE)?.to_str().ok()?;
    let pair = raw.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    (name == "evently_sid" && !value.is_empty()).then(|| value.to_string())
}

fn register_body(username: &str, email: &str, password: &str) -> Value {
    json!({ "username": username, "email": email, "password": password })
}

#[tokio::test]
async fn register_sets_cookie_and_me_resolves_it() {
    let db = common::test_db().await;
    let app = build_router(common::test_state(&db, Environment::Development));

    let (status, headers, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("alice", "alice@example.com", "secret1")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
    assert!(body.get("password_hash").is_none(), "hash must never leak");

    let token = session_token(&headers).expect("register should set a session cookie");

    let (status, _, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "user");

    // Anonymous and garbage-cookie requests both get 401.
    let (status, _, _) = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = send(&app, "GET", "/api/auth/me", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_and_logout_round_trip() {
    let db = common::test_db().await;
    let app = build_router(common::test_state(&db, Environment::Development));

    send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("bob", "bob@example.com", "secret1")),
    )
    .await;

    let (status, headers, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "bob", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = session_token(&headers).expect("login should set a session cookie");

    // Logout invalidates the session and expires the cookie.
    let (status, headers, _) = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let set_cookie = headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(set_cookie.contains("Max-Age=0"));

    let (status, _, _) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Logging out again, or without any session, still succeeds.
    let (status, _, _) = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, "POST", "/api/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn bad_credentials_and_duplicates_map_to_statuses() {
    let db = common::test_db().await;
    let app = build_router(common::test_state(&db, Environment::Development));

    send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("carol", "carol@example.com", "secret1")),
    )
    .await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "carol", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid credentials");

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("carol", "other@example.com", "secret1")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("dave", "dave@example.com", "short")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn password_change_over_http() {
    let db = common::test_db().await;
    let app = build_router(common::test_state(&db, Environment::Development));

    let (_, headers, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("erin", "erin@example.com", "secret1")),
    )
    .await;
    let token = session_token(&headers).unwrap();

    // Unauthenticated change is refused.
    let (status, _, _) = send(
        &app,
        "POST",
        "/api/account/password",
        None,
        Some(json!({ "current_password": "secret1", "new_password": "secret2" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/account/password",
        Some(&token),
        Some(json!({ "current_password": "secret1", "new_password": "secret2" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Old password out, new password in.
    let (status, _, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "erin", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "erin", "password": "secret2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn profile_updates_require_fields() {
    let db = common::test_db().await;
    let app = build_router(common::test_state(&db, Environment::Development));

    let (_, headers, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("frank", "frank@example.com", "secret1")),
    )
    .await;
    let token = session_token(&headers).unwrap();

    let (status, _, _) = send(
        &app,
        "PATCH",
        "/api/account/profile",
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(
        &app,
        "PATCH",
        "/api/account/profile",
        Some(&token),
        Some(json!({ "name": "Frank F", "avatar_url": "https://cdn.example.com/f.png" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Frank F");
}

#[tokio::test]
async fn promotion_is_admin_gated() {
    let db = common::test_db().await;
    let state = common::test_state(&db, Environment::Development);
    let app = build_router(state.clone());

    let (_, admin_headers, admin_body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("root", "root@example.com", "secret1")),
    )
    .await;
    let admin_token = session_token(&admin_headers).unwrap();
    let admin_id = admin_body["id"].as_i64().unwrap();
    state.users.set_role(admin_id, Role::Admin).await.unwrap();

    let (_, user_headers, user_body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("plain", "plain@example.com", "secret1")),
    )
    .await;
    let user_token = session_token(&user_headers).unwrap();
    let user_id = user_body["id"].as_i64().unwrap();

    // Anonymous: 401. Non-admin: 403.
    let uri = format!("/api/admin/users/{}/promote", user_id);
    let (status, _, _) = send(&app, "POST", &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = send(&app, "POST", &uri, Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admin succeeds and the change is visible and audited.
    let (status, _, body) = send(&app, "POST", &uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
    assert_eq!(common::activity_count(&db.pool, "promote_role").await, 1);

    // Unknown target is 404.
    let (status, _, _) = send(
        &app,
        "POST",
        "/api/admin/users/999999/promote",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dev_login_is_hidden_in_production() {
    let db = common::test_db().await;
    let app = build_router(common::test_state(&db, Environment::Production));

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/auth/dev",
        None,
        Some(json!({ "email": "dev@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // And provisions nothing.
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn dev_login_works_in_development() {
    let db = common::test_db().await;
    let app = build_router(common::test_state(&db, Environment::Development));

    let (status, headers, body) = send(
        &app,
        "POST",
        "/api/auth/dev",
        None,
        Some(json!({ "email": "dev@example.com", "admin": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
    assert_eq!(body["provider"], "dev");
    assert!(session_token(&headers).is_some());
}

#[tokio::test]
async fn unconfigured_or_unknown_oauth_providers_are_404() {
    let db = common::test_db().await;
    let app = build_router(common::test_state(&db, Environment::Development));

    // Known provider, no credentials configured.
    let (status, _, _) = send(&app, "GET", "/api/auth/google", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Unknown provider name.
    let (status, _, _) = send(&app, "GET", "/api/auth/myspace", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn probes_respond() {
    let db = common::test_db().await;
    let app = build_router(common::test_state(&db, Environment::Production));

    for uri in ["/health", "/ready", "/live"] {
        let (status, _, _) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::OK, "{} should be OK", uri);
    }
}
