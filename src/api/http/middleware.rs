// src/api/http/middleware.rs
// Session-resolution middleware and cookie plumbing
//
// Every request passes through here. A valid session cookie resolves to a
// user and attaches an AuthSession to the request's extensions; anything
// else (no cookie, unknown token, expired session) leaves the request
// anonymous and lets route policy decide what that means.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::state::AppState;
use crate::users::User;

/// Identity attached to a request by [`resolve_session`].
#[derive(Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

pub async fn resolve_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = cookie_value(req.headers(), &state.session_cookie) {
        match state.sessions.resolve(&token).await {
            Ok(Some(session)) => match state.users.by_id(session.user_id).await {
                Ok(Some(user)) => {
                    req.extensions_mut().insert(AuthSession { user, token });
                }
                Ok(None) => {} // user deleted out from under a live session
                Err(e) => warn!("Failed to load session user: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("Session lookup failed: {}", e),
        }
    }
    next.run(req).await
}

/// Extract one cookie's value from the request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Session cookie for a freshly issued token. HttpOnly keeps it away from
/// scripts; Max-Age matches the server-side expiry.
pub fn session_cookie(name: &str, token: &str, max_age_secs: i64) -> HeaderValue {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, token, max_age_secs
    );
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Expired cookie that clears the session on the client.
pub fn clear_session_cookie(name: &str) -> HeaderValue {
    session_cookie(name, "", 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn finds_cookie_among_several() {
        let headers = headers_with_cookie("theme=dark; evently_sid=abc123; lang=en");
        assert_eq!(
            cookie_value(&headers, "evently_sid"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn missing_cookie_is_none() {
        let headers = headers_with_cookie("theme=dark");
        assert_eq!(cookie_value(&headers, "evently_sid"), None);
        assert_eq!(cookie_value(&HeaderMap::new(), "evently_sid"), None);
    }

    #[test]
    fn cookie_attributes_are_set() {
        let cookie = session_cookie("evently_sid", "tok", 604_800);
        let s = cookie.to_str().unwrap();
        assert!(s.contains("HttpOnly"));
        assert!(s.contains("SameSite=Lax"));
        assert!(s.contains("Max-Age=604800"));
    }
}
