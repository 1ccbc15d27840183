// src/state.rs
// Application state shared across handlers

use sqlx::SqlitePool;

use crate::activity::ActivityLog;
use crate::auth::{AuthService, OAuthRegistry, SessionStore};
use crate::config::{Environment, SessionConfig};
use crate::users::UserStore;

/// Application state shared across handlers. Environment and session
/// settings are injected rather than read from the global CONFIG so tests
/// can construct production-mode or short-lived-session states directly.
pub struct AppState {
    pub pool: SqlitePool,
    pub users: UserStore,
    pub sessions: SessionStore,
    pub auth: AuthService,
    pub activity: ActivityLog,
    pub oauth: OAuthRegistry,
    pub environment: Environment,
    pub session_cookie: String,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        environment: Environment,
        session: &SessionConfig,
        oauth: OAuthRegistry,
    ) -> Self {
        let users = UserStore::new(pool.clone());
        let sessions = SessionStore::new(pool.clone(), session.ttl_secs);
        let activity = ActivityLog::new(pool.clone());
        let auth = AuthService::new(users.clone(), activity.clone());

        Self {
            pool,
            users,
            sessions,
            auth,
            activity,
            oauth,
            environment,
            session_cookie: session.cookie_name.clone(),
        }
    }
}
