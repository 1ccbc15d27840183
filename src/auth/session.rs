// src/auth/session.rs
// SQLite persistence for login sessions
//
// Sessions map an opaque token to a user id with a fixed expiry. This store
// is the only component that persists session state.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::error::AuthResult;

/// A live login session.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: i64,
    pub expires_at: i64,
}

/// SQLite storage for sessions.
#[derive(Clone)]
pub struct SessionStore {
    db: SqlitePool,
    ttl_secs: i64,
}

impl SessionStore {
    pub fn new(db: SqlitePool, ttl_secs: i64) -> Self {
        Self { db, ttl_secs }
    }

    /// Issue a fresh session for a user. The token is 32 random bytes,
    /// hex-encoded; expiry is fixed at creation time.
    pub async fn create(&self, user_id: i64) -> AuthResult<Session> {
        let now = Utc::now().timestamp();
        let session = Session {
            token: generate_token(),
            user_id,
            created_at: now,
            expires_at: now + self.ttl_secs,
        };

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.db)
        .await?;

        debug!("Created session for user {}", user_id);
        Ok(session)
    }

    /// Resolve a token to a live session. Expired rows are treated as a miss.
    pub async fn resolve(&self, token: &str) -> AuthResult<Option<Session>> {
        let now = Utc::now().timestamp();
        let session = sqlx::query_as::<_, Session>(
            "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ? AND expires_at > ?",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(session)
    }

    /// Destroy a session. Idempotent: deleting a missing or already-expired
    /// token succeeds.
    pub async fn delete(&self, token: &str) -> AuthResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Sweep expired rows. Called periodically from a background task;
    /// lookups already ignore expired sessions, this just reclaims space.
    pub async fn delete_expired(&self) -> AuthResult<u64> {
        let now = Utc::now().timestamp();
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
