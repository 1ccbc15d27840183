// src/activity/mod.rs
// Append-only activity log producer
//
// The auth core only writes these records (login, logout, register,
// password_change, promote_role); dashboards elsewhere read them. Writes are
// fire-and-forget: a failed insert is a warning, never an error to the
// request that triggered it.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::warn;

/// Action names recorded by the auth core.
pub mod actions {
    pub const REGISTER: &str = "register";
    pub const LOGIN: &str = "login";
    pub const LOGOUT: &str = "logout";
    pub const PASSWORD_CHANGE: &str = "password_change";
    pub const PROMOTE_ROLE: &str = "promote_role";
}

/// A record to append.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub action: &'static str,
    pub description: String,
    pub user_id: Option<i64>,
    pub event_id: Option<i64>,
    pub attendee_id: Option<i64>,
}

impl NewActivity {
    pub fn new(action: &'static str, description: impl Into<String>) -> Self {
        Self {
            action,
            description: description.into(),
            user_id: None,
            event_id: None,
            attendee_id: None,
        }
    }

    pub fn user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

#[derive(Clone)]
pub struct ActivityLog {
    db: SqlitePool,
}

impl ActivityLog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append one record.
    pub async fn record(&self, entry: NewActivity) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (action, description, user_id, event_id, attendee_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.action)
        .bind(&entry.description)
        .bind(entry.user_id)
        .bind(entry.event_id)
        .bind(entry.attendee_id)
        .bind(Utc::now().timestamp())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Append, swallowing failures. Auth operations never fail because the
    /// activity sink is down; a lost record is worth a warning and no more.
    pub async fn record_best_effort(&self, entry: NewActivity) {
        let action = entry.action;
        if let Err(e) = self.record(entry).await {
            warn!("Failed to record '{}' activity: {}", action, e);
        }
    }
}
