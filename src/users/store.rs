// src/users/store.rs
// SQLite persistence for user accounts (the credential store)

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::auth::error::{AuthError, AuthResult};
use super::types::{Provider, Role, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, name, role, provider, provider_id, avatar_url, created_at";

/// Fields for creating a new account. Role and provider default to
/// `user` / `local` when unspecified.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub provider: Option<Provider>,
    pub provider_id: Option<String>,
    pub avatar_url: Option<String>,
}

/// Profile fields a user may change about themselves.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.name.is_none() && self.avatar_url.is_none()
    }
}

/// SQLite storage for user accounts. Uniqueness constraints on username,
/// email, and (provider, provider_id) are the concurrency control; there
/// are no explicit locks here.
#[derive(Clone)]
pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a new account. Unique-constraint violations come back as
    /// [`AuthError::Conflict`] naming the offending field, so the caller can
    /// say "already exists" rather than failing generically.
    pub async fn create(&self, new: NewUser) -> AuthResult<User> {
        let now = Utc::now().timestamp();
        let role = new.role.unwrap_or(Role::User);
        let provider = new.provider.unwrap_or(Provider::Local);

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, name, role, provider, provider_id, avatar_url, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.name)
        .bind(role)
        .bind(provider)
        .bind(&new.provider_id)
        .bind(&new.avatar_url)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(map_unique_violation)?;

        debug!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn by_id(&self, id: i64) -> AuthResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    /// Case-sensitive exact match.
    pub async fn by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    pub async fn by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    pub async fn by_provider_identity(
        &self,
        provider: Provider,
        provider_id: &str,
    ) -> AuthResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE provider = ? AND provider_id = ?"
        ))
        .bind(provider)
        .bind(provider_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    /// Targeted role mutation; does not touch the rest of the record.
    /// Returns false when the id does not exist.
    pub async fn set_role(&self, id: i64, role: Role) -> AuthResult<bool> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_password_hash(&self, id: i64, password_hash: &str) -> AuthResult<()> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Apply the provided profile fields one by one, then reload the record.
    pub async fn update_profile(&self, id: i64, update: ProfileUpdate) -> AuthResult<User> {
        if let Some(ref username) = update.username {
            sqlx::query("UPDATE users SET username = ? WHERE id = ?")
                .bind(username)
                .bind(id)
                .execute(&self.db)
                .await
                .map_err(map_unique_violation)?;
        }
        if let Some(ref name) = update.name {
            sqlx::query("UPDATE users SET name = ? WHERE id = ?")
                .bind(name)
                .bind(id)
                .execute(&self.db)
                .await?;
        }
        if let Some(ref avatar_url) = update.avatar_url {
            sqlx::query("UPDATE users SET avatar_url = ? WHERE id = ?")
                .bind(avatar_url)
                .bind(id)
                .execute(&self.db)
                .await?;
        }

        self.by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found(format!("user {} not found", id)))
    }

    /// Peripheral: hard-delete an account. Sessions cascade.
    pub async fn delete(&self, id: i64) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomic lookup-or-provision for a federated identity. Concurrent
    /// callbacks for the same brand-new external identity race on the
    /// (provider, provider_id) unique index; the loser's insert turns into
    /// an update, so exactly one row ever exists. Profile fields are
    /// refreshed for returning users.
    ///
    /// A derived username that collides with an unrelated account is retried
    /// once with a provider-id suffix.
    pub async fn provision_federated(
        &self,
        provider: Provider,
        provider_id: &str,
        username: &str,
        email: &str,
        name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> AuthResult<User> {
        match self
            .upsert_federated(provider, provider_id, username, email, name, avatar_url)
            .await
        {
            Err(AuthError::Conflict(msg)) if msg.starts_with("username") => {
                let suffix: String = provider_id.chars().take(8).collect();
                let fallback = format!("{}-{}", username, suffix);
                debug!("Username '{}' taken, retrying as '{}'", username, fallback);
                self.upsert_federated(provider, provider_id, &fallback, email, name, avatar_url)
                    .await
            }
            other => other,
        }
    }

    async fn upsert_federated(
        &self,
        provider: Provider,
        provider_id: &str,
        username: &str,
        email: &str,
        name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> AuthResult<User> {
        let now = Utc::now().timestamp();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, name, role, provider, provider_id, avatar_url, created_at)
            VALUES (?, ?, ?, 'user', ?, ?, ?, ?)
            ON CONFLICT(provider, provider_id) WHERE provider_id IS NOT NULL DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                avatar_url = excluded.avatar_url
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(email)
        .bind(name)
        .bind(provider)
        .bind(provider_id)
        .bind(avatar_url)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(map_unique_violation)?;

        Ok(user)
    }
}

/// Translate a sqlite unique-constraint failure into a field-specific
/// conflict error; everything else passes through as a database error.
fn map_unique_violation(e: sqlx::Error) -> AuthError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            let msg = db_err.message();
            let field = if msg.contains("users.username") {
                "username already exists"
            } else if msg.contains("users.email") {
                "email already exists"
            } else if msg.contains("users.provider") || msg.contains("idx_users_provider_identity") {
                "provider identity already exists"
            } else {
                "record already exists"
            };
            return AuthError::conflict(field);
        }
    }
    AuthError::Database(e)
}
