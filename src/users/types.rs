// src/users/types.rs
// User record and its enums

use serde::{Deserialize, Serialize};

/// Authorization role. There are exactly two: regular users and admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

/// Which authentication strategy created (and verifies) an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Provider {
    Local,
    Google,
    Facebook,
    Dev,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Local => "local",
            Provider::Google => "google",
            Provider::Facebook => "facebook",
            Provider::Dev => "dev",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Provider::Local),
            "google" => Ok(Provider::Google),
            "facebook" => Ok(Provider::Facebook),
            "dev" => Ok(Provider::Dev),
            _ => Err(()),
        }
    }
}

/// Full user row from the database. `password_hash` is present only for
/// local-provider accounts and never leaves the server (see [`UserResponse`]).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub role: Role,
    pub provider: Provider,
    pub provider_id: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: i64,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Client-safe projection, without the password hash.
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            provider: self.provider,
            avatar_url: self.avatar_url.clone(),
            created_at: self.created_at,
        }
    }
}

/// User information safe to send to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub provider: Provider,
    pub avatar_url: Option<String>,
    pub created_at: i64,
}
