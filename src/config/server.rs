// src/config/server.rs
// Server, database, session, and OAuth configuration

use serde::{Deserialize, Serialize};

/// Runtime environment. Security-sensitive toggles (the dev login bypass)
/// key off this, so it defaults to Production unless explicitly overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        match super::helpers::env_or("APP_ENV", "production").as_str() {
            "development" | "dev" => Environment::Development,
            _ => Environment::Production,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: super::helpers::env_or("EVENTLY_HOST", "127.0.0.1"),
            port: super::helpers::env_parsed_or("EVENTLY_PORT", 3000),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: super::helpers::env_or("DATABASE_URL", "sqlite://evently.db?mode=rwc"),
            max_connections: super::helpers::env_parsed_or("EVENTLY_SQLITE_MAX_CONNECTIONS", 10),
        }
    }
}

/// Session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Fixed session lifetime in seconds (7 days).
    pub ttl_secs: i64,
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self {
            cookie_name: super::helpers::env_or("SESSION_COOKIE_NAME", "evently_sid"),
            ttl_secs: super::helpers::env_parsed_or("SESSION_TTL_SECS", 604_800),
        }
    }
}

/// Credentials for one OAuth provider. A provider is only wired up when
/// both client id and secret are present in the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthProviderSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl OAuthProviderSettings {
    fn from_env(prefix: &str, default_callback: &str) -> Option<Self> {
        let client_id = super::helpers::env_opt(&format!("{}_CLIENT_ID", prefix))?;
        let client_secret = super::helpers::env_opt(&format!("{}_CLIENT_SECRET", prefix))?;
        let redirect_url = super::helpers::env_or(
            &format!("{}_REDIRECT_URL", prefix),
            default_callback,
        );
        Some(Self {
            client_id,
            client_secret,
            redirect_url,
        })
    }
}

/// OAuth configuration for all federated providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthSettings {
    pub google: Option<OAuthProviderSettings>,
    pub facebook: Option<OAuthProviderSettings>,
}

impl OAuthSettings {
    pub fn from_env() -> Self {
        Self {
            google: OAuthProviderSettings::from_env(
                "GOOGLE",
                "http://localhost:3000/api/auth/google/callback",
            ),
            facebook: OAuthProviderSettings::from_env(
                "FACEBOOK",
                "http://localhost:3000/api/auth/facebook/callback",
            ),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            level: super::helpers::env_or("EVENTLY_LOG_LEVEL", "info"),
        }
    }
}
