// src/config/mod.rs
// Central configuration for the Evently backend

pub mod helpers;
pub mod server;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

pub use server::{
    DatabaseConfig, Environment, LoggingConfig, OAuthProviderSettings, OAuthSettings,
    ServerConfig, SessionConfig,
};

lazy_static! {
    pub static ref CONFIG: AppConfig = AppConfig::from_env();
}

/// Main configuration structure - composes all domain configs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub oauth: OAuthSettings,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        // Don't panic if .env doesn't exist (for production)
        dotenv::dotenv().ok();

        Self {
            environment: Environment::from_env(),
            server: ServerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            session: SessionConfig::from_env(),
            oauth: OAuthSettings::from_env(),
            logging: LoggingConfig::from_env(),
        }
    }
}
