// tests/common/mod.rs
// Shared test fixtures: a migrated SQLite database and app state builders
#![allow(dead_code)]

use std::sync::Arc;

use sqlx::SqlitePool;
use tempfile::TempDir;

use evently_backend::auth::OAuthRegistry;
use evently_backend::config::{Environment, SessionConfig};
use evently_backend::db::{create_pool, run_migrations};
use evently_backend::state::AppState;

/// A migrated database backed by a temp file. File-backed rather than
/// `:memory:` so every pool connection sees the same data. The TempDir
/// must stay alive for the duration of the test.
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = create_pool(&url, 5).await.expect("Failed to connect");
    run_migrations(&pool).await.expect("Failed to run migrations");
    TestDb { pool, _dir: dir }
}

pub fn session_config() -> SessionConfig {
    SessionConfig {
        cookie_name: "evently_sid".to_string(),
        ttl_secs: 3600,
    }
}

/// App state with no OAuth providers configured.
pub fn test_state(db: &TestDb, environment: Environment) -> Arc<AppState> {
    Arc::new(AppState::new(
        db.pool.clone(),
        environment,
        &session_config(),
        OAuthRegistry::disabled(),
    ))
}

/// Count activity_log rows for one action.
pub async fn activity_count(pool: &SqlitePool, action: &str) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM activity_log WHERE action = ?")
            .bind(action)
            .fetch_one(pool)
            .await
            .expect("Failed to count activity");
    count
}
