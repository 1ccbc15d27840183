// src/main.rs

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use evently_backend::api::http::build_router;
use evently_backend::auth::OAuthRegistry;
use evently_backend::config::CONFIG;
use evently_backend::db::{create_pool, run_migrations};
use evently_backend::state::AppState;

/// Graceful shutdown signal handler for SIGTERM and Ctrl+C
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let level = Level::from_str(&CONFIG.logging.level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Evently backend");
    info!("Environment: {:?}", CONFIG.environment);

    let pool = create_pool(&CONFIG.database.url, CONFIG.database.max_connections).await?;
    run_migrations(&pool).await?;

    let oauth = OAuthRegistry::from_settings(pool.clone(), &CONFIG.oauth);

    let app_state = Arc::new(AppState::new(
        pool.clone(),
        CONFIG.environment,
        &CONFIG.session,
        oauth,
    ));

    // Sweep expired sessions and stale OAuth states hourly. Expiry is
    // enforced at read time, so this only reclaims space.
    let sweeper_sessions = app_state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match sweeper_sessions.delete_expired().await {
                Ok(swept) if swept > 0 => info!("Swept {} expired sessions", swept),
                Ok(_) => {}
                Err(e) => warn!("Session sweep failed: {}", e),
            }
        }
    });

    let app = build_router(app_state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let bind_address = CONFIG.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!("Listening on http://{}", bind_address);
    info!("Health endpoints: /health, /ready, /live");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutdown complete");
    Ok(())
}
