//! Roomly HTTP server.
//!
//! Connects to `PostgreSQL`, applies migrations, and serves the API and
//! Prometheus metrics until Ctrl+C or SIGTERM.

use anyhow::Context;
use roomly_core::environment::SystemClock;
use roomly_engine::Roomly;
use roomly_postgres::PostgresStore;
use roomly_web::{
    AppState, Config, LocalObjectStorage, build_router, install_recorder, metrics_router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::services::ServeDir;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,roomly=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Roomly server");

    let config = Config::from_env();
    info!(
        bind = %config.bind_address(),
        storage_root = %config.storage.root,
        rate_limit_days = config.booking.rate_limit_days,
        "Configuration loaded"
    );

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    let store = PostgresStore::new(pool.clone());
    store.migrate().await.context("Failed to run migrations")?;
    info!("Database ready");

    let metrics = install_recorder()?;

    let storage = LocalObjectStorage::new(
        config.storage.root.clone(),
        config.storage.public_base_url.clone(),
    );
    let roomly = Roomly::new(
        store,
        storage,
        Arc::new(SystemClock),
        config.booking.policy(),
    );

    let app = build_router(AppState::new(roomly))
        .merge(metrics_router(metrics))
        .nest_service("/uploads", ServeDir::new(&config.storage.root));

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;
    info!(address = %config.bind_address(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Draining database connections...");
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);
    if tokio::time::timeout(shutdown_timeout, pool.close())
        .await
        .is_err()
    {
        warn!(
            timeout_secs = config.server.shutdown_timeout,
            "Database pool did not close in time"
        );
    }

    info!("Shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM. A handler that fails to install is logged
/// and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal"),
        () = terminate => info!("Received SIGTERM signal"),
    }
}
