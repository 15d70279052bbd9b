//! clm-server: REST API for contract lifecycle management.
//!
//! Configuration comes from the environment (optionally a `.env` file);
//! see `config.rs` for the variables and their defaults.

use std::sync::Arc;

use anyhow::Context;
use clm_core::ContractService;
use clm_postgres::Database;
use clm_server::config::ServerConfig;
use clm_server::router::build_router;
use clm_server::state::AppState;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the process environment still applies.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,clm_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let config = ServerConfig::from_env();
    tracing::info!(
        environment = %config.environment,
        "Starting CLM server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db = Database::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    db.test_connection()
        .await
        .context("database connectivity check failed")?;

    if config.run_migrations {
        db.run_migrations()
            .await
            .context("failed to run database migrations")?;
    }

    let stores = db.stores();
    let service = Arc::new(ContractService::new(
        Arc::new(stores.contracts),
        Arc::new(stores.milestones),
        Arc::new(stores.audit),
    ));
    let bind_addr = config.bind_addr();
    let state = AppState::new(service, Arc::new(stores.health), config);
    let app = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind to {bind_addr}"))?;
    tracing::info!("CLM server listening on http://{bind_addr}");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error");

    db.close().await;
    tracing::info!("Server shutdown complete");
    served
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
