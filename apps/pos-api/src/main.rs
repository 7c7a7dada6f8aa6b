//! # Tally POS API Server
//!
//! ```bash
//! TALLY_DB_PATH=./tally.db TALLY_BIND_ADDR=0.0.0.0:8080 cargo run -p pos-api
//! ```

use anyhow::{Context, Result};
use tally_db::Database;
use tracing::{error, info};

use pos_api::{build_router, init_tracing, ApiConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting Tally POS API server...");

    let config = ApiConfig::load(None).context("failed to load configuration")?;
    let addr = config.bind_addr()?;

    let db = Database::new(config.database.db_config())
        .await
        .with_context(|| {
            format!(
                "failed to open database at {}",
                config.database.path.display()
            )
        })?;
    info!("Database ready");

    let app = build_router(AppState::with_database(db.clone(), &config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
