//! HTTP surface for FleetSync provider management and sync.
//!
//! Handlers are thin: they parse the request, call the [`SyncService`] held
//! in [`AppState`], and map [`fleetsync_common::Error`] to an [`ApiError`].
//!
//! [`SyncService`]: fleetsync_sync::SyncService

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{AppConfig, VaultSecret};
pub use error::{ApiError, ApiResult};
pub use routes::{router, ApiResponse};
pub use state::AppState;

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use fleetsync_common::Result;

/// Build the application from `config` and serve until Ctrl-C.
pub async fn serve(config: AppConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    spawn_cache_sweeper(&state);

    let listener = TcpListener::bind(config.bind).await?;
    info!(addr = %config.bind, "FleetSync server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Periodically drop expired connection-test results.
fn spawn_cache_sweeper(state: &AppState) {
    let cache = Arc::clone(&state.status_cache);
    let period = cache.ttl();
    if period.is_zero() {
        return;
    }

    tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);
        loop {
            tick.tick().await;
            cache.purge_expired();
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
