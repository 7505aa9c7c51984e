//! Dashboard HTTP server lifecycle management.
//!
//! Provides [`start_server`] which binds to a TCP port and runs the
//! Axum server until `Ctrl-C` is received.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use waypoint_core::config::ServerConfig;
use waypoint_data::DataSource;

use crate::router::build_router;
use crate::state::AppState;

/// Start the dashboard HTTP server.
///
/// Binds to the configured address, builds the router, and serves
/// requests until `Ctrl-C`. In-flight requests finish before returning.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] for an unusable address and
/// [`ServerError::Serve`] if the accept loop fails.
pub async fn start_server<S: DataSource>(
    config: &ServerConfig,
    state: Arc<AppState<S>>,
) -> Result<(), ServerError> {
    let bind_addr = config.bind_addr();
    let router = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| ServerError::Bind(format!("{bind_addr}: {e}")))?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("{bind_addr}: {e}")))?;

    info!(%addr, "Waypoint server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))?;

    info!("Waypoint server stopped");
    Ok(())
}

/// Resolve on `Ctrl-C`. If the handler cannot be installed the server
/// runs until killed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Failures of the dashboard listener.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The configured address is malformed or already taken.
    #[error("cannot listen: {0}")]
    Bind(String),

    /// Accepting or serving connections failed.
    #[error("listener failed: {0}")]
    Serve(String),
}
