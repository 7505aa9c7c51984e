//! Waypoint dashboard server binary.
//!
//! Wires the mock backend, the system clock and one dashboard session into
//! the HTTP surface and serves it until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `WAYPOINT_CONFIG` or `waypoint-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create the mock backend anchored at the current time
//! 4. Create the session and run its initial fetch
//! 5. Serve the API

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use waypoint_core::{ConfigError, DashboardConfig, DispatchError, LogFormat, Session, SystemClock};
use waypoint_data::MockDataSource;
use waypoint_server::{AppState, ServerError, start_server};

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "waypoint-config.yaml";

/// Top-level error for the server binary.
#[derive(Debug, thiserror::Error)]
enum AppError {
    /// Configuration loading failed.
    #[error("config error in {path}: {source}")]
    Config {
        /// The file being loaded, or `defaults`.
        path: String,
        /// The underlying config error.
        source: ConfigError,
    },

    /// The session could not be created.
    #[error("session error: {source}")]
    Session {
        /// The underlying dispatch error.
        #[from]
        source: DispatchError,
    },

    /// The HTTP server failed.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: ServerError,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration before logging so its filter applies.
    let (config, config_path) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config);
    info!("waypoint-server starting");
    match &config_path {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }

    // 3. Create the backend.
    let source = Arc::new(MockDataSource::anchored_now());

    // 4. Create the session.
    let session = Session::new(config.clone(), Arc::clone(&source), Arc::new(SystemClock))
        .map_err(AppError::from)?;
    session.start().await;
    let snapshot = session.snapshot().await;
    info!(
        session = %session.id(),
        entities = snapshot.entities.len(),
        highlights = snapshot.highlights.len(),
        "Session started"
    );

    // 5. Serve.
    let state = Arc::new(AppState::new(session, source));
    start_server(&config.server, state)
        .await
        .map_err(AppError::from)?;

    info!("waypoint-server stopped");
    Ok(())
}

/// Load configuration from `WAYPOINT_CONFIG`, or `waypoint-config.yaml` in
/// the working directory. A missing default file falls back to defaults
/// with environment overrides; a missing explicit file is an error.
fn load_config() -> Result<(DashboardConfig, Option<PathBuf>), AppError> {
    let explicit = std::env::var_os("WAYPOINT_CONFIG").map(PathBuf::from);
    let path = explicit
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if explicit.is_some() || path.exists() {
        let config = DashboardConfig::from_file(&path).map_err(|source| AppError::Config {
            path: path.display().to_string(),
            source,
        })?;
        return Ok((config, Some(path)));
    }

    let mut config = DashboardConfig::default();
    config
        .apply_env_overrides()
        .and_then(|()| config.validate())
        .map_err(|source| AppError::Config {
            path: "defaults".to_owned(),
            source,
        })?;
    Ok((config, None))
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured filter.
fn init_tracing(config: &DashboardConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match config.logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}
