//! Shared application state for the API server.
//!
//! [`AppState`] holds the dashboard session driven by `POST
//! /api/interactions` and the data backend the read-only data endpoints
//! query directly. Direct queries bypass the session's query cache so one
//! client's request never fences another's.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use waypoint_core::Session;
use waypoint_data::DataSource;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
pub struct AppState<S> {
    /// The dashboard session.
    pub session: Arc<Session<S>>,
    /// The data backend, shared with the session.
    pub source: Arc<S>,
    /// When the server started.
    pub started_at: DateTime<Utc>,
}

impl<S: DataSource> AppState<S> {
    /// Create the application state.
    pub fn new(session: Arc<Session<S>>, source: Arc<S>) -> Self {
        Self {
            session,
            source,
            started_at: Utc::now(),
        }
    }
}

impl<S> std::fmt::Debug for AppState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("session", &self.session)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}
