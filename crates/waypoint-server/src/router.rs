//! Axum router construction for the dashboard API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use waypoint_data::DataSource;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the dashboard server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/state` -- `WebSocket` snapshot stream
/// - `GET /api/entities` -- entities in a window
/// - `GET /api/entities/:key/details` -- one entity's details
/// - `GET /api/entities/:type/:id/events` -- one entity's events
/// - `GET /api/highlights` -- highlights in a window
/// - `GET /api/groups/search` -- group search options
/// - `GET /api/state` -- current dashboard snapshot
/// - `POST /api/interactions` -- dispatch an interaction
///
/// CORS allows any origin.
pub fn build_router<S: DataSource>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Both entity routes name their first segment `entity`; the router
    // rejects differently named parameters at the same position.
    Router::new()
        // Status page
        .route("/", get(handlers::index::<S>))
        // WebSocket
        .route("/ws/state", get(ws::ws_state::<S>))
        // Data
        .route("/api/entities", get(handlers::list_entities::<S>))
        .route(
            "/api/entities/{entity}/details",
            get(handlers::get_entity_details::<S>),
        )
        .route(
            "/api/entities/{entity}/{id}/events",
            get(handlers::list_entity_events::<S>),
        )
        .route("/api/highlights", get(handlers::list_highlights::<S>))
        .route("/api/groups/search", get(handlers::search_groups::<S>))
        // Session
        .route("/api/state", get(handlers::get_state::<S>))
        .route("/api/interactions", post(handlers::post_interaction::<S>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
