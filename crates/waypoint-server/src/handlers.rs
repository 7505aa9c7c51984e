//! REST API endpoint handlers for the dashboard server.
//!
//! Data endpoints query the backend directly; state endpoints read and
//! drive the shared dashboard session.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/entities` | Entities in a window, optionally inside a polygon |
//! | `GET` | `/api/entities/:type/:id/events` | One entity's events |
//! | `GET` | `/api/entities/:key/details` | One entity's descriptive record |
//! | `GET` | `/api/highlights` | Highlights in a window |
//! | `GET` | `/api/groups/search` | Group search box options |
//! | `GET` | `/api/state` | Current dashboard snapshot |
//! | `POST` | `/api/interactions` | Dispatch an interaction |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use chrono::{DateTime, Utc};
use waypoint_core::Interaction;
use waypoint_data::DataSource;
use waypoint_types::{EntityKey, Parameters, TimeRange};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Time window query parameters. A missing `start` means the configured
/// default window; a missing `end` means open-ended.
#[derive(Debug, Default, serde::Deserialize)]
pub struct RangeQuery {
    /// Inclusive window start.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive window end.
    pub end: Option<DateTime<Utc>>,
}

/// Query parameters for `GET /api/entities`.
#[derive(Debug, serde::Deserialize)]
pub struct EntitiesQuery {
    /// Inclusive window start.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive window end.
    pub end: Option<DateTime<Utc>>,
    /// Spatial filter as a WKT polygon.
    pub wkt: Option<String>,
}

/// Query parameters for `GET /api/groups/search`.
#[derive(Debug, serde::Deserialize)]
pub struct SearchQuery {
    /// Search text. Empty matches everything.
    #[serde(default)]
    pub q: String,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing session status and API links.
#[allow(clippy::too_many_lines)]
pub async fn index<S: DataSource>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    let snapshot = state.session.snapshot().await;
    let session_id = state.session.id();
    let started_at = state.started_at.format("%Y-%m-%d %H:%M:%S UTC");
    let entity_count = snapshot.entities.len();
    let highlight_count = snapshot.highlights.len();
    let selected_count = snapshot.selection.len();
    let focused = snapshot
        .focus
        .focused_entity
        .as_ref()
        .map_or_else(|| "none".to_owned(), ToString::to_string);
    let window_start = snapshot.parameters.time_range.start.format("%H:%M");
    let window_end = snapshot
        .parameters
        .time_range
        .end
        .map_or_else(|| "now".to_owned(), |e| e.format("%H:%M").to_string());

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Waypoint</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Waypoint</h1>
    <p class="subtitle">Session {session_id}, up since {started_at}</p>

    <p>Status: <span class="status">RUNNING</span></p>

    <div>
        <div class="metric">
            <div class="label">Entities</div>
            <div class="value">{entity_count}</div>
        </div>
        <div class="metric">
            <div class="label">Highlights</div>
            <div class="value">{highlight_count}</div>
        </div>
        <div class="metric">
            <div class="label">Selected</div>
            <div class="value">{selected_count}</div>
        </div>
        <div class="metric">
            <div class="label">Focused</div>
            <div class="value">{focused}</div>
        </div>
        <div class="metric">
            <div class="label">Window</div>
            <div class="value">{window_start} to {window_end}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/api/entities">/api/entities</a> -- Entities (?start, ?end, ?wkt)</li>
        <li>GET /api/entities/:type/:id/events -- One entity's events</li>
        <li>GET /api/entities/:key/details -- One entity's details</li>
        <li>GET <a href="/api/highlights">/api/highlights</a> -- Highlights (?start, ?end)</li>
        <li>GET <a href="/api/groups/search">/api/groups/search</a> -- Group search (?q)</li>
        <li>GET <a href="/api/state">/api/state</a> -- Dashboard snapshot</li>
        <li>POST /api/interactions -- Dispatch an interaction</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/state</code> -- Live dashboard snapshots</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// Data endpoints
// ---------------------------------------------------------------------------

/// List entities in a window, optionally inside a WKT polygon.
pub async fn list_entities<S: DataSource>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<EntitiesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let range = resolve_range(&state, params.start, params.end)?;
    let parameters = Parameters {
        selected_wkt: params.wkt,
        time_range: range,
    };
    let entities = state.source.entities(&parameters).await?;
    Ok(Json(serde_json::json!({
        "count": entities.len(),
        "entities": entities,
    })))
}

/// List one entity's events in a window.
///
/// The first path segment is the entity type here; it shares its position
/// with the entity key of the details route.
pub async fn list_entity_events<S: DataSource>(
    State(state): State<Arc<AppState<S>>>,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Query(params): Query<RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let range = resolve_range(&state, params.start, params.end)?;
    let events = state
        .source
        .events_of_entity(&entity_type, &entity_id, &range)
        .await?;
    Ok(Json(serde_json::json!({
        "count": events.len(),
        "events": events,
    })))
}

/// Return one entity's descriptive record.
pub async fn get_entity_details<S: DataSource>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let key: EntityKey = key
        .parse()
        .map_err(|e| ApiError::InvalidQuery(format!("entity key {key:?}: {e}")))?;
    let details = state
        .source
        .entity_details(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("details of {key}")))?;
    let sections = details.sections();
    Ok(Json(serde_json::json!({
        "details": details,
        "sections": sections,
    })))
}

/// List highlights in a window.
pub async fn list_highlights<S: DataSource>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let range = resolve_range(&state, params.start, params.end)?;
    let highlights = state.source.highlights(&range).await?;
    Ok(Json(serde_json::json!({
        "count": highlights.len(),
        "highlights": highlights,
    })))
}

/// Group search box options keyed by category.
pub async fn search_groups<S: DataSource>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let results = state.source.group_search(&params.q).await?;
    Ok(Json(results))
}

// ---------------------------------------------------------------------------
// Session endpoints
// ---------------------------------------------------------------------------

/// Return the current dashboard snapshot.
pub async fn get_state<S: DataSource>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    let snapshot = state.session.snapshot().await;
    Json(snapshot)
}

/// Dispatch an interaction and return the resulting snapshot.
pub async fn post_interaction<S: DataSource>(
    State(state): State<Arc<AppState<S>>>,
    Json(interaction): Json<Interaction>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(?interaction, "interaction received");
    let snapshot = state.session.dispatch(interaction).await?;
    Ok(Json(snapshot))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build the queried window, defaulting `start` to the configured window
/// before the session clock's now.
fn resolve_range<S: DataSource>(
    state: &AppState<S>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<TimeRange, ApiError> {
    let start = start.unwrap_or_else(|| {
        let hours = state.session.config().parameters.default_window_hours;
        TimeRange::last_hours(state.session.now(), hours).start
    });
    TimeRange::new(start, end).map_err(|e| ApiError::InvalidQuery(e.to_string()))
}
