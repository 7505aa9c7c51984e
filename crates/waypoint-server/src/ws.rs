//! `WebSocket` handler for live dashboard snapshots.
//!
//! Clients connect to `GET /ws/state`, receive the current snapshot
//! immediately, then a JSON-encoded [`DashboardState`] each time the session
//! commits a new state. Text frames sent by the client are parsed as
//! [`Interaction`]s and dispatched; a frame that fails to parse or dispatch
//! is answered with an `{error}` frame.
//!
//! If a client falls behind, lagged snapshots are skipped and the client
//! resumes from the most recent one.
//!
//! [`DashboardState`]: waypoint_core::DashboardState

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use waypoint_core::Interaction;
use waypoint_data::DataSource;

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming dashboard snapshots.
///
/// # Route
///
/// `GET /ws/state`
pub async fn ws_state<S: DataSource>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: send the current snapshot, then
/// forward every committed snapshot and dispatch client interactions.
async fn handle_ws<S: DataSource>(mut socket: WebSocket, state: Arc<AppState<S>>) {
    debug!("WebSocket client connected");

    // Subscribe before reading the snapshot so no commit falls in between.
    let mut rx = state.session.subscribe();
    let initial = state.session.snapshot().await;
    if send_json(&mut socket, &*initial).await.is_err() {
        debug!("WebSocket client disconnected (initial send failed)");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(snapshot) => {
                        if send_json(&mut socket, &*snapshot).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Snapshot channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        // The resulting snapshot arrives through the channel.
                        if let Err(error) = dispatch_text(&state, text.as_str()).await {
                            debug!(%error, "WebSocket interaction rejected");
                            if send_json(&mut socket, &ErrorFrame { error }).await.is_err() {
                                debug!("WebSocket client disconnected (error send failed)");
                                return;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Error reply to a rejected client frame.
#[derive(Serialize)]
struct ErrorFrame {
    error: String,
}

/// Parse and dispatch one client text frame.
async fn dispatch_text<S: DataSource>(state: &AppState<S>, text: &str) -> Result<(), String> {
    let interaction: Interaction =
        serde_json::from_str(text).map_err(|e| format!("invalid interaction: {e}"))?;
    state
        .session
        .dispatch(interaction)
        .await
        .map(|_| ())
        .map_err(|e| format!("interaction rejected: {e}"))
}

/// Serialize `value` and send it as a text frame. Serialization failures
/// are logged and skipped.
async fn send_json<T: Serialize + ?Sized>(
    socket: &mut WebSocket,
    value: &T,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(value) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize WebSocket frame: {e}");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}
