//! HTTP surface for the Waypoint dashboard.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Data endpoints** (`/api/entities`, `/api/highlights`,
//!   `/api/groups/search`) querying the backend directly
//! - **Session endpoints** (`/api/state`, `/api/interactions`) reading and
//!   driving one shared dashboard session
//! - **`WebSocket` endpoint** (`/ws/state`) streaming every committed
//!   snapshot via [`tokio::sync::broadcast`]
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! Handlers are generic over the [`DataSource`](waypoint_data::DataSource)
//! so tests run the whole router against the mock backend. The binary
//! wires the mock backend, the system clock and one [`Session`] together.
//!
//! [`Session`]: waypoint_core::Session

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
