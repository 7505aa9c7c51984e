//! Shared type definitions for the Waypoint dashboard.
//!
//! This crate is the single source of truth for the data model exchanged
//! between the backend contracts, the dashboard core and the browser views.
//! Types flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Entity keys, event/highlight ids and session ids
//! - [`enums`] -- Event kinds and details-panel sections
//! - [`structs`] -- Entities, time ranges, query parameters, highlights, details
//! - [`events`] -- The tagged entity event union and its wire record
//! - [`selection`] -- The cross-view selection set
//! - [`error`] -- Validation errors

pub mod enums;
pub mod error;
pub mod events;
pub mod ids;
pub mod selection;
pub mod structs;

pub use enums::{DetailsSectionKind, EventKind};
pub use error::TypeError;
pub use events::{EntityEvent, EventPayload, EventRecord};
pub use ids::{EntityKey, EventId, HighlightId, SessionId};
pub use selection::SelectionSet;
pub use structs::{
    DetailField, DetailsSection, Entity, EntityDetails, Highlight, LonLat, Parameters, TimeRange,
};
