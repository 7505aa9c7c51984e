//! Timeline models for the Waypoint dashboard.
//!
//! # Modules
//!
//! - [`view`] -- Items, groups, selection, window and the marker scrubbing
//!   state machine
//! - [`event_bus`] -- Typed broadcast bus of timeline events
//! - [`master`] -- Entity rows and highlight items of the master timeline
//! - [`entity`] -- Event lanes of a single entity's timeline
//! - [`options`] -- Zoom bounds and minute snapping
//! - [`error`] -- Error types

pub mod entity;
pub mod error;
pub mod event_bus;
pub mod master;
pub mod options;
pub mod view;

pub use crate::view::{
    SCRUB_MARKER_ID, TimelineCore, TimelineGroup, TimelineItem, TimelineMarker, TimelineWindow,
};
pub use entity::{ClusterTitle, Lane, duration_label, entity_items, lane_groups};
pub use error::TimelineError;
pub use event_bus::{
    HitArea, PointerEvent, TimelineEvent, TimelineEventBus, TimelineEventKind,
    TimelineSubscription,
};
pub use master::{
    entities_of_items, group_label_target, groups_from_entities, items_from_highlights,
    related_items,
};
pub use options::{TimelineOptions, snap_to_minute};
