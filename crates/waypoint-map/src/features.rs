//! Feature identifiers and map layers.
//!
//! Feature ids follow a fixed scheme so the browser view can address any
//! rendered feature:
//!
//! | Feature         | Id                          |
//! |-----------------|-----------------------------|
//! | entity          | `{type}-{id}`               |
//! | trail waypoint  | `{key}-{start}`             |
//! | trail connector | `{key}-{start1}-{start2}`   |
//! | virtual point   | `{key}-virtual`             |
//!
//! Clusters have no id. Timestamps are RFC 3339 in UTC.

use core::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use waypoint_types::EntityKey;

/// Identifier of a rendered map feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureId {
    /// A live entity.
    Entity(EntityKey),
    /// A historical waypoint of an entity's trail.
    TrailPoint {
        /// Owning entity.
        key: EntityKey,
        /// Start of the waypoint's event.
        start: DateTime<Utc>,
    },
    /// The connector between two consecutive waypoints.
    TrailConnector {
        /// Owning entity.
        key: EntityKey,
        /// Start of the segment's first event.
        from: DateTime<Utc>,
        /// Start of the segment's second event.
        to: DateTime<Utc>,
    },
    /// The interpolated position at the scrub time.
    Virtual(EntityKey),
}

impl FeatureId {
    /// The entity this feature belongs to.
    pub const fn entity_key(&self) -> &EntityKey {
        match self {
            Self::Entity(key)
            | Self::Virtual(key)
            | Self::TrailPoint { key, .. }
            | Self::TrailConnector { key, .. } => key,
        }
    }
}

fn stamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(key) => write!(f, "{key}"),
            Self::TrailPoint { key, start } => write!(f, "{key}-{}", stamp(*start)),
            Self::TrailConnector { key, from, to } => {
                write!(f, "{key}-{}-{}", stamp(*from), stamp(*to))
            }
            Self::Virtual(key) => write!(f, "{key}-virtual"),
        }
    }
}

impl Serialize for FeatureId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The vector layers of the map, bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Layer {
    /// The user-drawn spatial filter polygon.
    Drawings,
    /// Entities and clusters.
    Clusters,
    /// The focused entity's trail overlay.
    History,
}

impl Layer {
    /// Whether features on this layer take part in click/box selection.
    pub const fn is_selectable(self) -> bool {
        matches!(self, Self::Clusters)
    }
}
