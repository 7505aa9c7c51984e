//! Map-side geometry for the Waypoint dashboard.
//!
//! The browser view draws; this crate decides what it draws: where entities
//! project, how they cluster and dim, which entities a click or drag box
//! selects, and the trail overlay of a focused entity.
//!
//! # Modules
//!
//! - [`projection`] -- Web Mercator projection, extents and the view camera
//! - [`wkt`] -- `POINT`/`POLYGON` parsing and point-in-polygon
//! - [`features`] -- Feature id scheme and vector layers
//! - [`cluster`] -- Pixel-distance clustering and marker styling
//! - [`select`] -- Click hit resolution and drag-box selection
//! - [`trail`] -- Trail waypoints, connectors and the virtual position
//! - [`error`] -- Error types

pub mod cluster;
pub mod error;
pub mod features;
pub mod projection;
pub mod select;
pub mod trail;
pub mod wkt;

pub use cluster::{Cluster, ClusterMarker, Clusterer, EntityPoint, MemberStyle, style_clusters};
pub use error::MapError;
pub use features::{FeatureId, Layer};
pub use projection::{Extent, MapPoint, Viewport, from_lon_lat, resolution_for_zoom, to_lon_lat};
pub use select::{BoxSelectMode, ClickKind, ClickResult, box_select, hit_test, resolve_click};
pub use trail::{Connector, Trail, TrailPoint, VirtualPoint, Waypoint, build_trail};
