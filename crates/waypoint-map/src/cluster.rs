//! Pixel-distance clustering of entity positions and cluster styling.
//!
//! Clustering is greedy in input order: the first unclustered entity claims
//! every other unclustered entity inside a square of half-width
//! `distance_px * resolution` around it, and the cluster sits at the
//! members' centroid. Re-running with the same input yields the same
//! clusters.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use waypoint_types::{EntityKey, SelectionSet};

use crate::projection::{Extent, MapPoint};

/// Default cluster distance in pixels.
pub const DEFAULT_DISTANCE_PX: f64 = 10.0;

/// Click radius of a single-entity marker, in pixels.
pub const ENTITY_HIT_RADIUS_PX: f64 = 10.0;

/// Click radius of a count badge, in pixels.
pub const BADGE_HIT_RADIUS_PX: f64 = 14.0;

/// An entity placed on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPoint {
    /// Entity key (also its feature id).
    pub key: EntityKey,
    /// Projected position.
    pub position: MapPoint,
}

/// A group of nearby entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Centroid of the members.
    pub center: MapPoint,
    /// Member keys in input order. Never empty.
    pub members: Vec<EntityKey>,
}

impl Cluster {
    /// Number of members.
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Whether the cluster renders as a plain entity.
    pub fn is_single(&self) -> bool {
        self.members.len() == 1
    }

    /// Whether `key` is a member.
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.members.contains(key)
    }

    /// Click radius in pixels for this cluster's marker.
    pub fn hit_radius_px(&self) -> f64 {
        if self.is_single() {
            ENTITY_HIT_RADIUS_PX
        } else {
            BADGE_HIT_RADIUS_PX
        }
    }
}

/// Groups entities whose screen distance is below a threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clusterer {
    distance_px: f64,
}

impl Default for Clusterer {
    fn default() -> Self {
        Self::new(DEFAULT_DISTANCE_PX)
    }
}

impl Clusterer {
    /// A clusterer with the given pixel distance. Negative or non-finite
    /// values are treated as zero (no clustering).
    pub const fn new(distance_px: f64) -> Self {
        Self {
            distance_px: sanitize(distance_px),
        }
    }

    /// The current pixel distance.
    pub const fn distance_px(&self) -> f64 {
        self.distance_px
    }

    /// Change the pixel distance at runtime.
    pub const fn set_distance(&mut self, distance_px: f64) {
        self.distance_px = sanitize(distance_px);
    }

    /// Cluster `points` at the given resolution (meters per pixel).
    pub fn cluster(&self, points: &[EntityPoint], resolution: f64) -> Vec<Cluster> {
        let map_distance = self.distance_px * resolution;
        let mut claimed = vec![false; points.len()];
        let mut clusters = Vec::new();

        for (i, seed) in points.iter().enumerate() {
            if claimed.get(i).copied().unwrap_or(true) {
                continue;
            }
            let extent = Extent::around(seed.position, map_distance);
            let mut members = Vec::new();
            let (mut sum_x, mut sum_y) = (0.0, 0.0);
            for (flag, candidate) in claimed.iter_mut().zip(points) {
                if !*flag && extent.contains(candidate.position) {
                    *flag = true;
                    sum_x += candidate.position.x;
                    sum_y += candidate.position.y;
                    members.push(candidate.key.clone());
                }
            }
            #[allow(clippy::cast_precision_loss)]
            let n = members.len() as f64;
            clusters.push(Cluster {
                center: MapPoint::new(sum_x / n, sum_y / n),
                members,
            });
        }
        clusters
    }
}

const fn sanitize(distance_px: f64) -> f64 {
    if distance_px.is_finite() && distance_px > 0.0 {
        distance_px
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Styling
// ---------------------------------------------------------------------------

/// Style flags of one entity inside a rendered marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MemberStyle {
    /// Entity key.
    #[ts(as = "String")]
    pub key: EntityKey,
    /// Rendered at reduced opacity because another entity is focused.
    pub dimmed: bool,
    /// Part of the current selection.
    pub selected: bool,
}

/// What the view draws for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ClusterMarker {
    /// A size-1 cluster, drawn as the entity itself.
    Entity {
        /// Marker position.
        center: MapPoint,
        /// The entity.
        member: MemberStyle,
    },
    /// A size > 1 cluster, drawn as a count badge.
    Badge {
        /// Marker position.
        center: MapPoint,
        /// Number shown on the badge.
        count: usize,
        /// Dimmed unless one of the members is focused.
        dimmed: bool,
        /// Per-member flags.
        members: Vec<MemberStyle>,
    },
}

/// Style every cluster for display.
///
/// With a focused entity, every other entity is dimmed (never hidden),
/// including members of badges.
pub fn style_clusters(
    clusters: &[Cluster],
    focused: Option<&EntityKey>,
    selection: &SelectionSet,
) -> Vec<ClusterMarker> {
    let style = |key: &EntityKey| MemberStyle {
        key: key.clone(),
        dimmed: focused.is_some_and(|f| f != key),
        selected: selection.contains(key),
    };

    clusters
        .iter()
        .filter_map(|cluster| match cluster.members.as_slice() {
            [] => None,
            [only] => Some(ClusterMarker::Entity {
                center: cluster.center,
                member: style(only),
            }),
            many => {
                let members: Vec<MemberStyle> = many.iter().map(style).collect();
                Some(ClusterMarker::Badge {
                    center: cluster.center,
                    count: members.len(),
                    dimmed: members.iter().all(|m| m.dimmed),
                    members,
                })
            }
        })
        .collect()
}
