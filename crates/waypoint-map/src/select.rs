//! Map selection: click hit resolution and drag-box selection.
//!
//! A click resolves against rendered clusters. A single hit selects every
//! member of the hit cluster (a badge expands to its members, never to a
//! synthetic cluster id). Several stacked hits are ambiguous and select
//! nothing. A miss clears the selection. The platform modifier toggles the
//! hit members instead of replacing the selection.
//!
//! A shift-drag box selects every entity whose position falls inside the
//! box, either replacing or extending the current selection.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use waypoint_types::SelectionSet;

use crate::cluster::{Cluster, EntityPoint};
use crate::projection::{Extent, MapPoint};

/// How a drag box combines with the existing selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BoxSelectMode {
    /// The box contents become the whole selection.
    #[default]
    Replace,
    /// The box contents are added to the selection.
    Union,
}

/// How a click was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    /// Nothing selectable under the pointer.
    Empty,
    /// Exactly one marker under the pointer.
    Single,
    /// Several stacked markers under the pointer.
    Ambiguous {
        /// Number of markers hit.
        hits: usize,
    },
}

/// The outcome of resolving a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickResult {
    /// The new map selection.
    pub selection: SelectionSet,
    /// How the click was interpreted.
    pub kind: ClickKind,
}

/// Clusters whose marker covers `at` at the given resolution.
pub fn hit_test<'a>(clusters: &'a [Cluster], at: MapPoint, resolution: f64) -> Vec<&'a Cluster> {
    clusters
        .iter()
        .filter(|c| c.center.distance(at) <= c.hit_radius_px() * resolution)
        .collect()
}

/// Resolve a click at `at` into a new selection.
///
/// With `toggle` set, a single hit flips each hit member in `current`, and
/// an empty or ambiguous click leaves `current` unchanged.
pub fn resolve_click(
    current: &SelectionSet,
    clusters: &[Cluster],
    at: MapPoint,
    resolution: f64,
    toggle: bool,
) -> ClickResult {
    let hits = hit_test(clusters, at, resolution);
    match hits.as_slice() {
        [] => ClickResult {
            selection: if toggle { current.clone() } else { SelectionSet::new() },
            kind: ClickKind::Empty,
        },
        [cluster] => {
            let selection = if toggle {
                let mut next = current.clone();
                for key in &cluster.members {
                    next.toggle(key.clone());
                }
                next
            } else {
                cluster.members.iter().cloned().collect()
            };
            ClickResult {
                selection,
                kind: ClickKind::Single,
            }
        }
        many => {
            tracing::debug!(hits = many.len(), "ambiguous map click");
            ClickResult {
                selection: if toggle { current.clone() } else { SelectionSet::new() },
                kind: ClickKind::Ambiguous { hits: many.len() },
            }
        }
    }
}

/// Select every entity whose position lies inside `extent`.
pub fn box_select(
    current: &SelectionSet,
    entities: &[EntityPoint],
    extent: Extent,
    mode: BoxSelectMode,
) -> SelectionSet {
    let inside: SelectionSet = entities
        .iter()
        .filter(|e| extent.contains(e.position))
        .map(|e| e.key.clone())
        .collect();
    match mode {
        BoxSelectMode::Replace => inside,
        BoxSelectMode::Union => current.union(&inside),
    }
}
