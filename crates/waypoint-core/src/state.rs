//! Dashboard state: one immutable value per interaction.
//!
//! [`DashboardState`] is what both views render. The dispatcher produces a
//! new value for every interaction and every applied response; derived
//! fields (cluster markers, master timeline rows and items) are recomputed
//! with it so a snapshot is always self-consistent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use waypoint_map::{
    Cluster, ClusterMarker, Clusterer, EntityPoint, MapError, Trail, Viewport, from_lon_lat,
    style_clusters,
};
use waypoint_timeline::{TimelineGroup, TimelineItem, groups_from_entities, items_from_highlights};
use waypoint_types::{
    DetailsSection, Entity, EntityDetails, EntityKey, Highlight, Parameters, SelectionSet, TimeRange,
};

use crate::config::DashboardConfig;

/// The drilled-into entity and the scrubbed-to instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct FocusState {
    /// Entity whose detail view is open.
    #[serde(rename = "focusedEntityId")]
    #[ts(as = "Option<String>")]
    pub focused_entity: Option<EntityKey>,
    /// Timestamp chosen on the timeline; `None` means now.
    pub scrub_time: Option<DateTime<Utc>>,
}

impl FocusState {
    /// Whether `key` is the focused entity.
    pub fn is_focused(&self, key: &EntityKey) -> bool {
        self.focused_entity.as_ref() == Some(key)
    }
}

/// The timeline's view of the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimelineSelection {
    /// Highlighted entity rows.
    #[ts(as = "Vec<String>")]
    pub rows: SelectionSet,
    /// Selected highlight items.
    pub items: Vec<String>,
}

/// Everything the map, timelines and drawer render.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct DashboardState {
    /// Active query parameters.
    pub parameters: Parameters,
    /// Focus and scrub.
    pub focus: FocusState,
    /// Map selection.
    #[ts(as = "Vec<String>")]
    pub selection: SelectionSet,
    /// Timeline selection, kept equal to the map selection.
    pub timeline: TimelineSelection,
    /// Map camera.
    pub view: Viewport,
    /// Current cluster distance in pixels.
    pub cluster_distance_px: f64,
    /// Entity set of the last response.
    pub entities: Vec<Entity>,
    /// Clustered entity markers.
    pub markers: Vec<ClusterMarker>,
    /// Highlights of the last response.
    pub highlights: Vec<Highlight>,
    /// Master timeline rows.
    pub master_groups: Vec<TimelineGroup>,
    /// Master timeline items.
    pub master_items: Vec<TimelineItem>,
    /// Lane items of the focused entity.
    pub entity_items: Vec<TimelineItem>,
    /// Details of the focused entity.
    pub details: Option<EntityDetails>,
    /// Details laid out for the drawer.
    pub details_sections: Vec<DetailsSection>,
    /// History overlay of the focused entity.
    pub trail: Option<Trail>,
    /// Where the map should fly after focusing an entity.
    pub fly_to: Option<Viewport>,
}

impl DashboardState {
    /// Initial state: the configured default window ending now, the
    /// configured camera, nothing loaded.
    pub fn new(config: &DashboardConfig, now: DateTime<Utc>) -> Self {
        let range = TimeRange::last_hours(now, config.parameters.default_window_hours);
        Self {
            parameters: Parameters::with_range(range),
            focus: FocusState::default(),
            selection: SelectionSet::new(),
            timeline: TimelineSelection::default(),
            view: Viewport::centered_on(config.map.center, config.map.zoom),
            cluster_distance_px: config.map.cluster_distance_px,
            entities: Vec::new(),
            markers: Vec::new(),
            highlights: Vec::new(),
            master_groups: Vec::new(),
            master_items: Vec::new(),
            entity_items: Vec::new(),
            details: None,
            details_sections: Vec::new(),
            trail: None,
            fly_to: None,
        }
    }

    /// Entity positions in map coordinates. Entities with an invalid key
    /// are skipped.
    pub fn entity_points(&self) -> Vec<EntityPoint> {
        self.entities
            .iter()
            .filter_map(|e| {
                Some(EntityPoint {
                    key: e.key().ok()?,
                    position: from_lon_lat(e.location),
                })
            })
            .collect()
    }

    /// The entity with `key`, if loaded.
    pub fn entity(&self, key: &EntityKey) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.key().is_ok_and(|k| &k == key))
    }

    /// Clusters at the current camera.
    ///
    /// # Errors
    ///
    /// Returns a [`MapError`] if the camera zoom is out of range.
    pub fn clusters(&self) -> Result<Vec<Cluster>, MapError> {
        let resolution = self.view.resolution()?;
        Ok(Clusterer::new(self.cluster_distance_px).cluster(&self.entity_points(), resolution))
    }

    /// Recompute the cluster markers.
    ///
    /// # Errors
    ///
    /// Returns a [`MapError`] if the camera zoom is out of range.
    pub fn refresh_markers(&mut self) -> Result<(), MapError> {
        let clusters = self.clusters()?;
        self.markers = style_clusters(
            &clusters,
            self.focus.focused_entity.as_ref(),
            &self.selection,
        );
        Ok(())
    }

    /// Recompute master timeline rows and items.
    pub fn refresh_master(&mut self) {
        self.master_groups = groups_from_entities(&self.entities);
        self.master_items = items_from_highlights(&self.highlights);
    }

    /// Leave the focused entity: drop its lanes, details, overlay and
    /// fly-to target.
    pub fn clear_focus(&mut self) {
        self.focus.focused_entity = None;
        self.entity_items.clear();
        self.details = None;
        self.details_sections.clear();
        self.trail = None;
        self.fly_to = None;
    }

    /// Replace the details of the focused entity.
    pub fn set_details(&mut self, details: Option<EntityDetails>) {
        self.details_sections = details.as_ref().map(EntityDetails::sections).unwrap_or_default();
        self.details = details;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;
    use waypoint_types::LonLat;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn truck(id: &str, lon: f64, lat: f64) -> Entity {
        Entity {
            entity_type: "truck".to_owned(),
            id: id.to_owned(),
            location: LonLat(lon, lat),
        }
    }

    #[test]
    fn initial_window_is_open_and_six_hours_long() {
        let state = DashboardState::new(&DashboardConfig::default(), now());
        let range = state.parameters.time_range;
        assert!(range.is_open());
        assert_eq!(now().signed_duration_since(range.start).num_hours(), 6);
        assert!(state.parameters.selected_wkt.is_none());
    }

    #[test]
    fn nearby_entities_share_a_badge() {
        let mut state = DashboardState::new(&DashboardConfig::default(), now());
        state.entities = vec![
            truck("1", 35.0, 31.0),
            truck("2", 35.000_01, 31.000_01),
            truck("3", 34.0, 32.0),
        ];
        state.refresh_markers().unwrap();
        assert_eq!(state.markers.len(), 2);
        assert!(
            state
                .markers
                .iter()
                .any(|m| matches!(m, ClusterMarker::Badge { count: 2, .. }))
        );
    }

    #[test]
    fn focus_dims_other_entities() {
        let mut state = DashboardState::new(&DashboardConfig::default(), now());
        state.entities = vec![truck("1", 35.0, 31.0), truck("2", 34.0, 32.0)];
        state.focus.focused_entity = Some("truck-1".parse().unwrap());
        state.refresh_markers().unwrap();
        let dimmed: Vec<bool> = state
            .markers
            .iter()
            .filter_map(|m| match m {
                ClusterMarker::Entity { member, .. } => Some(member.dimmed),
                ClusterMarker::Badge { .. } => None,
            })
            .collect();
        assert_eq!(dimmed.len(), 2);
        assert_eq!(dimmed.iter().filter(|d| **d).count(), 1);
    }

    #[test]
    fn clear_focus_drops_overlay_and_details() {
        let mut state = DashboardState::new(&DashboardConfig::default(), now());
        state.focus.focused_entity = Some("truck-1".parse().unwrap());
        state.entity_items.push(TimelineItem {
            id: "t1-g1".to_owned(),
            group: "locations".to_owned(),
            start: now(),
            end: None,
            label: None,
        });
        state.clear_focus();
        assert_eq!(state.focus, FocusState::default());
        assert!(state.entity_items.is_empty());
        assert!(state.trail.is_none());
    }

    #[test]
    fn focus_serializes_with_wire_names() {
        let focus = FocusState {
            focused_entity: Some("truck-2".parse().unwrap()),
            scrub_time: None,
        };
        let json = serde_json::to_value(&focus).unwrap();
        assert_eq!(json["focusedEntityId"], "truck-2");
        assert!(json["scrubTime"].is_null());
    }
}
