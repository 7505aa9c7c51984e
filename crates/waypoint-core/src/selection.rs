//! Selection synchronizer between the map and the timeline.
//!
//! Two one-way bindings keep the map selection and the timeline selection
//! equal. Each writes its target slice only when the computed value
//! differs from what is already there, so applying a binding twice is a
//! no-op and the pair never cycles.

use waypoint_timeline::{entities_of_items, related_items};

use crate::state::{DashboardState, TimelineSelection};

/// The timeline slice implied by the map selection: the selected rows plus
/// every highlight involving a selected entity.
pub fn timeline_slice_for(state: &DashboardState) -> TimelineSelection {
    TimelineSelection {
        rows: state.selection.clone(),
        items: related_items(&state.highlights, &state.selection),
    }
}

/// Map selection to timeline. Returns whether the timeline slice changed.
pub fn sync_map_to_timeline(state: &mut DashboardState) -> bool {
    let target = timeline_slice_for(state);
    if state.timeline == target {
        return false;
    }
    tracing::debug!(
        rows = target.rows.len(),
        items = target.items.len(),
        "timeline selection follows map"
    );
    state.timeline = target;
    true
}

/// Timeline items to map. The map selection becomes the entities owning the
/// selected items. Returns whether the map selection changed.
pub fn sync_timeline_to_map(state: &mut DashboardState) -> bool {
    let target = entities_of_items(&state.master_items, &state.timeline.items);
    if state.selection == target {
        return false;
    }
    tracing::debug!(entities = target.len(), "map selection follows timeline");
    state.selection = target;
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use waypoint_types::{EntityKey, Highlight, SelectionSet};

    use super::*;
    use crate::config::DashboardConfig;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn key(s: &str) -> EntityKey {
        s.parse().unwrap()
    }

    fn highlight(id: &str, entity: &str) -> Highlight {
        Highlight {
            id: id.into(),
            entity_ids: vec![key(entity)],
            kind: "speeding".to_owned(),
            timestamp: now(),
            timestamp_end: None,
        }
    }

    fn state() -> DashboardState {
        let mut state = DashboardState::new(&DashboardConfig::default(), now());
        state.highlights = vec![
            highlight("event-1", "truck-1"),
            highlight("event-2", "truck-2"),
            highlight("event-6", "truck-1"),
        ];
        state.refresh_master();
        state
    }

    #[test]
    fn map_selection_drives_timeline() {
        let mut state = state();
        state.selection = [key("truck-1")].into_iter().collect();
        assert!(sync_map_to_timeline(&mut state));
        assert_eq!(state.timeline.rows, state.selection);
        assert_eq!(state.timeline.items, vec!["event-1", "event-6"]);
        assert!(!sync_map_to_timeline(&mut state));
    }

    #[test]
    fn timeline_items_drive_map() {
        let mut state = state();
        state.timeline.items = vec!["event-2".to_owned()];
        assert!(sync_timeline_to_map(&mut state));
        assert_eq!(state.selection, [key("truck-2")].into_iter().collect());
        assert!(!sync_timeline_to_map(&mut state));
    }

    #[test]
    fn bindings_converge_without_cycling() {
        let mut state = state();
        state.timeline.items = vec!["event-1".to_owned()];
        sync_timeline_to_map(&mut state);
        sync_map_to_timeline(&mut state);
        // The row now also highlights event-6; mapping back changes nothing.
        assert_eq!(state.timeline.items, vec!["event-1", "event-6"]);
        assert!(!sync_timeline_to_map(&mut state));
        assert!(!sync_map_to_timeline(&mut state));
    }

    #[test]
    fn empty_map_selection_clears_timeline() {
        let mut state = state();
        state.selection = [key("truck-1")].into_iter().collect();
        sync_map_to_timeline(&mut state);
        state.selection = SelectionSet::new();
        assert!(sync_map_to_timeline(&mut state));
        assert!(state.timeline.rows.is_empty());
        assert!(state.timeline.items.is_empty());
    }

    #[test]
    fn empty_timeline_selection_clears_map() {
        let mut state = state();
        state.selection = [key("truck-1"), key("truck-2")].into_iter().collect();
        state.timeline.items.clear();
        assert!(sync_timeline_to_map(&mut state));
        assert!(state.selection.is_empty());
    }
}
