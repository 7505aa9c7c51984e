//! The master timeline: one row per entity, one item per highlight.
//!
//! Row ids are entity keys, so a row id is also the entity's map feature
//! id. A highlight sits on the row of its first entity. Selecting items on
//! the master timeline selects the entities that own them; selecting
//! entities on the map selects every highlight that involves one of them.

use waypoint_types::{Entity, EntityKey, Highlight, SelectionSet};

use crate::view::{TimelineGroup, TimelineItem};

/// Build one row per entity, ordered by numeric id where ids are numeric.
///
/// Non-numeric ids sort after numeric ones, by key. Entities with an
/// invalid key are skipped.
pub fn groups_from_entities(entities: &[Entity]) -> Vec<TimelineGroup> {
    let mut rows: Vec<(Option<i64>, String, TimelineGroup)> = entities
        .iter()
        .filter_map(|entity| {
            let key = entity.key().ok()?.to_string();
            let numeric = entity.id.parse::<i64>().ok();
            Some((
                numeric,
                key.clone(),
                TimelineGroup {
                    id: key,
                    label: entity.id.clone(),
                    order: 0,
                },
            ))
        })
        .collect();

    rows.sort_by(|(na, ka, _), (nb, kb, _)| match (na, nb) {
        (Some(a), Some(b)) => a.cmp(b).then_with(|| ka.cmp(kb)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => ka.cmp(kb),
    });

    rows.into_iter()
        .zip(0_i64..)
        .map(|((_, _, mut group), order)| {
            group.order = order;
            group
        })
        .collect()
}

/// One item per highlight, placed on its first entity's row.
///
/// Highlights without entities are skipped.
pub fn items_from_highlights(highlights: &[Highlight]) -> Vec<TimelineItem> {
    highlights
        .iter()
        .filter_map(|h| {
            let owner = h.primary_entity()?;
            Some(TimelineItem {
                id: h.id.to_string(),
                group: owner.to_string(),
                start: h.timestamp,
                end: h.timestamp_end,
                label: Some(h.kind.clone()),
            })
        })
        .collect()
}

/// Item ids of every highlight involving a selected entity.
///
/// An empty selection yields no items.
pub fn related_items(highlights: &[Highlight], selection: &SelectionSet) -> Vec<String> {
    if selection.is_empty() {
        return Vec::new();
    }
    let mut ids: Vec<String> = highlights
        .iter()
        .filter(|h| selection.intersects(h.entity_ids.iter()))
        .map(|h| h.id.to_string())
        .collect();
    ids.sort();
    ids
}

/// The entities owning the given items (each item's row).
///
/// Unknown item ids and rows that are not entity keys are ignored.
pub fn entities_of_items<'a>(
    items: impl IntoIterator<Item = &'a TimelineItem>,
    item_ids: &[String],
) -> SelectionSet {
    items
        .into_iter()
        .filter(|item| item_ids.contains(&item.id))
        .filter_map(|item| item.group.parse::<EntityKey>().ok())
        .collect()
}

/// The entity behind a row label click, if the row exists.
pub fn group_label_target(groups: &[TimelineGroup], group_id: &str) -> Option<EntityKey> {
    groups
        .iter()
        .find(|g| g.id == group_id)
        .and_then(|g| g.id.parse().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{TimeZone, Utc};
    use waypoint_types::LonLat;

    use super::*;

    fn entity(id: &str) -> Entity {
        Entity {
            entity_type: "truck".to_owned(),
            id: id.to_owned(),
            location: LonLat(35.0, 31.0),
        }
    }

    fn highlight(id: &str, entities: &[&str]) -> Highlight {
        Highlight {
            id: id.into(),
            entity_ids: entities.iter().map(|e| e.parse().unwrap()).collect(),
            kind: "speeding".to_owned(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            timestamp_end: None,
        }
    }

    fn key(s: &str) -> EntityKey {
        s.parse().unwrap()
    }

    #[test]
    fn rows_ordered_numerically() {
        let groups = groups_from_entities(&[entity("10"), entity("2"), entity("x"), entity("1")]);
        let ids: Vec<_> = groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["truck-1", "truck-2", "truck-10", "truck-x"]);
        assert_eq!(groups[3].order, 3);
    }

    #[test]
    fn highlight_lands_on_first_entity_row() {
        let items = items_from_highlights(&[
            highlight("event-1", &["truck-2", "truck-1"]),
            highlight("orphan", &[]),
        ]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].group, "truck-2");
        assert_eq!(items[0].label.as_deref(), Some("speeding"));
    }

    #[test]
    fn map_selection_highlights_related_items() {
        let highlights = vec![
            highlight("event-1", &["truck-1"]),
            highlight("event-2", &["truck-2"]),
            highlight("event-3", &["truck-3", "truck-1"]),
        ];
        let selection: SelectionSet = [key("truck-1")].into_iter().collect();
        assert_eq!(related_items(&highlights, &selection), vec!["event-1", "event-3"]);
        assert!(related_items(&highlights, &SelectionSet::new()).is_empty());
    }

    #[test]
    fn item_selection_maps_to_owning_entities() {
        let items = items_from_highlights(&[
            highlight("event-1", &["truck-1"]),
            highlight("event-2", &["truck-2"]),
            highlight("event-3", &["truck-1"]),
        ]);
        let picked = vec!["event-1".to_owned(), "event-3".to_owned()];
        let entities = entities_of_items(&items, &picked);
        assert_eq!(entities, [key("truck-1")].into_iter().collect());
        assert!(entities_of_items(&items, &[]).is_empty());
    }

    #[test]
    fn label_click_targets_row_entity() {
        let groups = groups_from_entities(&[entity("1")]);
        assert_eq!(group_label_target(&groups, "truck-1"), Some(key("truck-1")));
        assert_eq!(group_label_target(&groups, "truck-9"), None);
    }
}
