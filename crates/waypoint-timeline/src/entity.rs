//! The entity timeline: one entity's events laid out in fixed lanes.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use waypoint_types::{EntityEvent, EventKind, EventPayload};

use crate::view::{TimelineGroup, TimelineItem};

/// A lane of the entity timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Lane {
    /// Location fixes.
    Locations,
    /// Audio recordings.
    Audio,
    /// Visual captures.
    Visual,
    /// Text records.
    Text,
    /// Named incidents.
    Events,
}

impl Lane {
    /// Every lane, top to bottom.
    pub const ALL: [Self; 5] = [
        Self::Locations,
        Self::Audio,
        Self::Visual,
        Self::Text,
        Self::Events,
    ];

    /// Lane id, also used as the timeline group id.
    pub const fn id(self) -> &'static str {
        match self {
            Self::Locations => "locations",
            Self::Audio => "audio",
            Self::Visual => "visual",
            Self::Text => "text",
            Self::Events => "events",
        }
    }

    /// Lane for an event kind. Untyped events have no lane of their own.
    pub const fn for_kind(kind: EventKind) -> Option<Self> {
        match kind {
            EventKind::Point | EventKind::Loc => Some(Self::Locations),
            EventKind::Audio => Some(Self::Audio),
            EventKind::Visual => Some(Self::Visual),
            EventKind::Text => Some(Self::Text),
            EventKind::Event => Some(Self::Events),
            EventKind::Untyped => None,
        }
    }

    /// Lane for a backend group hint such as `location` or `event`.
    pub fn from_group_hint(hint: &str) -> Option<Self> {
        match hint {
            "location" | "locations" => Some(Self::Locations),
            "audio" => Some(Self::Audio),
            "visual" => Some(Self::Visual),
            "text" => Some(Self::Text),
            "event" | "events" => Some(Self::Events),
            _ => None,
        }
    }

    /// Lane for an event: by kind, falling back to the group hint for
    /// untyped events.
    pub fn of(event: &EntityEvent) -> Option<Self> {
        Self::for_kind(event.kind()).or_else(|| Self::from_group_hint(&event.group))
    }
}

/// The fixed lane rows.
pub fn lane_groups() -> Vec<TimelineGroup> {
    Lane::ALL
        .iter()
        .zip(0_i64..)
        .map(|(lane, order)| TimelineGroup {
            id: lane.id().to_owned(),
            label: lane.id().to_owned(),
            order,
        })
        .collect()
}

/// Format an interval as `m:ss` (total minutes, zero-padded seconds).
pub fn duration_label(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!("{}:{:02}", total / 60, total % 60)
}

/// Lay out `events` as lane items. Events without a lane are skipped.
///
/// Interval items are labelled with their `m:ss` duration and incidents
/// with their name.
pub fn entity_items(events: &[EntityEvent]) -> Vec<TimelineItem> {
    events
        .iter()
        .filter_map(|event| {
            let lane = Lane::of(event)?;
            let label = match (&event.payload, event.duration()) {
                (EventPayload::Event { what }, _) => Some(what.clone()),
                (_, Some(duration)) => Some(duration_label(duration)),
                (_, None) => None,
            };
            Some(TimelineItem {
                id: event.id.to_string(),
                group: lane.id().to_owned(),
                start: event.start,
                end: event.end,
                label,
            })
        })
        .collect()
}

/// Title of a collapsed run of items in one lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ClusterTitle {
    /// The lane.
    pub lane: Lane,
    /// Number of items collapsed.
    pub count: usize,
}

impl ClusterTitle {
    /// Text shown on the collapsed marker.
    pub fn text(&self) -> String {
        format!("{} {}", self.count, self.lane.id())
    }
}
