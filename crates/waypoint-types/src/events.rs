//! Entity events: the mixed-type history of a single entity.
//!
//! On the wire an event is a flat object with an optional `t` tag and
//! tag-specific payload fields (`coords`, `wkt`, `what`). Decoding goes
//! through [`EventRecord`] and rejects events that end before they start or
//! lack the payload their tag requires.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::EventKind;
use crate::error::TypeError;
use crate::ids::EventId;
use crate::structs::LonLat;

/// Tag-specific payload of an [`EntityEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// Location fix with explicit coordinates.
    Point {
        /// Position as `[lon, lat]`.
        coords: LonLat,
    },
    /// Location given as WKT geometry. Only `POINT` geometry yields a
    /// waypoint.
    Loc {
        /// Raw WKT text.
        wkt: String,
    },
    /// Audio recording.
    Audio,
    /// Named incident.
    Event {
        /// Incident name, e.g. `speeding`.
        what: String,
    },
    /// Visual capture.
    Visual,
    /// Text record.
    Text,
    /// No tag.
    Untyped,
}

impl EventPayload {
    /// The wire tag of this payload.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Point { .. } => EventKind::Point,
            Self::Loc { .. } => EventKind::Loc,
            Self::Audio => EventKind::Audio,
            Self::Event { .. } => EventKind::Event,
            Self::Visual => EventKind::Visual,
            Self::Text => EventKind::Text,
            Self::Untyped => EventKind::Untyped,
        }
    }
}

/// A single event in an entity's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EventRecord", into = "EventRecord")]
pub struct EntityEvent {
    /// Event identifier.
    pub id: EventId,
    /// Timeline lane hint from the backend, e.g. `location` or `audio`.
    pub group: String,
    /// Start time.
    pub start: DateTime<Utc>,
    /// End time for interval events. Never before `start`.
    pub end: Option<DateTime<Utc>>,
    /// Tag-specific payload.
    pub payload: EventPayload,
}

impl EntityEvent {
    /// The wire tag of this event.
    pub const fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Whether this event carries a position (`point` or `loc`).
    pub const fn is_geographic(&self) -> bool {
        self.kind().is_geographic()
    }

    /// Explicit coordinates of a `point` event.
    pub const fn coords(&self) -> Option<LonLat> {
        match &self.payload {
            EventPayload::Point { coords } => Some(*coords),
            _ => None,
        }
    }

    /// WKT geometry of a `loc` event.
    pub fn wkt(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Loc { wkt } => Some(wkt.as_str()),
            _ => None,
        }
    }

    /// Duration of an interval event.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end.map(|end| end.signed_duration_since(self.start))
    }
}

/// Flat wire representation of an [`EntityEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventRecord {
    /// Event identifier.
    #[ts(as = "String")]
    pub id: EventId,
    /// Timeline lane hint.
    pub group: String,
    /// Kind tag; absent for untyped events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<EventKind>,
    /// Start time.
    pub start: DateTime<Utc>,
    /// Optional end time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// `[lon, lat]` for `point` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<LonLat>,
    /// WKT geometry for `loc` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkt: Option<String>,
    /// Incident name for `event` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub what: Option<String>,
}

impl TryFrom<EventRecord> for EntityEvent {
    type Error = TypeError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        if record.end.is_some_and(|end| end < record.start) {
            return Err(TypeError::EndBeforeStart {
                what: format!("event {}", record.id),
            });
        }

        let kind = record.t.unwrap_or(EventKind::Untyped);
        let missing = |field: &'static str| TypeError::MissingPayload {
            event_id: record.id.to_string(),
            kind: kind.as_str().to_owned(),
            field,
        };

        let payload = match kind {
            EventKind::Point => EventPayload::Point {
                coords: record.coords.ok_or_else(|| missing("coords"))?,
            },
            EventKind::Loc => EventPayload::Loc {
                wkt: record.wkt.ok_or_else(|| missing("wkt"))?,
            },
            EventKind::Event => EventPayload::Event {
                what: record.what.ok_or_else(|| missing("what"))?,
            },
            EventKind::Audio => EventPayload::Audio,
            EventKind::Visual => EventPayload::Visual,
            EventKind::Text => EventPayload::Text,
            EventKind::Untyped => EventPayload::Untyped,
        };

        Ok(Self {
            id: record.id,
            group: record.group,
            start: record.start,
            end: record.end,
            payload,
        })
    }
}

impl From<EntityEvent> for EventRecord {
    fn from(event: EntityEvent) -> Self {
        let t = match event.payload.kind() {
            EventKind::Untyped => None,
            kind => Some(kind),
        };
        let (coords, wkt, what) = match event.payload {
            EventPayload::Point { coords } => (Some(coords), None, None),
            EventPayload::Loc { wkt } => (None, Some(wkt), None),
            EventPayload::Event { what } => (None, None, Some(what)),
            EventPayload::Audio
            | EventPayload::Visual
            | EventPayload::Text
            | EventPayload::Untyped => (None, None, None),
        };
        Self {
            id: event.id,
            group: event.group,
            t,
            start: event.start,
            end: event.end,
            coords,
            wkt,
            what,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decodes_point_event() {
        let json = r#"{"id":"t1-g1","group":"location","t":"point",
            "coords":[34.8516,31.0461],"start":"2024-01-01T00:00:00Z"}"#;
        let event: EntityEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), EventKind::Point);
        assert!(event.is_geographic());
        assert!(event.coords().is_some());
        assert!(event.wkt().is_none());
    }

    #[test]
    fn missing_tag_is_untyped() {
        let json = r#"{"id":"x","group":"text","start":"2024-01-01T00:00:00Z"}"#;
        let event: EntityEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), EventKind::Untyped);
        let back = serde_json::to_value(&event).unwrap();
        assert!(back.get("t").is_none());
    }

    #[test]
    fn rejects_end_before_start() {
        let json = r#"{"id":"a","group":"audio","t":"audio",
            "start":"2024-01-01T00:10:00Z","end":"2024-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<EntityEvent>(json).is_err());
    }

    #[test]
    fn rejects_point_without_coords() {
        let json = r#"{"id":"p","group":"location","t":"point","start":"2024-01-01T00:00:00Z"}"#;
        let err = serde_json::from_str::<EntityEvent>(json).unwrap_err();
        assert!(err.to_string().contains("coords"));
    }

    #[test]
    fn interval_duration() {
        let json = r#"{"id":"a","group":"audio","t":"audio",
            "start":"2024-01-01T00:00:00Z","end":"2024-01-01T00:10:30Z"}"#;
        let event: EntityEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.duration().unwrap().num_seconds(), 630);
    }

    #[test]
    fn event_payload_survives_encoding() {
        let json = r#"{"id":"e","group":"event","t":"event","what":"speeding",
            "start":"2024-01-01T00:00:00Z"}"#;
        let event: EntityEvent = serde_json::from_str(json).unwrap();
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["what"], "speeding");
        assert_eq!(value["t"], "event");
    }
}
