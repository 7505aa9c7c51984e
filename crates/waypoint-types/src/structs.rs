//! Core data-model structs: entities, time windows, query parameters,
//! highlights and entity details.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::DetailsSectionKind;
use crate::error::TypeError;
use crate::ids::{EntityKey, HighlightId};

// ---------------------------------------------------------------------------
// Geography
// ---------------------------------------------------------------------------

/// A WGS84 position, serialized as `[lon, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LonLat(pub f64, pub f64);

impl LonLat {
    /// Longitude in degrees.
    pub const fn lon(self) -> f64 {
        self.0
    }

    /// Latitude in degrees.
    pub const fn lat(self) -> f64 {
        self.1
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A tracked entity with its current location.
///
/// The working set of entities is replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Entity {
    /// Entity type, e.g. `truck`.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Per-type identifier.
    pub id: String,
    /// Current location.
    pub location: LonLat,
}

impl Entity {
    /// The composite identity key of this entity.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InvalidEntityKey`] if the type or id is empty or
    /// the type contains a `-`.
    pub fn key(&self) -> Result<EntityKey, TypeError> {
        EntityKey::new(self.entity_type.as_str(), self.id.as_str())
    }
}

// ---------------------------------------------------------------------------
// Time window and query parameters
// ---------------------------------------------------------------------------

/// A time window. `end = None` means "until now" and is resolved against
/// the current time whenever it is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimeRange {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Inclusive end, or `None` for open-ended.
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Build a closed or open range.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::EndBeforeStart`] if `end < start`.
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<Self, TypeError> {
        if end.is_some_and(|e| e < start) {
            return Err(TypeError::EndBeforeStart {
                what: "time range".to_owned(),
            });
        }
        Ok(Self { start, end })
    }

    /// An open-ended range starting at `start`.
    pub const fn open(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    /// An open-ended range covering the last `hours` hours before `now`.
    pub fn last_hours(now: DateTime<Utc>, hours: i64) -> Self {
        Self::open(
            Duration::try_hours(hours)
                .and_then(|d| now.checked_sub_signed(d))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }

    /// Whether the range is open-ended.
    pub const fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// The effective end, substituting `now` for an open end.
    pub fn resolved_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.end.unwrap_or(now)
    }

    /// Whether `t` falls inside the range as evaluated at `now`.
    pub fn contains(&self, t: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.resolved_end(now)
    }

    /// Whether `self` lies entirely inside `outer` as evaluated at `now`.
    pub fn is_within(&self, outer: &Self, now: DateTime<Utc>) -> bool {
        outer.start <= self.start && self.resolved_end(now) <= outer.resolved_end(now)
    }
}

/// Query parameters shared by every entity and event query.
///
/// Used as a cache-key component: callers replace it, never mutate it in
/// place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Parameters {
    /// Optional spatial filter as a WKT polygon. A new polygon replaces the
    /// previous one.
    pub selected_wkt: Option<String>,
    /// The active time window.
    pub time_range: TimeRange,
}

impl Parameters {
    /// Parameters with the given window and no spatial filter.
    pub const fn with_range(time_range: TimeRange) -> Self {
        Self {
            selected_wkt: None,
            time_range,
        }
    }
}

// ---------------------------------------------------------------------------
// Highlights
// ---------------------------------------------------------------------------

/// A notable cross-entity event shown on the master timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Highlight {
    /// Highlight identifier.
    #[ts(as = "String")]
    pub id: HighlightId,
    /// Entities involved; the first one owns the timeline row.
    #[ts(as = "Vec<String>")]
    pub entity_ids: Vec<EntityKey>,
    /// Highlight type, e.g. `speeding` or `audio_alert`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Start time.
    pub timestamp: DateTime<Utc>,
    /// End time for interval highlights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_end: Option<DateTime<Utc>>,
}

impl Highlight {
    /// Whether this highlight involves `key`.
    pub fn involves(&self, key: &EntityKey) -> bool {
        self.entity_ids.contains(key)
    }

    /// The entity whose timeline row carries this highlight.
    pub fn primary_entity(&self) -> Option<&EntityKey> {
        self.entity_ids.first()
    }
}

// ---------------------------------------------------------------------------
// Entity details
// ---------------------------------------------------------------------------

/// Descriptive metadata for the details panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EntityDetails {
    /// Entity key as a string.
    pub entity_id: String,
    /// Operation identifier.
    pub op_id: String,
    /// Whether the entity is currently driving.
    pub is_drive: bool,
    /// Free-form description.
    pub description: String,
    /// Registration number.
    pub number: String,
    /// EI hardware identifier.
    pub id_ei: String,
    /// SI hardware identifier.
    pub id_si: String,
    /// Network MAC address.
    pub mac: String,
    /// Reporting application id.
    pub app_id: String,
    /// Reporting application source.
    pub app_source: String,
    /// First time the entity was observed.
    pub first_seen: DateTime<Utc>,
    /// Last time the entity was observed.
    pub last_seen: DateTime<Utc>,
    /// Identifier the entity was first reported under.
    pub first_id: String,
    /// Final analyst description. The wire name keeps the backend spelling.
    #[serde(rename = "final_decription")]
    pub final_description: String,
}

/// One labelled value in the details panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DetailField {
    /// Field key (wire name).
    pub key: String,
    /// Display value.
    pub value: String,
}

/// A titled group of fields in the details panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DetailsSection {
    /// Which section this is.
    pub kind: DetailsSectionKind,
    /// Fields in display order.
    pub fields: Vec<DetailField>,
}

impl EntityDetails {
    /// Lay the record out into the panel's fixed sections.
    ///
    /// Booleans render as `yes`/`no`; visibility timestamps render as
    /// `YYYY-MM-DD HH:MM:SS` UTC.
    pub fn sections(&self) -> Vec<DetailsSection> {
        let text = |key: &str, value: &str| DetailField {
            key: key.to_owned(),
            value: value.to_owned(),
        };
        let time = |key: &str, value: DateTime<Utc>| DetailField {
            key: key.to_owned(),
            value: value.format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        vec![
            DetailsSection {
                kind: DetailsSectionKind::Identifiers,
                fields: vec![
                    text("op_id", &self.op_id),
                    text("number", &self.number),
                    text("id_ei", &self.id_ei),
                    text("id_si", &self.id_si),
                    text("mac", &self.mac),
                ],
            },
            DetailsSection {
                kind: DetailsSectionKind::Visibility,
                fields: vec![
                    time("first_seen", self.first_seen),
                    time("last_seen", self.last_seen),
                ],
            },
            DetailsSection {
                kind: DetailsSectionKind::Misc,
                fields: vec![
                    text("is_drive", if self.is_drive { "yes" } else { "no" }),
                    text("final_decription", &self.final_description),
                    text("description", &self.description),
                    text("app_id", &self.app_id),
                    text("app_source", &self.app_source),
                    text("first_id", &self.first_id),
                ],
            },
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap()
    }

    #[test]
    fn entity_wire_shape() {
        let json = r#"{"type":"truck","id":"1","location":[34.7818,32.0853]}"#;
        let entity: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.entity_type, "truck");
        assert_eq!(entity.key().unwrap().to_string(), "truck-1");
        assert!((entity.location.lat() - 32.0853).abs() < 1e-9);
    }

    #[test]
    fn time_range_rejects_inverted() {
        assert!(TimeRange::new(at(10), Some(at(5))).is_err());
        assert!(TimeRange::new(at(5), Some(at(5))).is_ok());
    }

    #[test]
    fn open_range_resolves_against_now() {
        let range = TimeRange::open(at(0));
        assert!(range.contains(at(30), at(40)));
        assert!(!range.contains(at(50), at(40)));
        // Re-evaluated, not frozen.
        assert!(range.contains(at(50), at(55)));
    }

    #[test]
    fn sub_range_check() {
        let outer = TimeRange::open(at(0));
        let inner = TimeRange::new(at(10), Some(at(20))).unwrap();
        assert!(inner.is_within(&outer, at(30)));
        assert!(!outer.is_within(&inner, at(30)));
    }

    #[test]
    fn parameters_use_camel_case() {
        let params = Parameters::with_range(TimeRange::open(at(0)));
        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("timeRange").is_some());
        assert!(json.get("selectedWkt").is_some());
    }

    #[test]
    fn highlight_wire_shape() {
        let json = r#"{"id":"event-7","entityIds":["truck-2"],"type":"audio_alert",
            "timestamp":"2024-01-01T00:00:00Z","timestampEnd":"2024-01-01T00:18:00Z"}"#;
        let highlight: Highlight = serde_json::from_str(json).unwrap();
        let key: EntityKey = "truck-2".parse().unwrap();
        assert!(highlight.involves(&key));
        assert_eq!(highlight.primary_entity(), Some(&key));
        assert_eq!(highlight.timestamp_end, Some(at(18)));
    }

    #[test]
    fn details_sections_format_values() {
        let details = EntityDetails {
            entity_id: "truck-1".to_owned(),
            op_id: "op".to_owned(),
            is_drive: true,
            description: String::new(),
            number: "12-345-67".to_owned(),
            id_ei: "ei".to_owned(),
            id_si: "si".to_owned(),
            mac: "00:11".to_owned(),
            app_id: "app".to_owned(),
            app_source: "src".to_owned(),
            first_seen: at(1),
            last_seen: at(2),
            first_id: "first".to_owned(),
            final_description: "final".to_owned(),
        };
        let sections = details.sections();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[1].fields[0].value, "2024-01-01 00:01:00");
        assert_eq!(sections[2].fields[0].value, "yes");

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["final_decription"], "final");
    }
}
