//! Trail geometry for one entity's location history.
//!
//! Given the entity's waypoints and a scrub instant, [`build_trail`]
//! decides which waypoint is current, fades the others by index distance,
//! joins consecutive waypoints with arrow connectors and, when the scrub
//! instant falls strictly between two waypoints, places an interpolated
//! virtual position.
//!
//! Index rule, on waypoints sorted ascending by start:
//! - previous = greatest index with `start <= scrub`, or 0 if the scrub
//!   instant precedes every waypoint;
//! - next = least index with `start >= scrub`, absent if none.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use ts_rs::TS;
use waypoint_types::{EntityEvent, EntityKey, EventPayload, LonLat};

use crate::error::MapError;
use crate::features::FeatureId;
use crate::projection::{MapPoint, from_lon_lat};
use crate::wkt;

/// Default opacity floor for the waypoint farthest from the current one.
pub const DEFAULT_MIN_OPACITY: f64 = 0.5;

/// A timestamped position taken from a geographic event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    /// Event start.
    pub start: DateTime<Utc>,
    /// Event position.
    pub position: LonLat,
}

impl Waypoint {
    /// Extract the waypoint of a geographic event.
    ///
    /// Returns `Ok(None)` for non-geographic events.
    ///
    /// # Errors
    ///
    /// Returns a [`MapError`] if a `loc` event's WKT is malformed or is not
    /// a `POINT`.
    pub fn from_event(event: &EntityEvent) -> Result<Option<Self>, MapError> {
        let position = match &event.payload {
            EventPayload::Point { coords } => *coords,
            EventPayload::Loc { wkt } => wkt::parse_point(wkt)?,
            EventPayload::Audio
            | EventPayload::Event { .. }
            | EventPayload::Visual
            | EventPayload::Text
            | EventPayload::Untyped => return Ok(None),
        };
        Ok(Some(Self {
            start: event.start,
            position,
        }))
    }
}

/// A rendered trail waypoint.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TrailPoint {
    /// Feature id `{key}-{start}`.
    #[ts(as = "String")]
    pub id: FeatureId,
    /// Event start.
    pub start: DateTime<Utc>,
    /// Projected position.
    pub position: MapPoint,
    /// Opacity in `[min_opacity, 1]`.
    pub opacity: f64,
    /// Whether this is the previous (current) waypoint.
    pub current: bool,
}

/// A directional connector between two consecutive waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Connector {
    /// Feature id `{key}-{start1}-{start2}`.
    #[ts(as = "String")]
    pub id: FeatureId,
    /// Segment start.
    pub from: MapPoint,
    /// Segment end.
    pub to: MapPoint,
    /// Arrowhead position (segment midpoint).
    pub arrow: MapPoint,
    /// Segment angle `atan2(dy, dx)` in radians.
    pub angle: f64,
    /// Arrowhead rotation for the view (`-angle`).
    pub rotation: f64,
}

/// The interpolated position at the scrub instant.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VirtualPoint {
    /// Feature id `{key}-virtual`.
    #[ts(as = "String")]
    pub id: FeatureId,
    /// Interpolated position.
    pub position: MapPoint,
    /// Interpolation fraction in `[0, 1]`.
    pub fraction: f64,
}

/// The complete overlay for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Trail {
    /// Owning entity.
    #[ts(as = "String")]
    pub entity: EntityKey,
    /// Waypoints in ascending start order.
    pub points: Vec<TrailPoint>,
    /// One connector per consecutive waypoint pair.
    pub connectors: Vec<Connector>,
    /// Present only when the scrub instant is strictly inside a segment.
    #[serde(rename = "virtual")]
    pub virtual_point: Option<VirtualPoint>,
    /// Index of the previous (current) waypoint.
    pub previous: Option<usize>,
    /// Index of the next waypoint.
    pub next: Option<usize>,
}

impl Trail {
    /// Whether the trail draws nothing.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Previous and next waypoint indices for `scrub` over sorted waypoints.
///
/// Returns `None` for an empty slice.
pub fn neighbor_indices(
    waypoints: &[Waypoint],
    scrub: DateTime<Utc>,
) -> Option<(usize, Option<usize>)> {
    if waypoints.is_empty() {
        return None;
    }
    let after = waypoints.partition_point(|w| w.start <= scrub);
    let previous = after.saturating_sub(1);
    let next = waypoints.iter().position(|w| w.start >= scrub);
    Some((previous, next))
}

/// Opacity of waypoint `index` given the previous index and trail length.
///
/// Linear falloff from 1 at `previous` to `min_opacity` at the farthest
/// end; a single waypoint is fully opaque.
#[allow(clippy::cast_precision_loss)]
pub fn opacity(index: usize, previous: usize, len: usize, min_opacity: f64) -> f64 {
    let max_distance = previous.max(len.saturating_sub(1).saturating_sub(previous));
    if max_distance == 0 {
        return 1.0;
    }
    let step = (1.0 - min_opacity) / max_distance as f64;
    let distance = index.abs_diff(previous) as f64;
    (1.0 - distance * step).max(min_opacity)
}

/// Build the overlay for `key` from its waypoints.
///
/// Waypoints are sorted by start here, so callers may pass them in any
/// order. An empty input yields an empty trail.
pub fn build_trail(
    key: &EntityKey,
    mut waypoints: Vec<Waypoint>,
    scrub: DateTime<Utc>,
    min_opacity: f64,
) -> Trail {
    waypoints.sort_by_key(|w| w.start);

    let Some((previous, next)) = neighbor_indices(&waypoints, scrub) else {
        return Trail {
            entity: key.clone(),
            points: Vec::new(),
            connectors: Vec::new(),
            virtual_point: None,
            previous: None,
            next: None,
        };
    };

    let len = waypoints.len();
    let centers: Vec<MapPoint> = waypoints.iter().map(|w| from_lon_lat(w.position)).collect();

    let points = waypoints
        .iter()
        .zip(&centers)
        .enumerate()
        .map(|(i, (w, center))| TrailPoint {
            id: FeatureId::TrailPoint {
                key: key.clone(),
                start: w.start,
            },
            start: w.start,
            position: *center,
            opacity: opacity(i, previous, len, min_opacity),
            current: i == previous,
        })
        .collect();

    let connectors = waypoints
        .windows(2)
        .zip(centers.windows(2))
        .filter_map(|pair| match pair {
            ([a, b], [from, to]) => Some(connector(key, a, b, *from, *to)),
            _ => None,
        })
        .collect();

    let virtual_point = next.and_then(|next| {
        let prev_wp = waypoints.get(previous)?;
        let next_wp = waypoints.get(next)?;
        if !(prev_wp.start < scrub && scrub < next_wp.start) {
            return None;
        }
        let fraction = span_fraction(
            scrub.signed_duration_since(prev_wp.start),
            next_wp.start.signed_duration_since(prev_wp.start),
        )?;
        let from = *centers.get(previous)?;
        let to = *centers.get(next)?;
        Some(VirtualPoint {
            id: FeatureId::Virtual(key.clone()),
            position: from.lerp(to, fraction),
            fraction,
        })
    });

    Trail {
        entity: key.clone(),
        points,
        connectors,
        virtual_point,
        previous: Some(previous),
        next,
    }
}

/// `elapsed / span` at nanosecond precision, falling back to milliseconds
/// for spans too long to count in nanoseconds. `None` unless the ratio lies
/// in `[0, 1]`.
#[allow(clippy::cast_precision_loss)]
fn span_fraction(elapsed: TimeDelta, span: TimeDelta) -> Option<f64> {
    let fraction = match (elapsed.num_nanoseconds(), span.num_nanoseconds()) {
        (Some(elapsed), Some(span)) => elapsed as f64 / span as f64,
        _ => elapsed.num_milliseconds() as f64 / span.num_milliseconds() as f64,
    };
    (fraction.is_finite() && (0.0..=1.0).contains(&fraction)).then_some(fraction)
}

fn connector(key: &EntityKey, a: &Waypoint, b: &Waypoint, from: MapPoint, to: MapPoint) -> Connector {
    let angle = (to.y - from.y).atan2(to.x - from.x);
    Connector {
        id: FeatureId::TrailConnector {
            key: key.clone(),
            from: a.start,
            to: b.start,
        },
        from,
        to,
        arrow: from.midpoint(to),
        angle,
        rotation: -angle,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn wp(minute: i64, lon: f64, lat: f64) -> Waypoint {
        Waypoint {
            start: t(minute),
            position: LonLat(lon, lat),
        }
    }

    fn truck1() -> EntityKey {
        "truck-1".parse().unwrap()
    }

    #[test]
    fn scrub_between_waypoints() {
        let waypoints = vec![wp(0, 34.0, 31.0), wp(10, 34.1, 31.1), wp(20, 34.2, 31.2)];
        let trail = build_trail(&truck1(), waypoints, t(15), DEFAULT_MIN_OPACITY);

        assert_eq!(trail.previous, Some(1));
        assert_eq!(trail.next, Some(2));
        assert!(trail.points[1].current);

        let virt = trail.virtual_point.unwrap();
        assert!((virt.fraction - 0.5).abs() < 1e-12);
        let mid = trail.points[1].position.midpoint(trail.points[2].position);
        assert!(virt.position.distance(mid) < 1e-6);
    }

    /// Cross product of `a -> b` and `a -> p`; zero when `p` is on the line.
    const fn cross(a: MapPoint, b: MapPoint, p: MapPoint) -> f64 {
        (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
    }

    #[test]
    fn virtual_point_is_on_its_segment() {
        let waypoints = vec![wp(0, 34.0, 31.0), wp(10, 34.3, 31.4)];
        let trail = build_trail(&truck1(), waypoints, t(0) + Duration::seconds(150), 0.5);

        let virt = trail.virtual_point.unwrap();
        assert!((virt.fraction - 0.25).abs() < 1e-12);

        let (a, b) = (trail.points[0].position, trail.points[1].position);
        let segment = a.distance(b);
        assert!(cross(a, b, virt.position).abs() / segment < 1e-6);
        assert!((a.distance(virt.position) - 0.25 * segment).abs() < 1e-6);
        assert!((a.distance(virt.position) + virt.position.distance(b) - segment).abs() < 1e-6);
    }

    #[test]
    fn sub_millisecond_span_interpolates() {
        let start = t(0);
        let waypoints = vec![
            Waypoint {
                start,
                position: LonLat(34.0, 31.0),
            },
            Waypoint {
                start: start + Duration::microseconds(800),
                position: LonLat(34.1, 31.1),
            },
        ];
        let scrub = start + Duration::microseconds(400);
        let trail = build_trail(&truck1(), waypoints, scrub, DEFAULT_MIN_OPACITY);

        let virt = trail.virtual_point.unwrap();
        assert!(virt.fraction.is_finite());
        assert!((virt.fraction - 0.5).abs() < 1e-9);
        assert!(virt.position.x.is_finite() && virt.position.y.is_finite());
    }

    #[test]
    fn span_fraction_stays_in_unit_interval() {
        assert!(span_fraction(TimeDelta::zero(), TimeDelta::zero()).is_none());
        assert!(span_fraction(TimeDelta::seconds(2), TimeDelta::seconds(1)).is_none());

        let quarter = span_fraction(TimeDelta::nanoseconds(1), TimeDelta::nanoseconds(4)).unwrap();
        assert!((quarter - 0.25).abs() < 1e-12);

        // Too long for nanoseconds: falls back to milliseconds.
        let long = TimeDelta::days(400 * 365);
        assert!(long.num_nanoseconds().is_none());
        let half = span_fraction(long / 2, long).unwrap();
        assert!((half - 0.5).abs() < 1e-12);
    }

    #[test]
    fn scrub_before_all_uses_first() {
        let waypoints = vec![wp(10, 34.0, 31.0), wp(20, 34.1, 31.1)];
        let trail = build_trail(&truck1(), waypoints, t(5), DEFAULT_MIN_OPACITY);
        assert_eq!(trail.previous, Some(0));
        assert_eq!(trail.next, Some(0));
        assert!(trail.virtual_point.is_none());
    }

    #[test]
    fn scrub_after_all_has_no_next() {
        let waypoints = vec![wp(0, 34.0, 31.0), wp(10, 34.1, 31.1)];
        let trail = build_trail(&truck1(), waypoints, t(30), DEFAULT_MIN_OPACITY);
        assert_eq!(trail.previous, Some(1));
        assert_eq!(trail.next, None);
        assert!(trail.virtual_point.is_none());
    }

    #[test]
    fn scrub_on_waypoint_has_no_virtual() {
        let waypoints = vec![wp(0, 34.0, 31.0), wp(10, 34.1, 31.1), wp(20, 34.2, 31.2)];
        let trail = build_trail(&truck1(), waypoints, t(10), DEFAULT_MIN_OPACITY);
        assert_eq!(trail.previous, Some(1));
        assert_eq!(trail.next, Some(1));
        assert!(trail.virtual_point.is_none());
    }

    #[test]
    fn unsorted_input_is_sorted() {
        let waypoints = vec![wp(20, 34.2, 31.2), wp(0, 34.0, 31.0), wp(10, 34.1, 31.1)];
        let trail = build_trail(&truck1(), waypoints, t(15), DEFAULT_MIN_OPACITY);
        let starts: Vec<_> = trail.points.iter().map(|p| p.start).collect();
        assert_eq!(starts, vec![t(0), t(10), t(20)]);
    }

    #[test]
    fn opacity_falls_off_with_distance() {
        let len: usize = 7;
        for previous in 0..len {
            let mut by_distance: Vec<(usize, f64)> = (0..len)
                .map(|i| (i.abs_diff(previous), opacity(i, previous, len, 0.5)))
                .collect();
            by_distance.sort_by_key(|(d, _)| *d);
            for pair in by_distance.windows(2) {
                assert!(pair[1].1 <= pair[0].1 + 1e-12);
            }
            for (_, o) in &by_distance {
                assert!((0.5..=1.0).contains(o));
            }
        }
    }

    #[test]
    fn farthest_waypoint_reaches_floor() {
        assert!((opacity(4, 0, 5, 0.5) - 0.5).abs() < 1e-12);
        assert!((opacity(0, 0, 5, 0.5) - 1.0).abs() < 1e-12);
        assert!((opacity(0, 0, 1, 0.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn connectors_point_along_segments() {
        let waypoints = vec![wp(0, 34.0, 31.0), wp(10, 34.1, 31.0), wp(20, 34.1, 31.1)];
        let trail = build_trail(&truck1(), waypoints, t(30), DEFAULT_MIN_OPACITY);
        assert_eq!(trail.connectors.len(), 2);
        // Due east, then due north.
        assert!(trail.connectors[0].angle.abs() < 1e-9);
        assert!((trail.connectors[1].angle - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert!((trail.connectors[1].rotation + std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert_eq!(
            trail.connectors[0].id.to_string(),
            "truck-1-2024-01-01T00:00:00.000Z-2024-01-01T00:10:00.000Z"
        );
    }

    #[test]
    fn empty_input_is_empty_trail() {
        let trail = build_trail(&truck1(), Vec::new(), t(0), DEFAULT_MIN_OPACITY);
        assert!(trail.is_empty());
        assert!(trail.connectors.is_empty());
        assert!(trail.previous.is_none());
    }

    #[test]
    fn loc_event_must_be_point() {
        let json = r#"{"id":"l","group":"location","t":"loc",
            "wkt":"POLYGON ((0 0, 1 0, 1 1, 0 0))","start":"2024-01-01T00:00:00Z"}"#;
        let event: EntityEvent = serde_json::from_str(json).unwrap();
        assert!(Waypoint::from_event(&event).is_err());

        let json = r#"{"id":"l","group":"location","t":"loc",
            "wkt":"POINT (34 31)","start":"2024-01-01T00:00:00Z"}"#;
        let event: EntityEvent = serde_json::from_str(json).unwrap();
        assert!(Waypoint::from_event(&event).unwrap().is_some());
    }
}
