//! In-repo mock backend: five trucks driving across the country.
//!
//! Every timestamp is relative to an anchor time fixed at construction, so
//! a freshly started server always shows routes ending 40 minutes ago.
//! Open-ended ranges are resolved against the wall clock at query time.
//!
//! | Truck | Route | Final position |
//! |-------|-------|----------------|
//! | 1 | Beer Sheva to Tel Aviv | `[34.7818, 32.0853]` |
//! | 2 | Tel Aviv to Jerusalem | `[35.2137, 31.7683]` |
//! | 3 | Tel Aviv to Haifa | `[34.9896, 32.7940]` |
//! | 4 | Jerusalem to Beer Sheva | `[34.8516, 31.0461]` |
//! | 5 | Haifa to Tiberias | `[35.4983, 32.9257]` |

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use tokio::sync::RwLock;
use waypoint_map::wkt;
use waypoint_types::{
    Entity, EntityDetails, EntityEvent, EntityKey, EventPayload, Highlight, LonLat, Parameters,
    TimeRange,
};

use crate::error::DataError;
use crate::source::{DataSource, GroupOption, GroupSearchResults};

/// Entity type of every mock entity.
pub const TRUCK: &str = "truck";

/// Center around which random debug entities are placed.
pub const RANDOM_ENTITY_CENTER: LonLat = LonLat(34.8, 31.2);

/// Maximum offset in degrees of a random entity from the center.
const RANDOM_SPREAD_DEG: f64 = 0.5;

/// Minutes before the anchor of a route's first waypoint.
const FIRST_SEEN_MINUTES: i64 = 240;

/// Minutes before the anchor of a route's last waypoint.
const LAST_SEEN_MINUTES: i64 = 40;

/// Minutes before the anchor at which each route waypoint was recorded.
const ROUTE_MINUTES: [i64; 6] = [FIRST_SEEN_MINUTES, 200, 160, 120, 80, LAST_SEEN_MINUTES];

/// Heading of the group search results.
const GROUP_HEADING: &str = "Groups";

struct Route {
    id: &'static str,
    destination: &'static str,
    waypoints: [(f64, f64); 6],
    /// Audio recording as (start, end) minutes before the anchor.
    audio: (i64, i64),
    /// Incident name and minutes before the anchor.
    incident: (&'static str, i64),
}

const ROUTES: [Route; 5] = [
    Route {
        id: "1",
        destination: "Tel Aviv",
        waypoints: [
            (34.8516, 31.0461),
            (34.8200, 31.2500),
            (34.8000, 31.5000),
            (34.7900, 31.7500),
            (34.7850, 31.9500),
            (34.7818, 32.0853),
        ],
        audio: (180, 170),
        incident: ("speeding", 150),
    },
    Route {
        id: "2",
        destination: "Jerusalem",
        waypoints: [
            (34.7818, 32.0853),
            (34.8500, 31.9500),
            (34.9500, 31.8500),
            (35.0500, 31.8000),
            (35.1500, 31.7800),
            (35.2137, 31.7683),
        ],
        audio: (130, 115),
        incident: ("harsh_braking", 90),
    },
    Route {
        id: "3",
        destination: "Haifa",
        waypoints: [
            (34.7818, 32.0853),
            (34.8000, 32.2500),
            (34.8500, 32.4000),
            (34.9000, 32.5500),
            (34.9500, 32.7000),
            (34.9896, 32.7940),
        ],
        audio: (210, 195),
        incident: ("speeding", 100),
    },
    Route {
        id: "4",
        destination: "Beer Sheva",
        waypoints: [
            (35.2137, 31.7683),
            (35.1000, 31.6000),
            (35.0000, 31.4500),
            (34.9500, 31.3000),
            (34.9000, 31.1500),
            (34.8516, 31.0461),
        ],
        audio: (150, 140),
        incident: ("harsh_acceleration", 110),
    },
    Route {
        id: "5",
        destination: "Tiberias",
        waypoints: [
            (34.9896, 32.7940),
            (35.1000, 32.8000),
            (35.2000, 32.8500),
            (35.3000, 32.8800),
            (35.4000, 32.9000),
            (35.4983, 32.9257),
        ],
        audio: (190, 175),
        incident: ("geofence_exit", 130),
    },
];

/// Highlight table: id, truck id, type, start and optional end in seconds
/// before the anchor.
const HIGHLIGHTS: [(&str, &str, &str, i64, Option<i64>); 10] = [
    ("event-1", "1", "speeding", 9_000, None),
    ("event-2", "2", "harsh_braking", 5_400, None),
    ("event-3", "3", "speeding", 6_120, None),
    ("event-4", "4", "harsh_acceleration", 6_480, None),
    ("event-5", "5", "geofence_exit", 7_920, None),
    ("event-6", "1", "audio_alert", 10_800, None),
    ("event-7", "2", "audio_alert", 7_920, Some(6_840)),
    ("event-8", "3", "audio_alert", 12_600, Some(11_700)),
    ("event-9", "4", "audio_alert", 9_000, Some(8_388)),
    ("event-10", "5", "audio_alert", 11_520, Some(10_440)),
];

fn route(entity_id: &str) -> Option<&'static Route> {
    ROUTES.iter().find(|r| r.id == entity_id)
}

/// `anchor` shifted back by `delta`, saturating at the anchor.
fn before(anchor: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    anchor.checked_sub_signed(delta).unwrap_or(anchor)
}

/// Mock backend serving the five-truck scenario.
///
/// The entity set can grow at runtime through
/// [`insert_random_entity`](Self::insert_random_entity); routes and details
/// exist only for the five seeded trucks.
#[derive(Debug)]
pub struct MockDataSource {
    anchor: DateTime<Utc>,
    entities: RwLock<Vec<Entity>>,
}

impl MockDataSource {
    /// Create a mock whose routes end relative to `anchor`.
    pub fn new(anchor: DateTime<Utc>) -> Self {
        let entities = ROUTES
            .iter()
            .filter_map(|r| {
                let (lon, lat) = *r.waypoints.last()?;
                Some(Entity {
                    entity_type: TRUCK.to_owned(),
                    id: r.id.to_owned(),
                    location: LonLat(lon, lat),
                })
            })
            .collect();
        Self {
            anchor,
            entities: RwLock::new(entities),
        }
    }

    /// Create a mock anchored at the current time.
    pub fn anchored_now() -> Self {
        Self::new(Utc::now())
    }

    /// The anchor time of every route.
    pub const fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    /// Add a truck at a random position near [`RANDOM_ENTITY_CENTER`] and
    /// return it. Its id is one past the highest numeric id in use.
    pub async fn insert_random_entity(&self) -> Entity {
        let mut entities = self.entities.write().await;
        let next_id = entities
            .iter()
            .filter_map(|e| e.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            .saturating_add(1);

        let mut rng = rand::rng();
        let location = LonLat(
            RANDOM_ENTITY_CENTER.lon() + rng.random_range(-RANDOM_SPREAD_DEG..RANDOM_SPREAD_DEG),
            RANDOM_ENTITY_CENTER.lat() + rng.random_range(-RANDOM_SPREAD_DEG..RANDOM_SPREAD_DEG),
        );
        let entity = Entity {
            entity_type: TRUCK.to_owned(),
            id: next_id.to_string(),
            location,
        };
        entities.push(entity.clone());
        drop(entities);

        tracing::info!(id = %entity.id, lon = location.lon(), lat = location.lat(), "random entity added");
        entity
    }

    fn route_events(&self, route: &Route) -> Vec<EntityEvent> {
        let prefix = format!("t{}", route.id);
        let mut events: Vec<EntityEvent> = route
            .waypoints
            .iter()
            .zip(ROUTE_MINUTES)
            .zip(1_u32..)
            .map(|(((lon, lat), minutes), n)| EntityEvent {
                id: format!("{prefix}-g{n}").into(),
                group: "location".to_owned(),
                start: before(self.anchor, TimeDelta::minutes(minutes)),
                end: None,
                payload: EventPayload::Point {
                    coords: LonLat(*lon, *lat),
                },
            })
            .collect();

        let (audio_start, audio_end) = route.audio;
        events.push(EntityEvent {
            id: format!("{prefix}-a1").into(),
            group: "audio".to_owned(),
            start: before(self.anchor, TimeDelta::minutes(audio_start)),
            end: Some(before(self.anchor, TimeDelta::minutes(audio_end))),
            payload: EventPayload::Audio,
        });

        let (what, minutes) = route.incident;
        events.push(EntityEvent {
            id: format!("{prefix}-e1").into(),
            group: "event".to_owned(),
            start: before(self.anchor, TimeDelta::minutes(minutes)),
            end: None,
            payload: EventPayload::Event {
                what: what.to_owned(),
            },
        });
        events
    }

    fn details_of(&self, route: &Route) -> EntityDetails {
        let first_seen = before(self.anchor, TimeDelta::minutes(FIRST_SEEN_MINUTES));
        let last_seen = before(self.anchor, TimeDelta::minutes(LAST_SEEN_MINUTES));
        EntityDetails {
            entity_id: format!("{TRUCK}-{}", route.id),
            op_id: format!("op-10{}", route.id),
            is_drive: route.id.parse::<u32>().is_ok_and(|n| n % 2 == 1),
            description: format!("Delivery truck {}", route.id),
            number: format!("12-345-6{}", route.id),
            id_ei: format!("EI-000{}", route.id),
            id_si: format!("SI-000{}", route.id),
            mac: format!("00:1A:2B:3C:4D:0{}", route.id),
            app_id: "fleet-tracker".to_owned(),
            app_source: "gps".to_owned(),
            first_seen,
            last_seen,
            first_id: format!("T{}", route.id),
            final_description: format!("Arrived at {}", route.destination),
        }
    }
}

impl DataSource for MockDataSource {
    async fn entities(&self, parameters: &Parameters) -> Result<Vec<Entity>, DataError> {
        let filter = parameters
            .selected_wkt
            .as_deref()
            .map(wkt::parse_polygon)
            .transpose()?;
        let entities = self.entities.read().await;
        Ok(entities
            .iter()
            .filter(|e| filter.as_ref().is_none_or(|p| p.contains(e.location)))
            .cloned()
            .collect())
    }

    async fn events_of_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<EntityEvent>, DataError> {
        if entity_type != TRUCK {
            return Ok(Vec::new());
        }
        let now = Utc::now();
        Ok(route(entity_id)
            .map(|r| self.route_events(r))
            .unwrap_or_default()
            .into_iter()
            .filter(|e| range.contains(e.start, now))
            .collect())
    }

    async fn highlights(&self, range: &TimeRange) -> Result<Vec<Highlight>, DataError> {
        let now = Utc::now();
        let all = HIGHLIGHTS
            .iter()
            .map(|&(id, truck, kind, start, end)| {
                Ok::<_, DataError>(Highlight {
                    id: id.into(),
                    entity_ids: vec![EntityKey::new(TRUCK, truck)?],
                    kind: kind.to_owned(),
                    timestamp: before(self.anchor, TimeDelta::seconds(start)),
                    timestamp_end: end.map(|s| before(self.anchor, TimeDelta::seconds(s))),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(all
            .into_iter()
            .filter(|h| range.contains(h.timestamp, now))
            .collect())
    }

    async fn entity_details(&self, key: &EntityKey) -> Result<Option<EntityDetails>, DataError> {
        if key.entity_type() != TRUCK {
            return Ok(None);
        }
        Ok(route(key.id()).map(|r| self.details_of(r)))
    }

    async fn group_search(&self, query: &str) -> Result<GroupSearchResults, DataError> {
        let needle = query.trim().to_lowercase();
        let options: Vec<GroupOption> = (1..=3)
            .map(|n| GroupOption {
                value: n.to_string(),
                label: format!("Group {n}"),
            })
            .filter(|o| needle.is_empty() || o.label.to_lowercase().contains(&needle))
            .collect();

        let mut results = GroupSearchResults::new();
        if !options.is_empty() {
            results.insert(GROUP_HEADING.to_owned(), options);
        }
        Ok(results)
    }

    async fn add_random_entity(&self) -> Result<Entity, DataError> {
        Ok(self.insert_random_entity().await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn mock() -> MockDataSource {
        MockDataSource::new(anchor())
    }

    fn everything() -> TimeRange {
        TimeRange::open(anchor() - TimeDelta::days(1))
    }

    #[tokio::test]
    async fn five_trucks_at_their_final_positions() {
        let entities = mock()
            .entities(&Parameters::with_range(everything()))
            .await
            .unwrap();
        assert_eq!(entities.len(), 5);
        assert_eq!(entities[0].location, LonLat(34.7818, 32.0853));
        assert_eq!(entities[4].location, LonLat(35.4983, 32.9257));
    }

    #[tokio::test]
    async fn spatial_filter_narrows_entities() {
        let mut params = Parameters::with_range(everything());
        // Box around Jerusalem only.
        params.selected_wkt =
            Some("POLYGON((35.1 31.7, 35.3 31.7, 35.3 31.9, 35.1 31.9, 35.1 31.7))".to_owned());
        let entities = mock().entities(&params).await.unwrap();
        let ids: Vec<_> = entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[tokio::test]
    async fn invalid_spatial_filter_is_an_error() {
        let mut params = Parameters::with_range(everything());
        params.selected_wkt = Some("POINT(35 31)".to_owned());
        let err = mock().entities(&params).await.unwrap_err();
        assert!(matches!(err, DataError::SpatialFilter(_)));
    }

    #[tokio::test]
    async fn route_has_six_waypoints_audio_and_incident() {
        let events = mock()
            .events_of_entity(TRUCK, "1", &everything())
            .await
            .unwrap();
        assert_eq!(events.len(), 8);
        assert_eq!(events.iter().filter(|e| e.is_geographic()).count(), 6);
        assert_eq!(events[0].start, anchor() - TimeDelta::minutes(240));
        assert_eq!(events[5].coords(), Some(LonLat(34.7818, 32.0853)));
        assert_eq!(events[6].duration(), Some(TimeDelta::minutes(10)));
    }

    #[tokio::test]
    async fn events_outside_range_are_dropped() {
        let range = TimeRange::new(
            anchor() - TimeDelta::minutes(130),
            Some(anchor() - TimeDelta::minutes(30)),
        )
        .unwrap();
        let events = mock().events_of_entity(TRUCK, "2", &range).await.unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["t2-g4", "t2-g5", "t2-g6", "t2-a1", "t2-e1"]);
    }

    #[tokio::test]
    async fn unknown_entity_has_no_events() {
        let source = mock();
        assert!(
            source
                .events_of_entity(TRUCK, "9", &everything())
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            source
                .events_of_entity("drone", "1", &everything())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn highlights_filtered_by_window() {
        let source = mock();
        assert_eq!(source.highlights(&everything()).await.unwrap().len(), 10);

        let last_two_hours = TimeRange::open(anchor() - TimeDelta::hours(2));
        let recent = source.highlights(&last_two_hours).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["event-2", "event-3", "event-4"]);
    }

    #[tokio::test]
    async fn details_only_for_known_trucks() {
        let source = mock();
        let details = source
            .entity_details(&EntityKey::new(TRUCK, "3").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.entity_id, "truck-3");
        assert_eq!(details.final_description, "Arrived at Haifa");
        assert!(details.is_drive);
        assert_eq!(details.first_seen, anchor() - TimeDelta::minutes(240));
        assert_eq!(details.last_seen, anchor() - TimeDelta::minutes(40));

        let events = source
            .events_of_entity(TRUCK, "3", &everything())
            .await
            .unwrap();
        let starts: Vec<_> = events
            .iter()
            .filter(|e| e.group == "location")
            .map(|e| e.start)
            .collect();
        assert_eq!(starts.len(), 6);
        assert_eq!(starts.iter().min(), Some(&details.first_seen));
        assert_eq!(starts.iter().max(), Some(&details.last_seen));
        assert!(
            source
                .entity_details(&EntityKey::new(TRUCK, "42").unwrap())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn group_search_filters_labels() {
        let source = mock();
        assert_eq!(source.group_search("").await.unwrap()[GROUP_HEADING].len(), 3);
        let one = source.group_search("group 2").await.unwrap();
        assert_eq!(one[GROUP_HEADING][0].value, "2");
        assert!(source.group_search("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn random_entity_lands_near_center() {
        let source = mock();
        let added = source.insert_random_entity().await;
        assert_eq!(added.id, "6");
        assert!((added.location.lon() - RANDOM_ENTITY_CENTER.lon()).abs() <= RANDOM_SPREAD_DEG);
        assert!((added.location.lat() - RANDOM_ENTITY_CENTER.lat()).abs() <= RANDOM_SPREAD_DEG);

        let entities = source
            .entities(&Parameters::with_range(everything()))
            .await
            .unwrap();
        assert_eq!(entities.len(), 6);
        assert_eq!(source.add_random_entity().await.unwrap().id, "7");
    }
}
