//! History projector.
//!
//! Turns one entity's events into its trail overlay: geographic events
//! inside the query window, ordered by start, styled around the scrub
//! instant. Every projection replaces the previous overlay outright.

use chrono::{DateTime, Utc};
use waypoint_data::{DataError, DataSource, Fetched, QueryClient, Ticket};
use waypoint_map::{MapError, Trail, Waypoint, build_trail};
use waypoint_types::{EntityEvent, EntityKey, TimeRange};

use crate::config::HistoryConfig;

/// Errors that can occur while projecting an entity's history.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// A `loc` event whose WKT is not a point.
    #[error("malformed geometry on event {event_id}: {source}")]
    MalformedGeometry {
        /// Offending event.
        event_id: String,
        /// Underlying parse failure.
        source: MapError,
    },

    /// The event fetch failed.
    #[error("history fetch failed: {0}")]
    Data(#[from] DataError),
}

/// Builds trail overlays from entity events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryProjector {
    min_opacity: f64,
}

impl HistoryProjector {
    /// A projector fading distant waypoints down to `min_opacity`.
    pub const fn new(min_opacity: f64) -> Self {
        Self { min_opacity }
    }

    /// A projector using the configured opacity floor.
    pub const fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.min_opacity)
    }

    /// Opacity floor.
    pub const fn min_opacity(&self) -> f64 {
        self.min_opacity
    }

    /// Project `events` of `key` for `range`, scrubbed to `scrub` (or `now`
    /// when unset). Events outside the range and non-geographic events are
    /// ignored; zero remaining events give an empty trail.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::MalformedGeometry`] for a `loc` event whose
    /// geometry is not a point.
    pub fn project(
        &self,
        key: &EntityKey,
        events: &[EntityEvent],
        range: &TimeRange,
        scrub: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Trail, HistoryError> {
        let mut waypoints = Vec::with_capacity(events.len());
        for event in events
            .iter()
            .filter(|e| e.is_geographic() && range.contains(e.start, now))
        {
            let waypoint =
                Waypoint::from_event(event).map_err(|source| HistoryError::MalformedGeometry {
                    event_id: event.id.to_string(),
                    source,
                })?;
            waypoints.extend(waypoint);
        }
        Ok(build_trail(
            key,
            waypoints,
            scrub.unwrap_or(now),
            self.min_opacity,
        ))
    }

    /// Fetch the events of `key` through `client` and project them.
    ///
    /// `ticket` is a [`QuerySlot::History`](waypoint_data::QuerySlot::History)
    /// ticket taken together with the inputs. If a newer one was issued
    /// while this fetch was in flight, the result is [`Fetched::Superseded`].
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Data`] if the fetch fails and
    /// [`HistoryError::MalformedGeometry`] as for [`project`](Self::project).
    pub async fn recompute<S: DataSource>(
        &self,
        client: &QueryClient<S>,
        ticket: Ticket,
        key: &EntityKey,
        range: &TimeRange,
        scrub: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Fetched<Trail>, HistoryError> {
        let fetched = client
            .events_of_entity(ticket, key.entity_type(), key.id(), range)
            .await?;
        match fetched {
            Fetched::Current(events) => {
                let trail = self.project(key, &events, range, scrub, now)?;
                tracing::debug!(
                    entity = %key,
                    points = trail.points.len(),
                    previous = ?trail.previous,
                    next = ?trail.next,
                    "history projected"
                );
                Ok(Fetched::Current(trail))
            }
            Fetched::Superseded => Ok(Fetched::Superseded),
        }
    }
}

impl Default for HistoryProjector {
    fn default() -> Self {
        Self::new(waypoint_map::trail::DEFAULT_MIN_OPACITY)
    }
}
