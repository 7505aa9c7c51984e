//! The interaction dispatcher.
//!
//! Every user gesture arrives as a typed [`Interaction`]. The dispatcher
//! reduces it against the current [`DashboardState`] into a new state plus
//! the [`Effect`]s (fetches, history recomputes) the session must run.
//! Fetch results come back as [`Loaded`] values and are applied the same
//! way. The dispatcher owns the master timeline so marker drags and item
//! selection go through the same state machine as in the browser view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use waypoint_map::wkt::parse_polygon;
use waypoint_map::{
    BoxSelectMode, Extent, MapError, Trail, Viewport, box_select, from_lon_lat, resolve_click,
};
use waypoint_timeline::{
    PointerEvent, SCRUB_MARKER_ID, TimelineCore, TimelineError, TimelineEvent, TimelineEventKind,
    TimelineSubscription, TimelineWindow, entity_items, group_label_target,
};
use waypoint_types::{
    Entity, EntityDetails, EntityEvent, EntityKey, Highlight, LonLat, SelectionSet, TimeRange,
    TypeError,
};

use crate::config::DashboardConfig;
use crate::selection::{sync_map_to_timeline, sync_timeline_to_map};
use crate::state::DashboardState;

/// Errors that can occur while reducing an interaction.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A spatial filter, click position or camera was unusable.
    #[error("geometry error: {0}")]
    Geometry(#[from] MapError),

    /// A time range failed validation.
    #[error("invalid time range: {0}")]
    TimeRange(#[from] TypeError),

    /// The master timeline rejected the change.
    #[error("timeline error: {0}")]
    Timeline(#[from] TimelineError),
}

/// Pointer gestures forwarded to the master timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum Gesture {
    /// Single click.
    Click,
    /// Double click.
    DoubleClick,
    /// Button pressed.
    MouseDown,
    /// Pointer moved.
    MouseMove,
    /// Button released.
    MouseUp,
}

/// A user gesture on the map, the timeline or the controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum Interaction {
    /// Click on the map. With `toggle` (the modifier key) the hit entities
    /// are flipped in the current selection.
    MapClick {
        /// Clicked position.
        at: LonLat,
        /// Modifier held.
        #[serde(default)]
        toggle: bool,
    },
    /// Drag box on the map.
    MapBoxSelect {
        /// One corner.
        from: LonLat,
        /// The opposite corner.
        to: LonLat,
    },
    /// The user selected items on the master timeline.
    TimelineSelect {
        /// Selected item ids.
        item_ids: Vec<String>,
    },
    /// Click on a master timeline row label.
    TimelineGroupClick {
        /// Row id.
        group_id: String,
    },
    /// Raw pointer gesture on the master timeline.
    TimelinePointer {
        /// Gesture.
        gesture: Gesture,
        /// Resolved pointer position.
        pointer: PointerEvent,
    },
    /// Drill into one entity.
    FocusEntity {
        /// Entity to focus.
        #[ts(as = "String")]
        key: EntityKey,
    },
    /// Leave the focused entity.
    ClearFocus,
    /// Replace the query window.
    SetTimeRange {
        /// New window.
        range: TimeRange,
    },
    /// Replace the spatial filter with a drawn polygon.
    SetSpatialFilter {
        /// Polygon as WKT.
        wkt: String,
    },
    /// Drop the spatial filter.
    ClearSpatialFilter,
    /// Move the scrub marker.
    Scrub {
        /// Scrub instant.
        time: DateTime<Utc>,
    },
    /// Remove the scrub marker.
    ClearScrub,
    /// Move the map camera.
    SetView {
        /// View center.
        center: LonLat,
        /// Zoom level.
        zoom: f64,
    },
    /// Change the cluster distance.
    SetClusterDistance {
        /// Distance in pixels.
        distance_px: f64,
    },
    /// Add a random debug entity.
    AddRandomEntity,
    /// Drop cached responses and refetch.
    Refresh,
}

/// Work the session performs after a reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch entities for the current parameters.
    FetchEntities,
    /// Fetch highlights for the current window.
    FetchHighlights,
    /// Fetch events and details of one entity.
    FetchEntityData(EntityKey),
    /// Recompute the history overlay now.
    RecomputeHistory,
    /// Recompute the history overlay after the scrub debounce.
    ScheduleHistory,
    /// Drop cached responses tied to the time window.
    InvalidateWindow,
    /// Ask the backend for a random entity.
    AddRandomEntity,
}

/// A fetch result to fold into the state.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    /// Entity set for the current parameters.
    Entities(Vec<Entity>),
    /// Highlights for the current window.
    Highlights(Vec<Highlight>),
    /// Events of one entity.
    EntityEvents {
        /// Owning entity.
        key: EntityKey,
        /// Its events.
        events: Vec<EntityEvent>,
    },
    /// Details of one entity.
    Details {
        /// Owning entity.
        key: EntityKey,
        /// Its record, if known.
        details: Option<EntityDetails>,
    },
    /// Projected history overlay. `None` clears it.
    Trail {
        /// Owning entity.
        key: EntityKey,
        /// The overlay.
        trail: Option<Box<Trail>>,
    },
}

/// The outcome of reducing one interaction.
#[derive(Debug, Clone)]
pub struct Transition {
    /// The new state.
    pub state: DashboardState,
    /// Effects to run, in order.
    pub effects: Vec<Effect>,
}

/// Reduces interactions and fetch results into new dashboard states.
#[derive(Debug)]
pub struct Dispatcher {
    master: TimelineCore,
    scrub_events: TimelineSubscription,
    box_mode: BoxSelectMode,
    fly_to_max_zoom: f64,
}

impl Dispatcher {
    /// A dispatcher whose master timeline shows the configured default
    /// window ending at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Timeline`] if the default window is empty.
    pub fn new(config: &DashboardConfig, now: DateTime<Utc>) -> Result<Self, DispatchError> {
        let range = TimeRange::last_hours(now, config.parameters.default_window_hours);
        let master = TimelineCore::new(config.timeline, window_of(&range, now))?;
        let scrub_events = master.events().on(TimelineEventKind::MarkerChange);
        Ok(Self {
            master,
            scrub_events,
            box_mode: config.map.box_select,
            fly_to_max_zoom: config.map.fly_to_max_zoom,
        })
    }

    /// The master timeline.
    pub const fn master(&self) -> &TimelineCore {
        &self.master
    }

    /// Reduce `interaction` against `state`.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] when the interaction carries unusable
    /// input (a malformed polygon, an inverted time range, an out-of-range
    /// zoom). The state is left untouched in that case.
    pub fn reduce(
        &mut self,
        state: &DashboardState,
        interaction: Interaction,
        now: DateTime<Utc>,
    ) -> Result<Transition, DispatchError> {
        let mut next = state.clone();
        let mut effects = Vec::new();
        next.fly_to = None;

        match interaction {
            Interaction::MapClick { at, toggle } => {
                let clusters = next.clusters()?;
                let resolution = next.view.resolution()?;
                let click = resolve_click(
                    &next.selection,
                    &clusters,
                    from_lon_lat(at),
                    resolution,
                    toggle,
                );
                tracing::debug!(kind = ?click.kind, "map click");
                self.select_on_map(&mut next, click.selection);
            }
            Interaction::MapBoxSelect { from, to } => {
                let extent = Extent::from_corners(from_lon_lat(from), from_lon_lat(to));
                let selection =
                    box_select(&next.selection, &next.entity_points(), extent, self.box_mode);
                self.select_on_map(&mut next, selection);
            }
            Interaction::TimelineSelect { item_ids } => {
                self.master.user_select(item_ids);
                next.timeline.items = self.master.selection();
                sync_timeline_to_map(&mut next);
                let selection = next.selection.clone();
                self.select_on_map(&mut next, selection);
            }
            Interaction::TimelineGroupClick { group_id } => {
                match group_label_target(&next.master_groups, &group_id) {
                    Some(key) => self.focus(&mut next, key, &mut effects),
                    None => tracing::debug!(%group_id, "group click on unknown row"),
                }
            }
            Interaction::TimelinePointer { gesture, pointer } => match gesture {
                Gesture::Click => self.master.click(pointer),
                Gesture::DoubleClick => self.master.double_click(pointer),
                Gesture::MouseDown => self.master.mouse_down(pointer),
                Gesture::MouseMove => self.master.mouse_move(pointer),
                Gesture::MouseUp => self.master.mouse_up(),
            },
            Interaction::FocusEntity { key } => self.focus(&mut next, key, &mut effects),
            Interaction::ClearFocus => next.clear_focus(),
            Interaction::SetTimeRange { range } => {
                let range = TimeRange::new(range.start, range.end)?;
                if range != next.parameters.time_range {
                    self.master.set_window(window_of(&range, now))?;
                    next.parameters.time_range = range;
                    effects.extend([
                        Effect::InvalidateWindow,
                        Effect::FetchEntities,
                        Effect::FetchHighlights,
                    ]);
                    if let Some(key) = next.focus.focused_entity.clone() {
                        effects.extend([Effect::FetchEntityData(key), Effect::RecomputeHistory]);
                    }
                }
            }
            Interaction::SetSpatialFilter { wkt } => {
                parse_polygon(&wkt)?;
                if next.parameters.selected_wkt.as_deref() != Some(wkt.as_str()) {
                    next.parameters.selected_wkt = Some(wkt);
                    effects.push(Effect::FetchEntities);
                }
            }
            Interaction::ClearSpatialFilter => {
                if next.parameters.selected_wkt.take().is_some() {
                    effects.push(Effect::FetchEntities);
                }
            }
            Interaction::Scrub { time } => {
                let time = self.master.options().snap(time);
                self.master.set_or_add_marker(SCRUB_MARKER_ID, time);
            }
            Interaction::ClearScrub => {
                if let Err(err) = self.master.remove_marker(SCRUB_MARKER_ID) {
                    tracing::warn!(%err, "failed to clear scrub marker");
                }
            }
            Interaction::SetView { center, zoom } => {
                let view = Viewport::centered_on(center, zoom);
                view.resolution()?;
                next.view = view;
            }
            Interaction::SetClusterDistance { distance_px } => {
                next.cluster_distance_px = distance_px.max(0.0);
            }
            Interaction::AddRandomEntity => effects.push(Effect::AddRandomEntity),
            Interaction::Refresh => effects.extend([
                Effect::InvalidateWindow,
                Effect::FetchEntities,
                Effect::FetchHighlights,
            ]),
        }

        if self.drain_scrub(&mut next) && next.focus.focused_entity.is_some() {
            effects.push(Effect::ScheduleHistory);
        }
        next.refresh_markers()?;
        Ok(Transition {
            state: next,
            effects,
        })
    }

    /// Fold a fetch result into `state`. Results for an entity that is no
    /// longer focused are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Geometry`] if the markers cannot be
    /// recomputed at the current camera.
    pub fn apply(
        &mut self,
        state: &DashboardState,
        loaded: Loaded,
    ) -> Result<DashboardState, DispatchError> {
        let mut next = state.clone();
        match loaded {
            Loaded::Entities(entities) => {
                next.entities = entities;
                next.refresh_master();
                self.master.set_groups(next.master_groups.clone());
            }
            Loaded::Highlights(highlights) => {
                next.highlights = highlights;
                next.refresh_master();
                self.master.set_items(next.master_items.clone());
                sync_map_to_timeline(&mut next);
                self.master.set_selection(next.timeline.items.clone());
            }
            Loaded::EntityEvents { key, events } => {
                if next.focus.is_focused(&key) {
                    next.entity_items = entity_items(&events);
                } else {
                    tracing::debug!(entity = %key, "events for unfocused entity dropped");
                }
            }
            Loaded::Details { key, details } => {
                if next.focus.is_focused(&key) {
                    next.set_details(details);
                } else {
                    tracing::debug!(entity = %key, "details for unfocused entity dropped");
                }
            }
            Loaded::Trail { key, trail } => {
                if next.focus.is_focused(&key) {
                    next.trail = trail.map(|t| *t).filter(|t| !t.is_empty());
                } else {
                    tracing::debug!(entity = %key, "trail for unfocused entity dropped");
                }
            }
        }
        next.refresh_markers()?;
        Ok(next)
    }

    /// Replace the map selection and carry it over to the timeline. An
    /// empty selection also leaves the focused entity.
    fn select_on_map(&mut self, next: &mut DashboardState, selection: SelectionSet) {
        next.selection = selection;
        if sync_map_to_timeline(next) {
            self.master.set_selection(next.timeline.items.clone());
        }
        if next.selection.is_empty() && next.focus.focused_entity.is_some() {
            tracing::debug!("empty selection clears focus");
            next.clear_focus();
        }
    }

    fn focus(&self, next: &mut DashboardState, key: EntityKey, effects: &mut Vec<Effect>) {
        next.clear_focus();
        next.fly_to = next
            .entity(&key)
            .map(|e| Viewport::fit_point(from_lon_lat(e.location), self.fly_to_max_zoom));
        if next.fly_to.is_none() {
            tracing::debug!(entity = %key, "focused entity is not loaded");
        }
        tracing::info!(entity = %key, "entity focused");
        next.focus.focused_entity = Some(key.clone());
        effects.extend([Effect::FetchEntityData(key), Effect::RecomputeHistory]);
    }

    /// Fold pending scrub marker changes into the focus state. Returns
    /// whether the scrub instant changed.
    fn drain_scrub(&mut self, next: &mut DashboardState) -> bool {
        let before = next.focus.scrub_time;
        while let Some(event) = self.scrub_events.try_recv() {
            let TimelineEvent::MarkerChange {
                marker_id,
                time,
                removed,
            } = event
            else {
                continue;
            };
            if marker_id == SCRUB_MARKER_ID {
                next.focus.scrub_time = (!removed).then_some(time);
            }
        }
        next.focus.scrub_time != before
    }
}

fn window_of(range: &TimeRange, now: DateTime<Utc>) -> TimelineWindow {
    TimelineWindow {
        start: range.start,
        end: range.resolved_end(now),
    }
}
