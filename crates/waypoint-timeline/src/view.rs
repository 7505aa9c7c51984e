//! Timeline state machine: items, groups, selection, window and markers.
//!
//! [`TimelineCore`] owns what one timeline view shows and interprets raw
//! pointer gestures. Marker scrubbing works as follows:
//!
//! - mouse-down on the axis or on a custom-time marker, without shift or
//!   ctrl, starts a drag, disables panning and places the scrub marker;
//! - mouse-move while dragging moves the marker;
//! - mouse-up ends the drag and re-enables panning;
//! - double click on a custom-time marker removes it.
//!
//! Marker positions are snapped per [`TimelineOptions`]. Every marker
//! change is published on the event bus.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::TimelineError;
use crate::event_bus::{HitArea, PointerEvent, TimelineEvent, TimelineEventBus};
use crate::options::TimelineOptions;

/// Id of the marker placed by scrubbing.
pub const SCRUB_MARKER_ID: &str = "marker";

/// An item on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimelineItem {
    /// Item id, unique within the timeline.
    pub id: String,
    /// Owning group id.
    pub group: String,
    /// Start time.
    pub start: DateTime<Utc>,
    /// End time for range items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Short text shown on the item (duration, incident name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A row of the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimelineGroup {
    /// Group id.
    pub id: String,
    /// Row label.
    pub label: String,
    /// Sort key; lower rows first.
    pub order: i64,
}

/// A custom-time marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimelineMarker {
    /// Marker id.
    pub id: String,
    /// Marker time.
    pub time: DateTime<Utc>,
}

/// The visible time span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimelineWindow {
    /// Left edge.
    pub start: DateTime<Utc>,
    /// Right edge.
    pub end: DateTime<Utc>,
}

/// State of one timeline view.
#[derive(Debug)]
pub struct TimelineCore {
    options: TimelineOptions,
    items: BTreeMap<String, TimelineItem>,
    groups: Vec<TimelineGroup>,
    selection: BTreeSet<String>,
    markers: BTreeMap<String, TimelineMarker>,
    window: TimelineWindow,
    dragging: bool,
    moveable: bool,
    bus: TimelineEventBus,
}

impl TimelineCore {
    /// Create an empty timeline showing `window`, clamped to the zoom
    /// bounds of `options`.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::EmptyWindow`] if `window` does not end after
    /// it starts.
    pub fn new(options: TimelineOptions, window: TimelineWindow) -> Result<Self, TimelineError> {
        let window = constrain(window, &options)?;
        Ok(Self {
            options,
            items: BTreeMap::new(),
            groups: Vec::new(),
            selection: BTreeSet::new(),
            markers: BTreeMap::new(),
            window,
            dragging: false,
            moveable: true,
            bus: TimelineEventBus::new(),
        })
    }

    /// The event bus of this timeline.
    pub const fn events(&self) -> &TimelineEventBus {
        &self.bus
    }

    /// Current options.
    pub const fn options(&self) -> &TimelineOptions {
        &self.options
    }

    /// Replace the options.
    pub const fn set_options(&mut self, options: TimelineOptions) {
        self.options = options;
    }

    // -------------------------------------------------------------------
    // Items and groups
    // -------------------------------------------------------------------

    /// Replace every item. Selected ids that no longer exist are dropped.
    pub fn set_items(&mut self, items: impl IntoIterator<Item = TimelineItem>) {
        self.items = items.into_iter().map(|i| (i.id.clone(), i)).collect();
        let items = &self.items;
        self.selection.retain(|id| items.contains_key(id));
    }

    /// Items in id order.
    pub fn items(&self) -> impl Iterator<Item = &TimelineItem> {
        self.items.values()
    }

    /// Look up an item.
    pub fn item(&self, id: &str) -> Option<&TimelineItem> {
        self.items.get(id)
    }

    /// Replace every group, kept sorted by `order`.
    pub fn set_groups(&mut self, mut groups: Vec<TimelineGroup>) {
        groups.sort_by_key(|g| g.order);
        self.groups = groups;
    }

    /// Groups in display order.
    pub fn groups(&self) -> &[TimelineGroup] {
        &self.groups
    }

    // -------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------

    /// Programmatically set the selected items. Unknown ids are ignored.
    /// Publishes nothing.
    pub fn set_selection<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection = ids
            .into_iter()
            .map(Into::into)
            .filter(|id| self.items.contains_key(id))
            .collect();
    }

    /// Selected item ids in ascending order.
    pub fn selection(&self) -> Vec<String> {
        self.selection.iter().cloned().collect()
    }

    /// The user selected `ids` in the view.
    pub fn user_select<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_selection(ids);
        self.bus.emit(TimelineEvent::Select {
            item_ids: self.selection(),
        });
    }

    // -------------------------------------------------------------------
    // Window
    // -------------------------------------------------------------------

    /// The visible window.
    pub const fn window(&self) -> TimelineWindow {
        self.window
    }

    /// Show `window`, clamped to the zoom bounds around its center.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::EmptyWindow`] if `window` does not end after
    /// it starts.
    pub fn set_window(&mut self, window: TimelineWindow) -> Result<(), TimelineError> {
        self.window = constrain(window, &self.options)?;
        self.bus.emit(TimelineEvent::WindowChange {
            start: self.window.start,
            end: self.window.end,
        });
        Ok(())
    }

    /// Whether panning is enabled.
    pub const fn is_moveable(&self) -> bool {
        self.moveable
    }

    /// Whether a marker drag is in progress.
    pub const fn is_dragging(&self) -> bool {
        self.dragging
    }

    // -------------------------------------------------------------------
    // Markers
    // -------------------------------------------------------------------

    /// Add a new marker.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::MarkerExists`] if `id` is already present.
    pub fn add_marker(&mut self, id: &str, time: DateTime<Utc>) -> Result<(), TimelineError> {
        if self.markers.contains_key(id) {
            return Err(TimelineError::MarkerExists(id.to_owned()));
        }
        self.put_marker(id, time);
        Ok(())
    }

    /// Move an existing marker.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::MarkerMissing`] if `id` is absent.
    pub fn set_marker(&mut self, id: &str, time: DateTime<Utc>) -> Result<(), TimelineError> {
        if !self.markers.contains_key(id) {
            return Err(TimelineError::MarkerMissing(id.to_owned()));
        }
        self.put_marker(id, time);
        Ok(())
    }

    /// Move the marker if present, otherwise add it.
    pub fn set_or_add_marker(&mut self, id: &str, time: DateTime<Utc>) {
        self.put_marker(id, time);
    }

    /// Remove a marker.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::MarkerMissing`] if `id` is absent.
    pub fn remove_marker(&mut self, id: &str) -> Result<(), TimelineError> {
        let marker = self
            .markers
            .remove(id)
            .ok_or_else(|| TimelineError::MarkerMissing(id.to_owned()))?;
        self.bus.emit(TimelineEvent::MarkerChange {
            marker_id: marker.id,
            time: marker.time,
            removed: true,
        });
        Ok(())
    }

    /// Look up a marker.
    pub fn marker(&self, id: &str) -> Option<&TimelineMarker> {
        self.markers.get(id)
    }

    /// Every marker in id order.
    pub fn markers(&self) -> Vec<TimelineMarker> {
        self.markers.values().cloned().collect()
    }

    fn put_marker(&mut self, id: &str, time: DateTime<Utc>) {
        self.markers.insert(
            id.to_owned(),
            TimelineMarker {
                id: id.to_owned(),
                time,
            },
        );
        self.bus.emit(TimelineEvent::MarkerChange {
            marker_id: id.to_owned(),
            time,
            removed: false,
        });
    }

    // -------------------------------------------------------------------
    // Gestures
    // -------------------------------------------------------------------

    /// Single click.
    pub fn click(&self, pointer: PointerEvent) {
        self.bus.emit(TimelineEvent::Click { pointer });
    }

    /// Double click. Removes the scrub marker when it lands on one.
    pub fn double_click(&mut self, pointer: PointerEvent) {
        if pointer.what == HitArea::CustomTime {
            if let Err(err) = self.remove_marker(SCRUB_MARKER_ID) {
                tracing::warn!(%err, "failed to remove marker");
            }
        }
        self.bus.emit(TimelineEvent::DoubleClick { pointer });
    }

    /// Mouse button pressed.
    pub fn mouse_down(&mut self, pointer: PointerEvent) {
        if starts_marker_drag(&pointer) {
            self.dragging = true;
            self.moveable = false;
            let time = self.options.snap(pointer.time);
            self.set_or_add_marker(SCRUB_MARKER_ID, time);
        }
        self.bus.emit(TimelineEvent::MouseDown { pointer });
    }

    /// Pointer moved.
    pub fn mouse_move(&mut self, pointer: PointerEvent) {
        if self.dragging {
            let time = self.options.snap(pointer.time);
            if let Err(err) = self.set_marker(SCRUB_MARKER_ID, time) {
                tracing::warn!(%err, "failed to move marker");
            }
        }
        self.bus.emit(TimelineEvent::MouseMove { pointer });
    }

    /// Mouse button released.
    pub fn mouse_up(&mut self) {
        if self.dragging {
            self.dragging = false;
            self.moveable = true;
        }
        self.bus.emit(TimelineEvent::MouseUp);
    }
}

const fn starts_marker_drag(pointer: &PointerEvent) -> bool {
    matches!(pointer.what, HitArea::Axis | HitArea::CustomTime) && !pointer.shift && !pointer.ctrl
}

fn constrain(
    window: TimelineWindow,
    options: &TimelineOptions,
) -> Result<TimelineWindow, TimelineError> {
    let span = window.end.signed_duration_since(window.start);
    if span <= chrono::Duration::zero() {
        return Err(TimelineError::EmptyWindow);
    }
    let target = span.clamp(options.zoom_min(), options.zoom_max());
    if target == span {
        return Ok(window);
    }
    let half = |d: chrono::Duration| d.checked_div(2).unwrap_or(d);
    let center = window
        .start
        .checked_add_signed(half(span))
        .unwrap_or(window.start);
    let start = center.checked_sub_signed(half(target)).unwrap_or(center);
    Ok(TimelineWindow {
        start,
        end: start.checked_add_signed(target).unwrap_or(window.end),
    })
}
