//! Typed event bus for timeline interactions.
//!
//! Every gesture the timeline handles and every marker change is published
//! on a bounded broadcast channel. Subscribers can take every event or
//! filter to one [`TimelineEventKind`]. A subscriber that falls behind by
//! more than [`BUS_CAPACITY`] events skips ahead to the newest one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use ts_rs::TS;

/// Capacity of the timeline event channel.
pub const BUS_CAPACITY: usize = 256;

/// Which part of the timeline a pointer event landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum HitArea {
    /// The time axis.
    Axis,
    /// A custom-time marker.
    CustomTime,
    /// A group (row) label.
    GroupLabel,
    /// An item.
    Item,
    /// Empty background.
    Background,
}

/// A pointer event as resolved by the timeline view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PointerEvent {
    /// What was hit.
    pub what: HitArea,
    /// Time under the pointer.
    pub time: DateTime<Utc>,
    /// Group under the pointer, if any.
    #[serde(default)]
    pub group: Option<String>,
    /// Item under the pointer, if any.
    #[serde(default)]
    pub item: Option<String>,
    /// Shift key held.
    #[serde(default)]
    pub shift: bool,
    /// Ctrl key held.
    #[serde(default)]
    pub ctrl: bool,
}

impl PointerEvent {
    /// A bare pointer event with no modifiers.
    pub const fn at(what: HitArea, time: DateTime<Utc>) -> Self {
        Self {
            what,
            time,
            group: None,
            item: None,
            shift: false,
            ctrl: false,
        }
    }
}

/// Events published by a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum TimelineEvent {
    /// The user changed the item selection.
    Select {
        /// Selected item ids.
        item_ids: Vec<String>,
    },
    /// Single click.
    Click {
        /// Where the click landed.
        pointer: PointerEvent,
    },
    /// Double click.
    DoubleClick {
        /// Where the click landed.
        pointer: PointerEvent,
    },
    /// A marker was added, moved or removed.
    MarkerChange {
        /// Marker id.
        marker_id: String,
        /// Marker time (last time when removed).
        time: DateTime<Utc>,
        /// Whether the marker was removed.
        removed: bool,
    },
    /// Mouse button pressed.
    MouseDown {
        /// Where the press landed.
        pointer: PointerEvent,
    },
    /// Mouse button released.
    MouseUp,
    /// Pointer moved.
    MouseMove {
        /// Where the pointer is.
        pointer: PointerEvent,
    },
    /// The visible window changed.
    WindowChange {
        /// New window start.
        start: DateTime<Utc>,
        /// New window end.
        end: DateTime<Utc>,
    },
}

/// Discriminant of [`TimelineEvent`], used to filter subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimelineEventKind {
    /// [`TimelineEvent::Select`].
    Select,
    /// [`TimelineEvent::Click`].
    Click,
    /// [`TimelineEvent::DoubleClick`].
    DoubleClick,
    /// [`TimelineEvent::MarkerChange`].
    MarkerChange,
    /// [`TimelineEvent::MouseDown`].
    MouseDown,
    /// [`TimelineEvent::MouseUp`].
    MouseUp,
    /// [`TimelineEvent::MouseMove`].
    MouseMove,
    /// [`TimelineEvent::WindowChange`].
    WindowChange,
}

impl TimelineEvent {
    /// The discriminant of this event.
    pub const fn kind(&self) -> TimelineEventKind {
        match self {
            Self::Select { .. } => TimelineEventKind::Select,
            Self::Click { .. } => TimelineEventKind::Click,
            Self::DoubleClick { .. } => TimelineEventKind::DoubleClick,
            Self::MarkerChange { .. } => TimelineEventKind::MarkerChange,
            Self::MouseDown { .. } => TimelineEventKind::MouseDown,
            Self::MouseUp => TimelineEventKind::MouseUp,
            Self::MouseMove { .. } => TimelineEventKind::MouseMove,
            Self::WindowChange { .. } => TimelineEventKind::WindowChange,
        }
    }
}

/// Broadcast bus carrying [`TimelineEvent`]s.
#[derive(Debug, Clone)]
pub struct TimelineEventBus {
    tx: broadcast::Sender<TimelineEvent>,
}

impl Default for TimelineEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineEventBus {
    /// Create a bus with [`BUS_CAPACITY`] slots.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Publish an event. Events emitted with no subscriber are dropped.
    pub fn emit(&self, event: TimelineEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("timeline event dropped, no subscribers");
        }
    }

    /// Subscribe to every event.
    pub fn subscribe(&self) -> TimelineSubscription {
        TimelineSubscription {
            rx: self.tx.subscribe(),
            filter: None,
        }
    }

    /// Subscribe to events of one kind.
    pub fn on(&self, kind: TimelineEventKind) -> TimelineSubscription {
        TimelineSubscription {
            rx: self.tx.subscribe(),
            filter: Some(kind),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A receiving handle on a [`TimelineEventBus`].
#[derive(Debug)]
pub struct TimelineSubscription {
    rx: broadcast::Receiver<TimelineEvent>,
    filter: Option<TimelineEventKind>,
}

impl TimelineSubscription {
    fn accepts(&self, event: &TimelineEvent) -> bool {
        self.filter.is_none_or(|kind| event.kind() == kind)
    }

    /// Wait for the next matching event. Returns `None` once the bus is
    /// dropped.
    pub async fn recv(&mut self) -> Option<TimelineEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.accepts(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "timeline subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next matching event if one is already queued.
    pub fn try_recv(&mut self) -> Option<TimelineEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(event),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "timeline subscriber lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn marker_event() -> TimelineEvent {
        TimelineEvent::MarkerChange {
            marker_id: "marker".to_owned(),
            time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            removed: false,
        }
    }

    #[test]
    fn filtered_subscription_skips_other_kinds() {
        let bus = TimelineEventBus::new();
        let mut markers = bus.on(TimelineEventKind::MarkerChange);
        let mut all = bus.subscribe();

        bus.emit(TimelineEvent::MouseUp);
        bus.emit(marker_event());

        assert_eq!(markers.try_recv(), Some(marker_event()));
        assert_eq!(markers.try_recv(), None);
        assert_eq!(all.try_recv(), Some(TimelineEvent::MouseUp));
        assert_eq!(all.try_recv(), Some(marker_event()));
    }

    #[test]
    fn emit_without_subscribers_is_harmless() {
        let bus = TimelineEventBus::new();
        bus.emit(TimelineEvent::MouseUp);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn recv_ends_when_bus_dropped() {
        let bus = TimelineEventBus::new();
        let mut sub = bus.subscribe();
        bus.emit(TimelineEvent::MouseUp);
        drop(bus);
        assert_eq!(sub.recv().await, Some(TimelineEvent::MouseUp));
        assert_eq!(sub.recv().await, None);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(marker_event()).unwrap();
        assert_eq!(json["type"], "markerChange");
        assert_eq!(json["marker_id"], "marker");
    }
}
