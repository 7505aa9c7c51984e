//! Observable stores.
//!
//! A [`Store`] holds one value behind a `tokio::sync::watch` channel. Each
//! store has a single writer (the session publishing dispatcher output) and
//! any number of subscribers. Writes that would not change the value are
//! dropped without notifying anyone, which is what keeps the selection
//! bindings from re-triggering themselves.

use std::fmt::Debug;

use tokio::sync::watch;
use waypoint_types::{Parameters, SelectionSet};

use crate::state::{DashboardState, FocusState, TimelineSelection};

/// A single observable value.
#[derive(Debug)]
pub struct Store<T> {
    name: &'static str,
    tx: watch::Sender<T>,
}

impl<T> Store<T>
where
    T: Clone + PartialEq + Debug,
{
    /// Create a store holding `initial`.
    pub fn new(name: &'static str, initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { name, tx }
    }

    /// Store name, used in logs.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// A copy of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Replace the value. Returns `false` and notifies nobody when `value`
    /// equals the current one.
    pub fn set(&self, value: T) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
        if changed {
            tracing::debug!(store = self.name, "store updated");
        }
        changed
    }

    /// Modify the value in place. Subscribers are notified only if the
    /// value actually changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Watch the value. The receiver starts with the current value marked
    /// as seen.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

/// The four dashboard stores, injected wherever they are needed.
#[derive(Debug)]
pub struct Stores {
    /// Map selection (the entity store).
    pub selection: Store<SelectionSet>,
    /// Timeline selection slice.
    pub timeline: Store<TimelineSelection>,
    /// Query parameters.
    pub parameters: Store<Parameters>,
    /// Focus and scrub.
    pub focus: Store<FocusState>,
}

impl Stores {
    /// Stores seeded from `state`.
    pub fn new(state: &DashboardState) -> Self {
        Self {
            selection: Store::new("selection", state.selection.clone()),
            timeline: Store::new("timeline", state.timeline.clone()),
            parameters: Store::new("parameters", state.parameters.clone()),
            focus: Store::new("focus", state.focus.clone()),
        }
    }

    /// Write every slice of `state`. Returns how many stores changed.
    pub fn publish(&self, state: &DashboardState) -> usize {
        [
            self.selection.set(state.selection.clone()),
            self.timeline.set(state.timeline.clone()),
            self.parameters.set(state.parameters.clone()),
            self.focus.set(state.focus.clone()),
        ]
        .into_iter()
        .filter(|changed| *changed)
        .count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::config::DashboardConfig;

    #[test]
    fn equal_write_does_not_notify() {
        let store = Store::new("test", 1_u32);
        let mut rx = store.subscribe();
        assert!(!store.set(1));
        assert!(!rx.has_changed().unwrap());
        assert!(store.set(2));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 2);
    }

    #[test]
    fn update_modifies_in_place() {
        let store = Store::new("selection", SelectionSet::new());
        assert!(store.update(|s| {
            s.insert("truck-1".parse().unwrap());
        }));
        assert_eq!(store.get().len(), 1);
        assert!(!store.update(|_| {}));
    }

    #[tokio::test]
    async fn subscriber_sees_published_state() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut state = DashboardState::new(&DashboardConfig::default(), now);
        let stores = Stores::new(&state);
        let mut focus = stores.focus.subscribe();

        assert_eq!(stores.publish(&state), 0);

        state.focus.focused_entity = Some("truck-3".parse().unwrap());
        assert_eq!(stores.publish(&state), 1);
        focus.changed().await.unwrap();
        assert_eq!(
            focus.borrow().focused_entity.as_ref().map(ToString::to_string),
            Some("truck-3".to_owned())
        );
    }
}
