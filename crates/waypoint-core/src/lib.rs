//! Dashboard core for Waypoint.
//!
//! Holds the state both views render and everything that changes it:
//!
//! ```text
//!   Interaction ──► Dispatcher::reduce ──► DashboardState ──► Stores / snapshots
//!                        │                       ▲
//!                        ▼                       │
//!                     Effects ──► QueryClient ──► Loaded ──► Dispatcher::apply
//!                        │
//!                        └──► Debouncer ──► HistoryProjector
//! ```
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with environment overrides
//! - [`clock`] -- Wall clock abstraction
//! - [`state`] -- The immutable dashboard state
//! - [`store`] -- Watch-backed observable stores
//! - [`selection`] -- Map and timeline selection bindings
//! - [`history`] -- Trail projection of a focused entity
//! - [`debounce`] -- Cancellable debounced tasks
//! - [`dispatcher`] -- Typed interactions reduced into new states
//! - [`session`] -- Effects runner tying the above together

pub mod clock;
pub mod config;
pub mod debounce;
pub mod dispatcher;
pub mod history;
pub mod selection;
pub mod session;
pub mod state;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, DashboardConfig, LogFormat};
pub use debounce::Debouncer;
pub use dispatcher::{
    DispatchError, Dispatcher, Effect, Gesture, Interaction, Loaded, Transition,
};
pub use history::{HistoryError, HistoryProjector};
pub use selection::{sync_map_to_timeline, sync_timeline_to_map};
pub use session::Session;
pub use state::{DashboardState, FocusState, TimelineSelection};
pub use store::{Store, Stores};

#[cfg(test)]
mod tests {
    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        let _ = crate::state::DashboardState::export_all();
        let _ = crate::state::FocusState::export_all();
        let _ = crate::state::TimelineSelection::export_all();
        let _ = crate::dispatcher::Interaction::export_all();
        let _ = crate::dispatcher::Gesture::export_all();
    }
}
