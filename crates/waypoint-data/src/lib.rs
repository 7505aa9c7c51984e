//! Data layer for the Waypoint dashboard.
//!
//! The dashboard reads everything it shows through the [`DataSource`]
//! contracts. Queries go through a [`QueryClient`] that caches responses by
//! their parameters and fences responses that arrive after a newer request
//! of the same consumer.
//!
//! # Architecture
//!
//! ```text
//! Session / HTTP handlers
//!     |
//!     +-- begin(slot) ------> Ticket (generation)
//!     |
//!     +-- QueryClient ------> cache hit, or DataSource fetch
//!         |
//!         +-- Current(T)      latest request of the slot, apply it
//!         +-- Superseded      a newer request started, drop it
//! ```
//!
//! # Modules
//!
//! - [`source`] -- The `DataSource` trait and group search types
//! - [`mock`] -- Five-truck mock backend
//! - [`cache`] -- Query keys, the caching client and request fencing
//! - [`error`] -- Shared error types

pub mod cache;
pub mod error;
pub mod mock;
pub mod source;

pub use cache::{DEFAULT_OPEN_RANGE_TTL, Fetched, QueryClient, QueryKey, QuerySlot, Ticket};
pub use error::DataError;
pub use mock::MockDataSource;
pub use source::{DataSource, GroupOption, GroupSearchResults};

#[cfg(test)]
mod tests {
    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        let _ = crate::source::GroupOption::export_all();
    }
}
