//! The data-fetch contracts of the dashboard.
//!
//! A [`DataSource`] answers every query the dashboard issues: the entity set
//! for the active parameters, one entity's event history, the highlights of
//! a time window, an entity's descriptive record and the group search box.
//! Results are replaced wholesale on every call; implementations never merge
//! into earlier responses.

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use waypoint_types::{Entity, EntityDetails, EntityEvent, EntityKey, Highlight, Parameters, TimeRange};

use crate::error::DataError;

/// One option of the group search box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GroupOption {
    /// Option value submitted when picked.
    pub value: String,
    /// Display label.
    pub label: String,
}

/// Group search results keyed by category heading.
pub type GroupSearchResults = BTreeMap<String, Vec<GroupOption>>;

/// A backend able to answer the dashboard's queries.
///
/// Implementations must be shareable across tasks: the session, the HTTP
/// handlers and the query cache all hold the same instance.
pub trait DataSource: Send + Sync + 'static {
    /// Entities matching `parameters`. A spatial filter, when present,
    /// keeps only entities whose location lies inside the polygon.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::SpatialFilter`] if the filter is not a polygon.
    fn entities(
        &self,
        parameters: &Parameters,
    ) -> impl Future<Output = Result<Vec<Entity>, DataError>> + Send;

    /// Events of one entity whose start lies inside `range`. An unknown
    /// entity has no events.
    fn events_of_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        range: &TimeRange,
    ) -> impl Future<Output = Result<Vec<EntityEvent>, DataError>> + Send;

    /// Highlights starting inside `range`.
    fn highlights(
        &self,
        range: &TimeRange,
    ) -> impl Future<Output = Result<Vec<Highlight>, DataError>> + Send;

    /// The descriptive record of an entity, if the backend knows it.
    fn entity_details(
        &self,
        key: &EntityKey,
    ) -> impl Future<Output = Result<Option<EntityDetails>, DataError>> + Send;

    /// Group search results for `query`.
    fn group_search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<GroupSearchResults, DataError>> + Send;

    /// Add a randomly placed entity, for debugging the map.
    ///
    /// # Errors
    ///
    /// The default implementation returns [`DataError::Unsupported`].
    fn add_random_entity(&self) -> impl Future<Output = Result<Entity, DataError>> + Send {
        async { Err(DataError::Unsupported("add_random_entity")) }
    }
}
