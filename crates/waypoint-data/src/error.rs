//! Error types for the data layer.
//!
//! All fetch failures are reported through [`DataError`]. The dashboard
//! never retries: a failed fetch is logged by the caller and the previous
//! state stays in place.

use waypoint_map::MapError;
use waypoint_types::TypeError;

/// Errors that can occur while fetching dashboard data.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// The spatial filter on the query parameters is not a usable polygon.
    #[error("invalid spatial filter: {0}")]
    SpatialFilter(#[from] MapError),

    /// The backend returned a record that failed validation.
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] TypeError),

    /// The backend could not be reached or answered with a failure.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend does not offer this operation.
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),
}
