//! Error types for the `waypoint-map` crate.

/// Errors that can occur while parsing or projecting map geometry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    /// The WKT text could not be parsed.
    #[error("invalid WKT: {0}")]
    InvalidWkt(String),

    /// The WKT parsed but is not the geometry type the caller needs.
    #[error("expected {expected} geometry, found {found}")]
    UnexpectedGeometry {
        /// The required geometry type.
        expected: &'static str,
        /// The geometry type that was found.
        found: String,
    },

    /// A polygon ring has fewer than three distinct vertices.
    #[error("polygon ring has {0} vertices, need at least 3")]
    DegenerateRing(usize),

    /// A zoom level outside the supported range was requested.
    #[error("zoom level {0} is out of range")]
    ZoomOutOfRange(String),
}
