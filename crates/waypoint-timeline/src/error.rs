//! Error types for the `waypoint-timeline` crate.

/// Errors raised by timeline operations.
///
/// Marker errors are expected during normal interaction (a redundant add or
/// remove); gesture handlers log them and carry on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    /// A marker with this id is already on the timeline.
    #[error("marker {0:?} already exists")]
    MarkerExists(String),

    /// No marker with this id is on the timeline.
    #[error("marker {0:?} does not exist")]
    MarkerMissing(String),

    /// A visible window must end after it starts.
    #[error("window end is not after its start")]
    EmptyWindow,
}
