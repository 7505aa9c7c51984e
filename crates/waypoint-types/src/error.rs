//! Validation errors raised while building or decoding data-model values.

/// Errors produced when a value violates a data-model invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// An entity key was not of the form `"{type}-{id}"`.
    #[error("invalid entity key: {0:?}")]
    InvalidEntityKey(String),

    /// An interval ends before it starts.
    #[error("{what} ends before it starts")]
    EndBeforeStart {
        /// Which value was rejected (event id or `time range`).
        what: String,
    },

    /// A tagged event is missing the payload field its tag requires.
    #[error("event {event_id} of kind {kind} is missing field `{field}`")]
    MissingPayload {
        /// The offending event.
        event_id: String,
        /// The event kind tag.
        kind: String,
        /// The required field.
        field: &'static str,
    },
}
