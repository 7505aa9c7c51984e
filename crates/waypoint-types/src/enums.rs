//! Enumeration types shared by the map, timeline and data layers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Wire tag (`t`) of an entity event.
///
/// Events without a tag decode as [`EventKind::Untyped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// A location fix with explicit `coords`.
    Point,
    /// A location given as WKT geometry.
    Loc,
    /// An audio recording interval.
    Audio,
    /// A named incident (`what`), e.g. `speeding`.
    Event,
    /// A visual capture.
    Visual,
    /// A text record.
    Text,
    /// An event with no `t` tag.
    Untyped,
}

impl EventKind {
    /// Whether events of this kind carry a position.
    pub const fn is_geographic(self) -> bool {
        matches!(self, Self::Point | Self::Loc)
    }

    /// The wire name of the tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Loc => "loc",
            Self::Audio => "audio",
            Self::Event => "event",
            Self::Visual => "visual",
            Self::Text => "text",
            Self::Untyped => "untyped",
        }
    }
}

/// Section of the entity details panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum DetailsSectionKind {
    /// Operational and hardware identifiers.
    Identifiers,
    /// First/last seen timestamps.
    Visibility,
    /// Everything else.
    Misc,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_point_and_loc_are_geographic() {
        assert!(EventKind::Point.is_geographic());
        assert!(EventKind::Loc.is_geographic());
        assert!(!EventKind::Audio.is_geographic());
        assert!(!EventKind::Untyped.is_geographic());
    }

    #[test]
    fn kind_wire_names() {
        let json = serde_json::to_string(&EventKind::Visual).ok();
        assert_eq!(json.as_deref(), Some("\"visual\""));
    }
}
