//! Identifier types for the dashboard data model.
//!
//! Entities are addressed by a composite [`EntityKey`] (`"{type}-{id}"`),
//! which is also the feature id used by the map and the group id used by the
//! master timeline. Events and highlights carry backend-assigned string ids.
//! Dashboard sessions get a UUID v7 identifier.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::TypeError;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

/// Generates a transparent newtype wrapper around a backend-assigned string id.
macro_rules! define_str_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Borrow the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

define_id! {
    /// Unique identifier for a connected dashboard session.
    SessionId
}

define_str_id! {
    /// Backend-assigned identifier of a single entity event.
    EventId
}

define_str_id! {
    /// Backend-assigned identifier of a cross-entity highlight.
    HighlightId
}

/// Composite identity of a tracked entity: `"{type}-{id}"`.
///
/// The string form is the map feature id of the entity and the master
/// timeline group id. Parsing splits on the first `-`, so ids may contain
/// dashes but types may not.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    entity_type: String,
    id: String,
}

impl EntityKey {
    /// Build a key from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InvalidEntityKey`] if either part is empty or the
    /// type contains a `-`.
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Result<Self, TypeError> {
        let entity_type = entity_type.into();
        let id = id.into();
        if entity_type.is_empty() || id.is_empty() || entity_type.contains('-') {
            return Err(TypeError::InvalidEntityKey(format!("{entity_type}-{id}")));
        }
        Ok(Self { entity_type, id })
    }

    /// The entity type (e.g. `truck`).
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// The per-type entity id (e.g. `1`).
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.entity_type, self.id)
    }
}

impl FromStr for EntityKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (entity_type, id) = s
            .split_once('-')
            .ok_or_else(|| TypeError::InvalidEntityKey(s.to_owned()))?;
        Self::new(entity_type, id)
    }
}

impl Serialize for EntityKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn entity_key_display_and_parse_agree() {
        let key = EntityKey::new("truck", "1").unwrap();
        assert_eq!(key.to_string(), "truck-1");
        let parsed: EntityKey = "truck-1".parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn entity_key_keeps_dashes_in_id() {
        let parsed: EntityKey = "drone-a-7".parse().unwrap();
        assert_eq!(parsed.entity_type(), "drone");
        assert_eq!(parsed.id(), "a-7");
    }

    #[test]
    fn entity_key_rejects_malformed() {
        assert!("truck".parse::<EntityKey>().is_err());
        assert!("-1".parse::<EntityKey>().is_err());
        assert!("truck-".parse::<EntityKey>().is_err());
    }

    #[test]
    fn entity_key_serializes_as_string() {
        let key = EntityKey::new("truck", "5").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"truck-5\"");
        let back: EntityKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
