//! The cross-view selection set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::EntityKey;

/// Unordered set of selected entity keys.
///
/// Both the map slice and the timeline slice hold one of these; equality is
/// set equality, so bindings compare slices directly before writing.
///
/// Ordering contract:
/// - Iteration yields keys in ascending `(type, id)` order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionSet {
    keys: BTreeSet<EntityKey>,
}

impl SelectionSet {
    /// An empty selection.
    pub const fn new() -> Self {
        Self {
            keys: BTreeSet::new(),
        }
    }

    /// Number of selected entities.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether `key` is selected.
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.keys.contains(key)
    }

    /// Inserts `key`. Returns `true` if the set changed.
    pub fn insert(&mut self, key: EntityKey) -> bool {
        self.keys.insert(key)
    }

    /// Removes `key`. Returns `true` if the set changed.
    pub fn remove(&mut self, key: &EntityKey) -> bool {
        self.keys.remove(key)
    }

    /// Adds `key` if absent, removes it if present.
    pub fn toggle(&mut self, key: EntityKey) {
        if !self.keys.remove(&key) {
            self.keys.insert(key);
        }
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Set union.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        self.keys.union(&other.keys).cloned().collect()
    }

    /// Whether any key is shared with `keys`.
    pub fn intersects<'a>(&self, mut keys: impl Iterator<Item = &'a EntityKey>) -> bool {
        keys.any(|k| self.keys.contains(k))
    }

    /// Iterate keys in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityKey> {
        self.keys.iter()
    }

    /// Keys rendered as feature ids (`"{type}-{id}"`).
    pub fn to_strings(&self) -> Vec<String> {
        self.keys.iter().map(ToString::to_string).collect()
    }
}

impl FromIterator<EntityKey> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = EntityKey>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SelectionSet {
    type Item = &'a EntityKey;
    type IntoIter = std::collections::btree_set::Iter<'a, EntityKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}
