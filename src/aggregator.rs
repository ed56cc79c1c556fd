// 🗂️ Aggregator - Authoritative map from canonical key to entity
// First-seen wins for parents; child collections drop structurally-equal values.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// COMPOSITE KEY
// ============================================================================

/// CompositeKey - ordered tuple of normalized key values
///
/// Ordering is element-wise lexicographic, so every key sharing a prefix
/// sits in one contiguous run of the entity map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey(Vec<String>);

impl CompositeKey {
    pub fn new(parts: Vec<String>) -> Self {
        CompositeKey(parts)
    }

    pub fn single(id: impl Into<String>) -> Self {
        CompositeKey(vec![id.into()])
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Leading `len` parts (the whole key if shorter)
    pub fn prefix(&self, len: usize) -> &[String] {
        &self.0[..len.min(self.0.len())]
    }

    pub fn starts_with(&self, prefix: &[String]) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

// ============================================================================
// CHILD COLLECTIONS
// ============================================================================

/// ChildSet - ordered child collection that never holds two equal elements
///
/// `items` keeps insertion (later: sorted) order; `seen` answers membership.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildSet<T> {
    items: Vec<T>,
    seen: BTreeSet<T>,
}

impl<T> Default for ChildSet<T> {
    fn default() -> Self {
        ChildSet {
            items: Vec::new(),
            seen: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Clone> ChildSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless an equal element is already present; returns whether it was added
    pub fn insert(&mut self, item: T) -> bool {
        if !self.seen.insert(item.clone()) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn contains(&self, item: &T) -> bool {
        self.seen.contains(item)
    }
}

impl<T> ChildSet<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Stable sort by a collection-specific comparator
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.items.sort_by(compare);
    }
}

impl<T: Ord> ChildSet<T> {
    pub fn sort(&mut self) {
        self.items.sort();
    }
}

impl<T: Serialize> Serialize for ChildSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

/// Aggregator - entity map iterated in canonical (key) order
#[derive(Debug, Clone)]
pub struct Aggregator<E> {
    entities: BTreeMap<CompositeKey, E>,
}

impl<E> Default for Aggregator<E> {
    fn default() -> Self {
        Aggregator {
            entities: BTreeMap::new(),
        }
    }
}

impl<E> Aggregator<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parent; an existing entity under the same key is kept and false returned
    pub fn insert(&mut self, key: CompositeKey, entity: E) -> bool {
        if self.entities.contains_key(&key) {
            return false;
        }
        self.entities.insert(key, entity);
        true
    }

    pub fn contains(&self, key: &CompositeKey) -> bool {
        self.entities.contains_key(key)
    }

    pub fn get(&self, key: &CompositeKey) -> Option<&E> {
        self.entities.get(key)
    }

    pub fn get_mut(&mut self, key: &CompositeKey) -> Option<&mut E> {
        self.entities.get_mut(key)
    }

    /// First entity, in canonical order, whose key starts with `prefix`
    pub fn first_with_prefix_mut(&mut self, prefix: &[String]) -> Option<(&CompositeKey, &mut E)> {
        let start = CompositeKey::new(prefix.to_vec());
        self.entities
            .range_mut(start..)
            .next()
            .filter(|(key, _)| key.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CompositeKey> {
        self.entities.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CompositeKey, &E)> {
        self.entities.iter()
    }

    /// Entities in canonical key order
    pub fn into_entities(self) -> Vec<E> {
        self.entities.into_values().collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
