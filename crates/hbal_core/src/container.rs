//! Keyed containers over entities.
//!
//! A `Container<T>` is an ordered keyed collection (integer index → entity)
//! with bulk add/update/fold, stable key-ascending iteration, and O(log n)
//! lookups. It is polymorphic over the capability set `{idx, name, alias}`
//! ("Polymorphism over entities") via the `Keyed` trait — a small
//! interface, not a deep inheritance hierarchy.

use std::collections::BTreeMap;

use crate::Idx;

/// Capability set required of anything stored in a `Container`.
pub trait Keyed {
    fn idx(&self) -> Idx;
    fn name(&self) -> &str;
    fn alias(&self) -> &str;
    fn set_idx(&mut self, idx: Idx);
}

/// Lookup-by-name failure: either nothing matched, or more than one did.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FindByNameError {
    NotFound(String),
    Ambiguous(String, Vec<Idx>),
}

impl std::fmt::Display for FindByNameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindByNameError::NotFound(n) => write!(f, "no element named {n:?}"),
            FindByNameError::Ambiguous(n, ids) => {
                write!(f, "ambiguous name {n:?}: matches {ids:?}")
            }
        }
    }
}

impl std::error::Error for FindByNameError {}

/// An ordered keyed collection. Iteration order is key-ascending.
#[derive(Clone, Debug, Default)]
pub struct Container<T> {
    items: BTreeMap<Idx, T>,
}

impl<T: Keyed> Container<T> {
    pub fn empty() -> Self {
        Container { items: BTreeMap::new() }
    }

    pub fn from_list(list: Vec<T>) -> Self {
        let mut c = Self::empty();
        for item in list {
            c.add(item);
        }
        c
    }

    /// Insert `item` at its existing `idx`, replacing anything already there.
    pub fn add(&mut self, item: T) -> Idx {
        let idx = item.idx();
        self.items.insert(idx, item);
        idx
    }

    /// Insert `item` at the next free index (one past the current max), the
    /// way the loader assigns internal indices to freshly parsed entities.
    pub fn add_new(&mut self, mut item: T) -> Idx {
        let idx = self.items.keys().next_back().map(|k| k + 1).unwrap_or(0);
        item.set_idx(idx);
        self.items.insert(idx, item);
        idx
    }

    /// Insert two items in one call (used when primary/secondary need /// consistent fresh indices assigned together).
    pub fn add_two(&mut self, a: T, b: T) -> (Idx, Idx) {
        (self.add(a), self.add(b))
    }

    pub fn find(&self, idx: Idx) -> Option<&T> {
        self.items.get(&idx)
    }

    pub fn find_mut(&mut self, idx: Idx) -> Option<&mut T> {
        self.items.get_mut(&idx)
    }

    /// Exactly-one case-sensitive match by name or alias; otherwise a typed
    /// not-found/ambiguous failure.
    pub fn find_by_name(&self, name: &str) -> Result<&T, FindByNameError> {
        let matches: Vec<Idx> = self
.items
.iter()
.filter(|(_, v)| v.name() == name || v.alias() == name)
.map(|(k, _)| *k)
.collect();
        match matches.as_slice() {
            [] => Err(FindByNameError::NotFound(name.to_string())),
            [only] => Ok(self.items.get(only).expect("index came from this map")),
            _ => Err(FindByNameError::Ambiguous(name.to_string(), matches)),
        }
    }

    pub fn elems(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn elems_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.values_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = Idx> + '_ {
        self.items.keys().copied()
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Vec<U> {
        self.items.values().map(|v| f(v)).collect()
    }

    pub fn fold<A>(&self, init: A, mut f: impl FnMut(A, &T) -> A) -> A {
        let mut acc = init;
        for v in self.items.values() {
            acc = f(acc, v);
        }
        acc
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace the element at `idx` via `f`, returning the updated value.
    /// Entities are value-like: callers build a new value and hand it back
    /// here rather than mutating through a `&mut` borrow held elsewhere.
    pub fn update(&mut self, idx: Idx, f: impl FnOnce(T) -> T) -> Option<&T> {
        let existing = self.items.remove(&idx)?;
        let updated = f(existing);
        self.items.insert(idx, updated);
        self.items.get(&idx)
    }
}

impl<T: Keyed> FromIterator<T> for Container<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Container::from_list(iter.into_iter().collect())
    }
}
