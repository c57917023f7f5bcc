//! Attribute sets and mapping scopes.
//!
//! An [`AttrSet`] is the unordered-set key shape a [mapping][crate::Scope]
//! is declared over: an entity may hold `original` already, and declare that
//! any of several `synonyms` may stand in for it during mapping-aware
//! search.

use std::collections::BTreeSet;
use std::fmt;

use crate::types::{AttrValue, EntityId};

/// One `(name, value)` pair inside an [`AttrSet`].
///
/// Ordered so that an `AttrSet` (a `BTreeSet<AttrPair>`) iterates in a
/// single canonical order — the property the engine's mapping-row
/// serialization depends on for a deterministic encoding.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttrPair {
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: AttrValue,
}

impl AttrPair {
    /// Build a pair.
    pub fn new(name: impl Into<String>, value: AttrValue) -> Self {
        AttrPair {
            name: name.into(),
            value,
        }
    }
}

impl fmt::Display for AttrPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// An unordered set of attribute pairs — the key shape of a mapping's
/// `original` and of each of its `synonyms`.
///
/// Backed by a `BTreeSet` rather than a `HashSet`: mappings must be
/// serialized deterministically (the neither-subset check below and the
/// physical `MAPS` key both depend on a stable iteration order), and a
/// `BTreeSet` gives that for free.
pub type AttrSet = BTreeSet<AttrPair>;

/// True iff every pair in `smaller` is present in `larger` — the subset
/// relation an `original` and any of its `synonyms` must never stand in,
/// in either direction.
pub fn is_subset_of(smaller: &AttrSet, larger: &AttrSet) -> bool {
    smaller.is_subset(larger)
}

/// The scope a mapping is declared under: a specific entity, or `Generic`
/// (consulted for every entity, after any specific-scope mapping).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// The mapping applies only when matching against this entity.
    Specific(EntityId),
    /// The mapping applies to every entity.
    Generic,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Specific(id) => write!(f, "{id}"),
            Scope::Generic => write!(f, "*"),
        }
    }
}
