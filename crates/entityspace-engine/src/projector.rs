//! Result Projector: `get_entity`, turning a matched id into a tree the
//! caller can consume.
//!
//! Walks outgoing attributes the same way the query evaluator enumerates
//! them (`ID_IDX`/`STORE` via [`crate::query::Evaluator::enumerate_pairs`]
//! equivalent logic, duplicated here read-only since the projector has no
//! need of bindings or matching); a literal value becomes a leaf, a
//! reference recurses. A `visited` set scoped to one top-level call breaks
//! cycles: an id seen once already is re-emitted without children rather
//! than expanded again.

use rustc_hash::FxHashSet;

use entityspace_core::{AttrValue, EntityId, Result};
use entityspace_storage::codec::split_decode;
use entityspace_storage::{Store, StoreFacade};
use serde::Serialize;

use crate::schema::{self, IndexProfile};

/// One node of a projected entity tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntityTree {
    /// This node's entity id.
    pub id: String,
    /// Outgoing attributes, in underlying iteration order — callers
    /// needing determinism must sort.
    pub attributes: Vec<AttrNode>,
}

/// One outgoing attribute of an [`EntityTree`] node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttrNode {
    /// Attribute name.
    pub name: String,
    /// Attribute value, in external (quoted-or-bare) form.
    pub value: String,
    /// The referenced entity's subtree, if `value` is a reference and this
    /// is the first time it has been expanded within this projection.
    /// `None` for a literal value, or for a reference already visited
    /// higher up the same projection (a cycle break).
    pub child: Option<EntityTree>,
}

/// Projects entities to [`EntityTree`]s over a [`StoreFacade`].
pub struct Projector<'a, S: Store> {
    facade: &'a StoreFacade<S>,
    profile: IndexProfile,
}

impl<'a, S: Store> Projector<'a, S> {
    /// Build a projector over `facade`.
    pub fn new(facade: &'a StoreFacade<S>, profile: IndexProfile) -> Self {
        Self { facade, profile }
    }

    /// Materialize the tree rooted at `id`.
    pub fn get_entity(&self, id: &EntityId) -> Result<EntityTree> {
        let mut visited = FxHashSet::default();
        self.expand(id.as_str(), &mut visited)
    }

    fn expand(&self, id: &str, visited: &mut FxHashSet<String>) -> Result<EntityTree> {
        visited.insert(id.to_string());
        let mut attributes = Vec::new();
        for (name, value) in self.enumerate_pairs(id)? {
            let child = match &value {
                AttrValue::Literal(_) => None,
                AttrValue::Ref(target) => {
                    if visited.contains(target.as_str()) {
                        Some(EntityTree {
                            id: target.as_str().to_string(),
                            attributes: Vec::new(),
                        })
                    } else {
                        Some(self.expand(target.as_str(), visited)?)
                    }
                }
            };
            attributes.push(AttrNode {
                name,
                value: value.external(),
                child,
            });
        }
        Ok(EntityTree {
            id: id.to_string(),
            attributes,
        })
    }

    fn enumerate_pairs(&self, id: &str) -> Result<Vec<(String, AttrValue)>> {
        let mut out = Vec::new();
        if self.profile.has_all() {
            if let Some(cell) = self.facade.get(&schema::id_idx_key(id)?)? {
                for name in split_decode(&cell) {
                    out.extend(self.values_for_name(id, &name)?.into_iter().map(|v| (name.clone(), v)));
                }
            }
        } else {
            let prefix = schema::store_attr_prefix(id)?;
            for (key, cell) in self.facade.scan_prefix(&prefix)? {
                let (_owner, name) = schema::parse_store_attr_key(schema::strip_tag(&key))?;
                for token in split_decode(&cell) {
                    out.push((name.clone(), AttrValue::parse(&token)?));
                }
            }
        }
        Ok(out)
    }

    fn values_for_name(&self, id: &str, name: &str) -> Result<Vec<AttrValue>> {
        let store_key = schema::store_attr_key(id, name)?;
        match self.facade.get(&store_key)? {
            Some(cell) => split_decode(&cell).iter().map(|t| AttrValue::parse(t)).collect(),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::MutationEngine;
    use entityspace_storage::MemoryStore;

    fn literal(s: &str) -> AttrValue {
        AttrValue::parse(&format!("\"{s}\"")).unwrap()
    }

    /// Projection round-trip: flattened (name,value) multiset matches what
    /// was inserted, for an entity with no cycles.
    #[test]
    fn projection_round_trips_flat_attributes() {
        let facade = StoreFacade::new(MemoryStore::new());
        let profile = IndexProfile::All;
        let m = MutationEngine::new(&facade, profile);
        let e = EntityId::new("E").unwrap();
        m.insert_entity(&e).unwrap();
        m.insert_attribute(&e, "a", &literal("1")).unwrap();
        m.insert_attribute(&e, "b", &literal("2")).unwrap();

        let tree = Projector::new(&facade, profile).get_entity(&e).unwrap();
        let mut flat: Vec<(String, String)> =
            tree.attributes.iter().map(|a| (a.name.clone(), a.value.clone())).collect();
        flat.sort();
        assert_eq!(
            flat,
            vec![("a".to_string(), "\"1\"".to_string()), ("b".to_string(), "\"2\"".to_string())]
        );
    }

    /// An entity referencing itself breaks the cycle after one level.
    #[test]
    fn self_loop_breaks_cycle_after_one_level() {
        let facade = StoreFacade::new(MemoryStore::new());
        let profile = IndexProfile::All;
        let m = MutationEngine::new(&facade, profile);
        let x = EntityId::new("X").unwrap();
        m.insert_entity(&x).unwrap();
        m.insert_attribute(&x, "k", &AttrValue::Ref(x.clone())).unwrap();

        let tree = Projector::new(&facade, profile).get_entity(&x).unwrap();
        assert_eq!(tree.attributes.len(), 1);
        let child = tree.attributes[0].child.as_ref().unwrap();
        assert_eq!(child.id, "X");
        assert!(child.attributes.is_empty());
    }

    #[test]
    fn literal_value_never_has_a_child() {
        let facade = StoreFacade::new(MemoryStore::new());
        let profile = IndexProfile::StoreOnly;
        let m = MutationEngine::new(&facade, profile);
        let e = EntityId::new("E").unwrap();
        m.insert_entity(&e).unwrap();
        m.insert_attribute(&e, "k", &literal("v")).unwrap();

        let tree = Projector::new(&facade, profile).get_entity(&e).unwrap();
        assert!(tree.attributes[0].child.is_none());
    }
}
