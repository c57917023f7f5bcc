//! Mapping-aware evaluation.
//!
//! Wraps the plain evaluator: at every node, instead of requiring each
//! sibling condition to hold of the stored attributes verbatim, partitions
//! the siblings into blocks and lets any block be satisfied either by its
//! own conditions or by a synonym set recorded against it in `MAPS`.

use entityspace_core::{AttrPair, AttrSet, AttrValue, Condition, EntityId, Result, Scope, Term};
use entityspace_storage::codec::split_decode;
use entityspace_storage::Store;

use super::evaluator::{Bindings, Evaluator};
use super::partition::partitions;
use crate::schema;

impl<'a, S: Store> Evaluator<'a, S> {
    /// Mapping-aware conjunction over `conditions`: try every partitioning
    /// of the sibling set, stopping at the first whose every block complies
    /// (via its own conditions or a stored synonym).
    pub(crate) fn complies_mapping_aware(
        &self,
        id: &str,
        conditions: &[Condition],
        bindings: Bindings,
    ) -> Result<Option<Bindings>> {
        if conditions.is_empty() {
            return Ok(Some(bindings));
        }
        for partition in partitions(conditions.len()) {
            if let Some(result) = self.try_partition(id, conditions, &partition, bindings.clone())? {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Satisfy every block of one partition, in order, threading bindings
    /// across blocks (a variable bound in one block constrains the rest).
    fn try_partition(
        &self,
        id: &str,
        conditions: &[Condition],
        blocks: &[Vec<usize>],
        bindings: Bindings,
    ) -> Result<Option<Bindings>> {
        match blocks.split_first() {
            None => Ok(Some(bindings)),
            Some((block, rest)) => {
                let block_conditions: Vec<Condition> =
                    block.iter().map(|&i| conditions[i].clone()).collect();
                for alternative in self.alternatives_for(id, &block_conditions)? {
                    // The original `complies` re-entered per alternative: a
                    // plain conjunction over that alternative's leaves, with
                    // recursion through any reference staying mapping-aware.
                    if let Some(advanced) = self.complies(id, &alternative, bindings.clone(), true)? {
                        if let Some(result) = self.try_partition(id, conditions, rest, advanced)? {
                            return Ok(Some(result));
                        }
                    }
                }
                Ok(None)
            }
        }
    }

    /// The block's own conditions, plus one reconstituted condition list
    /// per synonym recorded for it — specific scope consulted before
    /// generic, both unioned into the alternative list.
    fn alternatives_for(&self, id: &str, block: &[Condition]) -> Result<Vec<Vec<Condition>>> {
        let mut alternatives = vec![block.to_vec()];
        let Some(set) = attrset_of_block(block) else {
            return Ok(alternatives);
        };
        for scope in [Scope::Specific(EntityId::new(id)?), Scope::Generic] {
            let key = schema::maps_key(&scope, &set)?;
            if let Some(cell) = self.facade.get(&key)? {
                for serialized in split_decode(&cell) {
                    let synonym = schema::deserialize_attrset(&serialized)?;
                    alternatives.push(reconstitute(&synonym));
                }
            }
        }
        Ok(alternatives)
    }
}

/// The concrete `AttrSet` a block of leaf conditions denotes, or `None` if
/// any condition in the block has a free name or value — a block built
/// from a wildcard or unbound variable has no corresponding mapping key to
/// look up.
fn attrset_of_block(block: &[Condition]) -> Option<AttrSet> {
    let mut set = AttrSet::new();
    for condition in block {
        let Condition::Leaf { name, value, .. } = condition else {
            return None;
        };
        let (Term::Const(name), Term::Const(value_ext)) = (name, value) else {
            return None;
        };
        set.insert(AttrPair::new(name.clone(), AttrValue::parse(value_ext).ok()?));
    }
    Some(set)
}

/// Turn a stored synonym set back into a flat list of leaf conditions, each
/// with no children — a synonym is a pure `(name, value)` substitution,
/// never a subtree.
fn reconstitute(set: &AttrSet) -> Vec<Condition> {
    set.iter()
        .map(|pair| Condition::leaf(Term::Const(pair.name.clone()), Term::Const(pair.value.external()), Vec::new()))
        .collect()
}
