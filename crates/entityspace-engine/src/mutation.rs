//! Mutation Engine: entity, attribute, and mapping lifecycle operations.
//!
//! Every public method here checks all of its preconditions before
//! performing any write (delete_entity and delete_attribute being the
//! exception in spirit only: their "write" is itself a cascade of reads
//! followed by removals, each already known to apply by the time it runs).
//! Index maintenance for `IDX1`/`IDX2`/`K_IDX`/`V_IDX`/`ID_IDX` is gated on
//! [`IndexProfile`] so that query results never depend on which profile is
//! configured — only a lookup's cost does.

use tracing::{debug, trace, warn};

use entityspace_core::{
    is_subset_of, AttrPair, AttrSet, AttrValue, EntityId, Error, Result, Scope,
};
use entityspace_storage::codec::{encode, encode_join, split_decode};
use entityspace_storage::{Store, StoreFacade};

use crate::schema::{self, IndexProfile};

/// Mutation operations over a [`StoreFacade`], maintaining every table the
/// configured [`IndexProfile`] enables.
pub struct MutationEngine<'a, S: Store> {
    facade: &'a StoreFacade<S>,
    profile: IndexProfile,
}

impl<'a, S: Store> MutationEngine<'a, S> {
    /// Build an engine over `facade`, maintaining the tables `profile` enables.
    pub fn new(facade: &'a StoreFacade<S>, profile: IndexProfile) -> Self {
        Self { facade, profile }
    }

    /// Create an entity. Fails [`Error::EntityExists`] if `id` is already present.
    pub fn insert_entity(&self, id: &EntityId) -> Result<()> {
        debug!(id = %id, "insert_entity");
        let key = schema::store_entity_key(id.as_str())?;
        if self.facade.get(&key)?.is_some() {
            warn!(id = %id, "insert_entity: already exists");
            return Err(Error::entity_exists(id));
        }
        self.facade.put(&key, schema::ENTITY_MARKER)
    }

    /// Delete an entity and cascade: its outgoing attributes, every
    /// incoming reference to it, and every mapping scoped to it.
    pub fn delete_entity(&self, id: &EntityId) -> Result<()> {
        debug!(id = %id, "delete_entity");
        let key = schema::store_entity_key(id.as_str())?;
        if self.facade.get(&key)?.is_none() {
            warn!(id = %id, "delete_entity: no such entity");
            return Err(Error::no_entity(id));
        }
        self.facade.delete(&key)?;
        for (name, value) in self.enumerate_outgoing(id.as_str())? {
            self.purge_triple(id.as_str(), &name, &value)?;
        }
        self.remove_incoming_references(id.as_str())?;
        self.delete_all_mappings_scoped_to(id)?;
        Ok(())
    }

    /// Record one `(name, value)` attribute on `id`.
    pub fn insert_attribute(&self, id: &EntityId, name: &str, value: &AttrValue) -> Result<()> {
        debug!(id = %id, name, "insert_attribute");
        if self.facade.get(&schema::store_entity_key(id.as_str())?)?.is_none() {
            return Err(Error::no_entity(id));
        }
        if let AttrValue::Ref(target) = value {
            if self.facade.get(&schema::store_entity_key(target.as_str())?)?.is_none() {
                return Err(Error::no_entity(target));
            }
        }
        let store_key = schema::store_attr_key(id.as_str(), name)?;
        let value_ext = value.external();
        if self.facade.value_contains(&store_key, &encode(&value_ext)?)? {
            warn!(id = %id, name, "insert_attribute: triple already exists");
            return Err(Error::attribute_exists(id, name, value_ext));
        }
        self.write_triple(id.as_str(), name, value)
    }

    /// Delete attributes of `id` matching `name`/`value`, where `None`
    /// stands for the wildcard in each position (the four shapes of
    /// `delete_attribute` described in the mutation contract).
    pub fn delete_attribute(
        &self,
        id: &EntityId,
        name: Option<&str>,
        value: Option<&AttrValue>,
    ) -> Result<()> {
        debug!(id = %id, ?name, "delete_attribute");
        match (name, value) {
            (Some(name), Some(value)) => {
                let store_key = schema::store_attr_key(id.as_str(), name)?;
                if !self.facade.value_contains(&store_key, &encode(&value.external())?)? {
                    return Err(Error::no_attribute(id, name));
                }
                self.purge_triple(id.as_str(), name, value)
            }
            (None, Some(value)) => {
                let names = self.names_with_value(id.as_str(), value)?;
                if names.is_empty() {
                    return Err(Error::no_attribute(id, entityspace_core::ANY));
                }
                for name in names {
                    self.purge_triple(id.as_str(), &name, value)?;
                }
                Ok(())
            }
            (Some(name), None) => {
                let store_key = schema::store_attr_key(id.as_str(), name)?;
                let cell = match self.facade.get(&store_key)? {
                    Some(cell) => cell,
                    None => return Err(Error::no_attribute(id, name)),
                };
                for token in split_decode(&cell) {
                    let value = AttrValue::parse(&token)?;
                    self.purge_triple(id.as_str(), name, &value)?;
                }
                Ok(())
            }
            (None, None) => {
                let outgoing = self.enumerate_outgoing(id.as_str())?;
                if outgoing.is_empty() {
                    return Err(Error::no_attribute(id, entityspace_core::ANY));
                }
                for (name, value) in outgoing {
                    self.purge_triple(id.as_str(), &name, &value)?;
                }
                Ok(())
            }
        }
    }

    /// Record one `synonym` for `original` under `scope`.
    pub fn insert_mapping(&self, scope: &Scope, original: &AttrSet, synonym: &AttrSet) -> Result<()> {
        debug!(scope = %scope, "insert_mapping");
        if original.is_empty() || synonym.is_empty() {
            return Err(Error::invalid_input(
                "mapping original and synonym must be non-empty",
            ));
        }
        if is_subset_of(original, synonym) || is_subset_of(synonym, original) {
            return Err(Error::invalid_input(
                "mapping original and synonym must not be subsets of one another",
            ));
        }
        if let Scope::Specific(id) = scope {
            if self.facade.get(&schema::store_entity_key(id.as_str())?)?.is_none() {
                return Err(Error::no_entity(id));
            }
            for pair in original {
                let store_key = schema::store_attr_key(id.as_str(), &pair.name)?;
                if !self
                    .facade
                    .value_contains(&store_key, &encode(&pair.value.external())?)?
                {
                    warn!(scope = %scope, name = %pair.name, "insert_mapping: original attribute missing");
                    return Err(Error::no_attribute(id, &pair.name));
                }
            }
        }
        let key = schema::maps_key(scope, original)?;
        let synonym_serialized = schema::serialize_attrset(synonym)?;
        let token = encode(&synonym_serialized)?;
        if self.facade.value_contains(&key, &token)? {
            return Err(Error::mapping_exists(scope));
        }
        self.facade.add_to_value(&key, &token)
    }

    /// Delete a mapping: an exact synonym, all synonyms for an original, or
    /// (both `None`) every mapping under `scope`.
    pub fn delete_mapping(
        &self,
        scope: &Scope,
        original: Option<&AttrSet>,
        synonym: Option<&AttrSet>,
    ) -> Result<()> {
        debug!(scope = %scope, "delete_mapping");
        match (original, synonym) {
            (Some(orig), Some(syn)) => {
                let key = schema::maps_key(scope, orig)?;
                let token = encode(&schema::serialize_attrset(syn)?)?;
                if !self.facade.remove_from_value(&key, &token)? {
                    return Err(Error::no_mapping(scope));
                }
                Ok(())
            }
            (Some(orig), None) => {
                let key = schema::maps_key(scope, orig)?;
                if self.facade.get(&key)?.is_none() {
                    return Err(Error::no_mapping(scope));
                }
                self.facade.delete(&key)
            }
            (None, None) => {
                let prefix = schema::maps_scope_prefix(scope)?;
                let rows = self.facade.scan_prefix(&prefix)?;
                if rows.is_empty() {
                    return Err(Error::no_mapping(scope));
                }
                for (key, _) in rows {
                    self.facade.delete(&key)?;
                }
                Ok(())
            }
            (None, Some(_)) => Err(Error::invalid_input(
                "delete_mapping: a synonym cannot be given without an original",
            )),
        }
    }

    /// Drop every table (a single-namespace store, so one `truncate` suffices).
    pub fn clear(&self) -> Result<()> {
        debug!("clear");
        self.facade.truncate()
    }

    /// Every `(name, value)` pair `id` currently owns, via `ID_IDX` when the
    /// profile maintains it, else a `STORE` prefix scan.
    fn enumerate_outgoing(&self, id: &str) -> Result<Vec<(String, AttrValue)>> {
        let mut out = Vec::new();
        if self.profile.has_all() {
            let names_key = schema::id_idx_key(id)?;
            if let Some(cell) = self.facade.get(&names_key)? {
                for name in split_decode(&cell) {
                    let store_key = schema::store_attr_key(id, &name)?;
                    if let Some(values_cell) = self.facade.get(&store_key)? {
                        for token in split_decode(&values_cell) {
                            out.push((name.clone(), AttrValue::parse(&token)?));
                        }
                    }
                }
            }
        } else {
            let prefix = schema::store_attr_prefix(id)?;
            for (key, cell) in self.facade.scan_prefix(&prefix)? {
                let (_owner, name) = match schema::parse_store_attr_key(schema::strip_tag(&key)) {
                    Ok(parsed) => parsed,
                    Err(_) => continue,
                };
                for token in split_decode(&cell) {
                    out.push((name.clone(), AttrValue::parse(&token)?));
                }
            }
        }
        Ok(out)
    }

    /// Every attribute name under which `id` holds `value`, via `IDX2` when
    /// present, else by filtering [`Self::enumerate_outgoing`].
    fn names_with_value(&self, id: &str, value: &AttrValue) -> Result<Vec<String>> {
        let value_ext = value.external();
        if self.profile.has_inverted() {
            let key = schema::idx2_key(id, &value_ext)?;
            Ok(match self.facade.get(&key)? {
                Some(cell) => split_decode(&cell),
                None => Vec::new(),
            })
        } else {
            let mut names: Vec<String> = self
                .enumerate_outgoing(id)?
                .into_iter()
                .filter(|(_, v)| v == value)
                .map(|(name, _)| name)
                .collect();
            names.sort();
            names.dedup();
            Ok(names)
        }
    }

    /// Write one triple into `STORE` and every table `profile` enables.
    fn write_triple(&self, id: &str, name: &str, value: &AttrValue) -> Result<()> {
        let value_ext = value.external();
        let store_key = schema::store_attr_key(id, name)?;
        self.facade.add_to_value(&store_key, &encode(&value_ext)?)?;
        if self.profile.has_inverted() {
            self.facade
                .add_to_value(&schema::idx1_key(&value_ext, name)?, &encode(id)?)?;
            self.facade
                .add_to_value(&schema::idx2_key(id, &value_ext)?, &encode(name)?)?;
        }
        if self.profile.has_all() {
            self.facade.add_to_value(&schema::k_idx_key(name)?, &encode(id)?)?;
            self.facade
                .add_to_value(&schema::v_idx_key(&value_ext)?, &encode(id)?)?;
            self.facade.add_to_value(&schema::id_idx_key(id)?, &encode(name)?)?;
        }
        Ok(())
    }

    /// Remove one triple from every table `profile` enables, pruning
    /// `K_IDX`/`V_IDX`/`ID_IDX` membership only when `id` no longer
    /// qualifies for it, then cascade into `MAPS`.
    fn purge_triple(&self, id: &str, name: &str, value: &AttrValue) -> Result<()> {
        trace!(id, name, "purge_triple");
        let value_ext = value.external();
        let name_tok = encode(name)?;

        let store_key = schema::store_attr_key(id, name)?;
        self.facade.remove_from_value(&store_key, &encode(&value_ext)?)?;
        let still_has_name = self.facade.get(&store_key)?.is_some();

        if self.profile.has_inverted() {
            self.facade
                .remove_from_value(&schema::idx1_key(&value_ext, name)?, &encode(id)?)?;
            self.facade
                .remove_from_value(&schema::idx2_key(id, &value_ext)?, &name_tok)?;
        }

        if self.profile.has_all() {
            if !still_has_name {
                self.facade
                    .remove_from_value(&schema::k_idx_key(name)?, &encode(id)?)?;
                self.facade
                    .remove_from_value(&schema::id_idx_key(id)?, &name_tok)?;
            }
            let still_has_value = self
                .facade
                .get(&schema::idx2_key(id, &value_ext)?)?
                .is_some();
            if !still_has_value {
                self.facade
                    .remove_from_value(&schema::v_idx_key(&value_ext)?, &encode(id)?)?;
            }
        }

        self.cascade_mapping_removal(id, name, value)
    }

    /// Every id that `id` no longer needs to reference, removed: find every
    /// incoming `Ref(id)` attribute and purge it.
    fn remove_incoming_references(&self, id: &str) -> Result<()> {
        let target_ext = id.to_string();
        let mut hits: Vec<(String, String)> = Vec::new();

        if self.profile.has_all() {
            if let Some(cell) = self.facade.get(&schema::v_idx_key(&target_ext)?)? {
                for owner in split_decode(&cell) {
                    if let Some(names_cell) =
                        self.facade.get(&schema::idx2_key(&owner, &target_ext)?)?
                    {
                        for name in split_decode(&names_cell) {
                            hits.push((owner.clone(), name));
                        }
                    }
                }
            }
        } else if self.profile.has_inverted() {
            let prefix = schema::idx1_prefix(&target_ext)?;
            for (key, cell) in self.facade.scan_prefix(&prefix)? {
                let parts = split_decode(schema::strip_tag(&key));
                let name = match parts.as_slice() {
                    [_, name] => name.clone(),
                    _ => continue,
                };
                for owner in split_decode(&cell) {
                    hits.push((owner, name.clone()));
                }
            }
        } else {
            for (key, cell) in self.facade.scan()? {
                if !schema::is_store_key(&key) {
                    continue;
                }
                let (owner, name) = match schema::parse_store_attr_key(schema::strip_tag(&key)) {
                    Ok(parsed) => parsed,
                    Err(_) => continue,
                };
                for token in split_decode(&cell) {
                    if token == target_ext {
                        hits.push((owner.clone(), name.clone()));
                    }
                }
            }
        }

        let value = AttrValue::Ref(EntityId::new(id)?);
        for (owner, name) in hits {
            self.purge_triple(&owner, &name, &value)?;
        }
        Ok(())
    }

    /// Drop every `MAPS` row scoped to `id` outright (used only by
    /// [`Self::delete_entity`] — unlike [`Self::cascade_mapping_removal`],
    /// no pair-level pruning applies since the scope entity itself is gone).
    fn delete_all_mappings_scoped_to(&self, id: &EntityId) -> Result<()> {
        let prefix = schema::maps_scope_prefix(&Scope::Specific(id.clone()))?;
        for (key, _) in self.facade.scan_prefix(&prefix)? {
            self.facade.delete(&key)?;
        }
        Ok(())
    }

    /// After removing pair `(name, value)` from `owner`, prune it out of
    /// every `MAPS` row scoped to `owner`: out of `original` (rewriting the
    /// row's key, or dropping the row if `original` becomes empty) and out
    /// of any synonym (dropping just that synonym if it becomes empty), then
    /// re-check the original/synonym subset constraint if `original` changed.
    fn cascade_mapping_removal(&self, owner: &str, name: &str, value: &AttrValue) -> Result<()> {
        let owner_id = EntityId::new(owner)?;
        let scope = Scope::Specific(owner_id);
        let prefix = schema::maps_scope_prefix(&scope)?;
        let p = AttrPair::new(name, value.clone());

        for (key, cell) in self.facade.scan_prefix(&prefix)? {
            let (_scope_tok, original) = schema::parse_maps_key(schema::strip_tag(&key))?;
            let synonyms: Vec<AttrSet> = split_decode(&cell)
                .iter()
                .map(|s| schema::deserialize_attrset(s))
                .collect::<Result<_>>()?;

            let original_touched = original.contains(&p);
            let synonyms_touched = synonyms.iter().any(|s| s.contains(&p));
            if !original_touched && !synonyms_touched {
                continue;
            }

            self.facade.delete(&key)?;

            let pruned_original: AttrSet = if original_touched {
                original.into_iter().filter(|pp| *pp != p).collect()
            } else {
                original
            };
            if original_touched && pruned_original.is_empty() {
                continue;
            }

            let mut pruned_synonyms: Vec<AttrSet> = synonyms
                .into_iter()
                .map(|s| {
                    if s.contains(&p) {
                        s.into_iter().filter(|pp| *pp != p).collect::<AttrSet>()
                    } else {
                        s
                    }
                })
                .filter(|s| !s.is_empty())
                .collect();

            if original_touched {
                pruned_synonyms.retain(|syn| !is_subset_of(&pruned_original, syn));
            }
            if pruned_synonyms.is_empty() {
                continue;
            }

            let new_key = schema::maps_key(&scope, &pruned_original)?;
            let serialized: Vec<String> = pruned_synonyms
                .iter()
                .map(schema::serialize_attrset)
                .collect::<Result<_>>()?;
            let new_value = encode_join(serialized)?;
            self.facade.put(&new_key, &new_value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entityspace_storage::MemoryStore;

    fn engine(profile: IndexProfile) -> (StoreFacade<MemoryStore>, IndexProfile) {
        (StoreFacade::new(MemoryStore::new()), profile)
    }

    fn literal(s: &str) -> AttrValue {
        AttrValue::parse(&format!("\"{s}\"")).unwrap()
    }

    fn eid(s: &str) -> EntityId {
        EntityId::new(s).unwrap()
    }

    #[test]
    fn insert_then_delete_entity_round_trips() {
        for profile in [IndexProfile::StoreOnly, IndexProfile::Inverted, IndexProfile::All] {
            let (facade, profile) = engine(profile);
            let m = MutationEngine::new(&facade, profile);
            let id = eid("alice");
            m.insert_entity(&id).unwrap();
            assert!(matches!(m.insert_entity(&id), Err(Error::EntityExists { .. })));
            m.delete_entity(&id).unwrap();
            assert!(facade.scan().unwrap().is_empty());
        }
    }

    #[test]
    fn insert_attribute_requires_existing_entities() {
        let (facade, profile) = engine(IndexProfile::All);
        let m = MutationEngine::new(&facade, profile);
        let id = eid("alice");
        assert!(matches!(
            m.insert_attribute(&id, "likes", &literal("tea")),
            Err(Error::NoEntity { .. })
        ));
        m.insert_entity(&id).unwrap();
        assert!(matches!(
            m.insert_attribute(&id, "knows", &AttrValue::Ref(eid("bob"))),
            Err(Error::NoEntity { .. })
        ));
    }

    #[test]
    fn attribute_round_trips_across_profiles() {
        for profile in [IndexProfile::StoreOnly, IndexProfile::Inverted, IndexProfile::All] {
            let (facade, profile) = engine(profile);
            let m = MutationEngine::new(&facade, profile);
            let id = eid("alice");
            m.insert_entity(&id).unwrap();
            m.insert_attribute(&id, "likes", &literal("tea")).unwrap();
            assert!(matches!(
                m.insert_attribute(&id, "likes", &literal("tea")),
                Err(Error::AttributeExists { .. })
            ));
            m.delete_attribute(&id, Some("likes"), Some(&literal("tea")))
                .unwrap();
            let rows_before = facade.scan().unwrap().len();
            m.delete_entity(&id).unwrap();
            assert!(rows_before <= 1);
        }
    }

    #[test]
    fn delete_entity_cascades_incoming_references() {
        for profile in [IndexProfile::StoreOnly, IndexProfile::Inverted, IndexProfile::All] {
            let (facade, profile) = engine(profile);
            let m = MutationEngine::new(&facade, profile);
            let a = eid("a");
            let b = eid("b");
            m.insert_entity(&a).unwrap();
            m.insert_entity(&b).unwrap();
            m.insert_attribute(&a, "knows", &AttrValue::Ref(b.clone())).unwrap();
            m.delete_entity(&b).unwrap();
            let store_key = schema::store_attr_key("a", "knows").unwrap();
            assert_eq!(facade.get(&store_key).unwrap(), None);
        }
    }

    #[test]
    fn delete_attribute_wildcard_shapes() {
        let (facade, profile) = engine(IndexProfile::All);
        let m = MutationEngine::new(&facade, profile);
        let id = eid("e");
        m.insert_entity(&id).unwrap();
        m.insert_attribute(&id, "k1", &literal("v")).unwrap();
        m.insert_attribute(&id, "k2", &literal("v")).unwrap();
        m.delete_attribute(&id, None, Some(&literal("v"))).unwrap();
        assert_eq!(
            facade.get(&schema::store_attr_key("e", "k1").unwrap()).unwrap(),
            None
        );
        assert_eq!(
            facade.get(&schema::store_attr_key("e", "k2").unwrap()).unwrap(),
            None
        );

        m.insert_attribute(&id, "k1", &literal("a")).unwrap();
        m.insert_attribute(&id, "k1", &literal("b")).unwrap();
        m.delete_attribute(&id, Some("k1"), None).unwrap();
        assert_eq!(
            facade.get(&schema::store_attr_key("e", "k1").unwrap()).unwrap(),
            None
        );
    }

    #[test]
    fn mapping_insert_validates_and_rejects_duplicates() {
        let (facade, profile) = engine(IndexProfile::All);
        let m = MutationEngine::new(&facade, profile);
        let id = eid("e");
        m.insert_entity(&id).unwrap();
        m.insert_attribute(&id, "k1", &literal("s1")).unwrap();

        let mut original = AttrSet::new();
        original.insert(AttrPair::new("k1", literal("s1")));
        let mut synonym = AttrSet::new();
        synonym.insert(AttrPair::new("k3", literal("s2")));

        let scope = Scope::Specific(id.clone());
        m.insert_mapping(&scope, &original, &synonym).unwrap();
        assert!(matches!(
            m.insert_mapping(&scope, &original, &synonym),
            Err(Error::MappingExists { .. })
        ));
    }

    #[test]
    fn mapping_rejects_subset_overlap() {
        let (facade, profile) = engine(IndexProfile::All);
        let m = MutationEngine::new(&facade, profile);
        let mut small = AttrSet::new();
        small.insert(AttrPair::new("k1", literal("v1")));
        let mut large = AttrSet::new();
        large.insert(AttrPair::new("k1", literal("v1")));
        large.insert(AttrPair::new("k2", literal("v2")));
        assert!(matches!(
            m.insert_mapping(&Scope::Generic, &small, &large),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn attribute_removal_cascades_out_of_mapping_original() {
        let (facade, profile) = engine(IndexProfile::All);
        let m = MutationEngine::new(&facade, profile);
        let id = eid("e");
        m.insert_entity(&id).unwrap();
        m.insert_attribute(&id, "k1", &literal("s1")).unwrap();

        let mut original = AttrSet::new();
        original.insert(AttrPair::new("k1", literal("s1")));
        let mut synonym = AttrSet::new();
        synonym.insert(AttrPair::new("k3", literal("s2")));
        let scope = Scope::Specific(id.clone());
        m.insert_mapping(&scope, &original, &synonym).unwrap();

        m.delete_attribute(&id, Some("k1"), Some(&literal("s1"))).unwrap();

        let prefix = schema::maps_scope_prefix(&scope).unwrap();
        assert!(facade.scan_prefix(&prefix).unwrap().is_empty());
    }
}
