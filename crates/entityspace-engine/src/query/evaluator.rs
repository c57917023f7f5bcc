//! Query Evaluator: the recursive tree-matcher over a [`Condition`] tree.
//!
//! `complies` implements the four cases of the matching contract (both
//! free, key free, value free, both fixed), dispatching to whichever of
//! `STORE`, `IDX1`, `IDX2` the configured [`IndexProfile`] makes cheapest —
//! every profile must agree on the answer, only the cost differs.
//! Variable bindings are an immutable environment: every speculative branch
//! clones it, and only the branch that ultimately succeeds is kept.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;

use entityspace_core::{AttrValue, Condition, EntityId, Error, Result, Term};
use entityspace_storage::codec::{encode, split_decode};
use entityspace_storage::{Store, StoreFacade};

use crate::schema::{self, IndexProfile};

/// Variable bindings accumulated along one search branch: variable name to
/// its bound string (a raw name for a name-position binding, an
/// [`AttrValue::external`] form for a value-position binding).
pub type Bindings = BTreeMap<String, String>;

/// Evaluates [`Condition`] trees against the entities in a [`StoreFacade`].
pub struct Evaluator<'a, S: Store> {
    pub(crate) facade: &'a StoreFacade<S>,
    pub(crate) profile: IndexProfile,
}

impl<'a, S: Store> Evaluator<'a, S> {
    /// Build an evaluator over `facade`.
    pub fn new(facade: &'a StoreFacade<S>, profile: IndexProfile) -> Self {
        Self { facade, profile }
    }

    /// Which entity ids satisfy `root`, optionally expanding through stored
    /// attribute synonymy mappings.
    pub fn search(&self, root: &Condition, use_mappings: bool) -> Result<Vec<EntityId>> {
        let Condition::Root { value, children } = root else {
            return Err(Error::invalid_input("search root must be a Root condition"));
        };
        let mut results = Vec::new();
        for id in self.root_candidates(value)? {
            let mut bindings = Bindings::new();
            if let Term::Var(name) = value {
                bindings.insert(name.clone(), id.clone());
            }
            if self.recurse(&id, children, bindings, use_mappings)?.is_some() {
                results.push(EntityId::new(id)?);
            }
        }
        Ok(results)
    }

    fn root_candidates(&self, value: &Term) -> Result<Vec<String>> {
        match value {
            Term::Const(id) => {
                if self.facade.get(&schema::store_entity_key(id)?)?.is_some() {
                    Ok(vec![id.clone()])
                } else {
                    Ok(Vec::new())
                }
            }
            Term::Any | Term::Var(_) => self.all_entity_ids(),
        }
    }

    fn all_entity_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for (key, _) in self.facade.scan()? {
            if !schema::is_store_key(&key) {
                continue;
            }
            if let [id] = split_decode(schema::strip_tag(&key)).as_slice() {
                ids.push(id.clone());
            }
        }
        Ok(ids)
    }

    /// Recurse into `children` against `id`, dispatching to the
    /// mapping-aware path when `use_mappings` is set — recursion through a
    /// reference value must stay mapping-aware for as long as the search
    /// was started that way.
    pub(crate) fn recurse(
        &self,
        id: &str,
        children: &[Condition],
        bindings: Bindings,
        use_mappings: bool,
    ) -> Result<Option<Bindings>> {
        if use_mappings {
            self.complies_mapping_aware(id, children, bindings)
        } else {
            self.complies(id, children, bindings, false)
        }
    }

    /// Plain conjunction over `conditions`: every condition must be
    /// satisfiable in sequence using some extension of `bindings`.
    pub(crate) fn complies(
        &self,
        id: &str,
        conditions: &[Condition],
        bindings: Bindings,
        use_mappings: bool,
    ) -> Result<Option<Bindings>> {
        match conditions.split_first() {
            None => Ok(Some(bindings)),
            Some((first, rest)) => {
                for candidate in self.satisfy_leaf(id, first, bindings.clone(), use_mappings)? {
                    if let Some(result) = self.complies(id, rest, candidate, use_mappings)? {
                        return Ok(Some(result));
                    }
                }
                Ok(None)
            }
        }
    }

    fn satisfy_leaf(
        &self,
        id: &str,
        leaf: &Condition,
        bindings: Bindings,
        use_mappings: bool,
    ) -> Result<Vec<Bindings>> {
        let name_term = leaf.name().expect("leaf conditions always carry a name");
        let value_term = leaf.value();
        let children = leaf.children();

        match (fixed_value(name_term, &bindings), fixed_value(value_term, &bindings)) {
            (None, None) => self.case_both_free(id, name_term, value_term, bindings, children, use_mappings),
            (None, Some(value)) => {
                self.case_key_free(id, name_term, &value, bindings, children, use_mappings)
            }
            (Some(name), None) => {
                self.case_value_free(id, &name, value_term, bindings, children, use_mappings)
            }
            (Some(name), Some(value)) => {
                self.case_both_fixed(id, &name, &value, bindings, children, use_mappings)
            }
        }
    }

    /// Case 1: both `name` and `value` free. Enumerate id's full attribute
    /// multiset.
    fn case_both_free(
        &self,
        id: &str,
        name_term: &Term,
        value_term: &Term,
        bindings: Bindings,
        children: &[Condition],
        use_mappings: bool,
    ) -> Result<Vec<Bindings>> {
        let mut out = Vec::new();
        for (name, value) in self.enumerate_pairs(id)? {
            let mut candidate = bindings.clone();
            if !bind_free(name_term, &name, &mut candidate) {
                continue;
            }
            if !bind_free(value_term, &value.external(), &mut candidate) {
                continue;
            }
            if let Some(result) = self.recurse_if_ref(&value, children, candidate, use_mappings)? {
                out.push(result);
            }
        }
        Ok(out)
    }

    /// Case 2: `name` free, `value` fixed. Use `IDX2` when present, else a
    /// filtered scan of id's attributes.
    fn case_key_free(
        &self,
        id: &str,
        name_term: &Term,
        value_ext: &str,
        bindings: Bindings,
        children: &[Condition],
        use_mappings: bool,
    ) -> Result<Vec<Bindings>> {
        let value = AttrValue::parse(value_ext)?;
        let names = self.names_with_value(id, &value)?;
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let base = match self.recurse_if_ref(&value, children, bindings, use_mappings)? {
            Some(b) => b,
            None => return Ok(Vec::new()),
        };
        match name_term {
            Term::Any => Ok(vec![base]),
            Term::Var(_) => {
                let mut out = Vec::new();
                let mut seen = FxHashSet::default();
                for name in names {
                    if !seen.insert(name.clone()) {
                        continue;
                    }
                    let mut candidate = base.clone();
                    if bind_free(name_term, &name, &mut candidate) {
                        out.push(candidate);
                    }
                }
                Ok(out)
            }
            Term::Const(_) => unreachable!("case_key_free is only reached when name is free"),
        }
    }

    /// Case 3: `name` fixed, `value` free. Iterate `STORE[id,name]`'s tokens.
    fn case_value_free(
        &self,
        id: &str,
        name: &str,
        value_term: &Term,
        bindings: Bindings,
        children: &[Condition],
        use_mappings: bool,
    ) -> Result<Vec<Bindings>> {
        let mut out = Vec::new();
        for value in self.values_for_name(id, name)? {
            let mut candidate = bindings.clone();
            if !bind_free(value_term, &value.external(), &mut candidate) {
                continue;
            }
            if let Some(result) = self.recurse_if_ref(&value, children, candidate, use_mappings)? {
                out.push(result);
            }
        }
        Ok(out)
    }

    /// Case 4: both fixed. A single membership check against `STORE`.
    fn case_both_fixed(
        &self,
        id: &str,
        name: &str,
        value_ext: &str,
        bindings: Bindings,
        children: &[Condition],
        use_mappings: bool,
    ) -> Result<Vec<Bindings>> {
        let value = AttrValue::parse(value_ext)?;
        let store_key = schema::store_attr_key(id, name)?;
        if !self.facade.value_contains(&store_key, &encode(value_ext)?)? {
            return Ok(Vec::new());
        }
        match self.recurse_if_ref(&value, children, bindings, use_mappings)? {
            Some(result) => Ok(vec![result]),
            None => Ok(Vec::new()),
        }
    }

    /// Recurse into `children` using `value`'s referenced entity as the new
    /// id — unless `value` is a literal, in which case children are
    /// trivially satisfied without recursing (a literal leaf has no
    /// semantic children even when the query tree supplies some).
    fn recurse_if_ref(
        &self,
        value: &AttrValue,
        children: &[Condition],
        bindings: Bindings,
        use_mappings: bool,
    ) -> Result<Option<Bindings>> {
        if children.is_empty() {
            return Ok(Some(bindings));
        }
        match value {
            AttrValue::Literal(_) => Ok(Some(bindings)),
            AttrValue::Ref(target) => self.recurse(target.as_str(), children, bindings, use_mappings),
        }
    }

    /// Every `(name, value)` pair `id` owns, via `ID_IDX` when the profile
    /// maintains it, else a `STORE` prefix scan.
    pub(crate) fn enumerate_pairs(&self, id: &str) -> Result<Vec<(String, AttrValue)>> {
        let mut out = Vec::new();
        if self.profile.has_all() {
            if let Some(cell) = self.facade.get(&schema::id_idx_key(id)?)? {
                for name in split_decode(&cell) {
                    out.extend(
                        self.values_for_name(id, &name)?
                            .into_iter()
                            .map(|v| (name.clone(), v)),
                    );
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

    fn values_for_name(&self, id: &str, name: &str) -> Result<Vec<AttrValue>> {
        let store_key = schema::store_attr_key(id, name)?;
        match self.facade.get(&store_key)? {
            Some(cell) => split_decode(&cell).iter().map(|t| AttrValue::parse(t)).collect(),
            None => Ok(Vec::new()),
        }
    }

    fn names_with_value(&self, id: &str, value: &AttrValue) -> Result<Vec<String>> {
        if self.profile.has_inverted() {
            let key = schema::idx2_key(id, &value.external())?;
            Ok(match self.facade.get(&key)? {
                Some(cell) => split_decode(&cell),
                None => Vec::new(),
            })
        } else {
            let mut names: Vec<String> = self
                .enumerate_pairs(id)?
                .into_iter()
                .filter(|(_, v)| v == value)
                .map(|(name, _)| name)
                .collect();
            names.sort();
            names.dedup();
            Ok(names)
        }
    }
}

/// `Term::Const` and already-bound `Term::Var` are "fixed" for dispatch
/// purposes; `Term::Any` and an unbound `Term::Var` are free.
fn fixed_value(term: &Term, bindings: &Bindings) -> Option<String> {
    match term {
        Term::Const(s) => Some(s.clone()),
        Term::Var(name) => bindings.get(name).cloned(),
        Term::Any => None,
    }
}

/// Bind a free term to `candidate`, applying the distinctness rule (a
/// candidate already bound to some other variable is rejected). `Any`
/// always succeeds without binding anything.
fn bind_free(term: &Term, candidate: &str, bindings: &mut Bindings) -> bool {
    match term {
        Term::Any => true,
        Term::Var(name) => {
            if bindings.values().any(|bound| bound == candidate) {
                false
            } else {
                bindings.insert(name.clone(), candidate.to_string());
                true
            }
        }
        Term::Const(_) => unreachable!("bind_free is only called on free terms"),
    }
}
