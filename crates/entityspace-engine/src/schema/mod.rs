//! The six logical tables, their physical keys, and the deterministic
//! `AttrSet` encoding mappings are stored under.
//!
//! A natural layout gives each table its own KV namespace; this workspace
//! has a single [`entityspace_storage::Store`], so every table is instead a
//! distinct one-character tag prefixed onto an otherwise identical key.
//! Query and mutation code never builds a key by hand: every composite key
//! in the system is produced by one of the functions below, so a stray raw
//! [`entityspace_core::FIELD_SEPARATOR`] can never leak into a key.

use entityspace_core::{AttrPair, AttrSet, AttrValue, Error, Result, Scope, ANY};
use entityspace_storage::codec::{encode_join, split_decode};

/// Which auxiliary tables a [`crate::dataspace::DataSpace`] maintains
/// alongside the primary store and the mappings table.
///
/// Query and mutation behavior must be identical across all three profiles;
/// indexes are pure accelerants, never a source of different answers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum IndexProfile {
    /// Only `STORE` and `MAPS`. Every lookup by value or by id falls back
    /// to a full `STORE` scan.
    StoreOnly,
    /// `StoreOnly` plus `IDX1` (value,name → ids) and `IDX2` (id,value →
    /// names).
    #[default]
    Inverted,
    /// `Inverted` plus `K_IDX`, `V_IDX`, and `ID_IDX`, enabling
    /// near-linear-in-matches lookups by name, by value, or by id alone.
    All,
}

impl IndexProfile {
    /// True for [`IndexProfile::Inverted`] and [`IndexProfile::All`].
    pub fn has_inverted(self) -> bool {
        matches!(self, IndexProfile::Inverted | IndexProfile::All)
    }

    /// True only for [`IndexProfile::All`].
    pub fn has_all(self) -> bool {
        matches!(self, IndexProfile::All)
    }
}

/// One-character table tags, prefixed onto every key this module builds.
mod tag {
    pub const STORE: &str = "S";
    pub const MAPS: &str = "M";
    pub const IDX1: &str = "1";
    pub const IDX2: &str = "2";
    pub const K_IDX: &str = "K";
    pub const V_IDX: &str = "V";
    pub const ID_IDX: &str = "I";
}

fn tagged(tag: &str, rest: &str) -> String {
    format!("{tag}:{rest}")
}

/// Strip a table tag (`"S:"`, `"M:"`, ...) off a key, leaving the composite
/// key body `parse_*` functions expect.
pub fn strip_tag(key: &str) -> &str {
    key.get(2..).unwrap_or("")
}

/// True iff `key` belongs to the `STORE` table. Needed by any code that
/// scans the whole single-namespace store and must ignore the other five
/// tables living alongside it.
pub fn is_store_key(key: &str) -> bool {
    key.starts_with(&format!("{}:", tag::STORE))
}

/// The literal cell value an entity row holds (its presence, not its
/// attributes — those live in separate `STORE` rows).
pub const ENTITY_MARKER: &str = "1";

/// `STORE` row key for an entity's existence marker.
pub fn store_entity_key(id: &str) -> Result<String> {
    Ok(tagged(tag::STORE, &encode_join([id])?))
}

/// `STORE` row key for one `(id, name)` attribute cell.
pub fn store_attr_key(id: &str, name: &str) -> Result<String> {
    Ok(tagged(tag::STORE, &encode_join([id, name])?))
}

/// Prefix matching every `STORE` attribute row belonging to `id` (but not
/// the entity row itself, which has no trailing separator).
pub fn store_attr_prefix(id: &str) -> Result<String> {
    Ok(format!(
        "{}{}",
        tagged(tag::STORE, &encode_join([id])?),
        entityspace_core::FIELD_SEPARATOR
    ))
}

/// Split a `STORE` attribute key (with its tag stripped) back into
/// `(id, name)`.
pub fn parse_store_attr_key(key_without_tag: &str) -> Result<(String, String)> {
    let parts = split_decode(key_without_tag);
    match parts.as_slice() {
        [id, name] => Ok((id.clone(), name.clone())),
        _ => Err(Error::invalid_input("malformed STORE attribute key")),
    }
}

/// `IDX1` row key: `enc(value) S enc(name)`.
pub fn idx1_key(value: &str, name: &str) -> Result<String> {
    Ok(tagged(tag::IDX1, &encode_join([value, name])?))
}

/// Prefix matching every `IDX1` row for a given value.
pub fn idx1_prefix(value: &str) -> Result<String> {
    Ok(format!(
        "{}{}",
        tagged(tag::IDX1, &encode_join([value])?),
        entityspace_core::FIELD_SEPARATOR
    ))
}

/// `IDX2` row key: `enc(id) S enc(value)`.
pub fn idx2_key(id: &str, value: &str) -> Result<String> {
    Ok(tagged(tag::IDX2, &encode_join([id, value])?))
}

/// Prefix matching every `IDX2` row for a given id.
pub fn idx2_prefix(id: &str) -> Result<String> {
    Ok(format!(
        "{}{}",
        tagged(tag::IDX2, &encode_join([id])?),
        entityspace_core::FIELD_SEPARATOR
    ))
}

/// `K_IDX` row key: `enc(name)`.
pub fn k_idx_key(name: &str) -> Result<String> {
    Ok(tagged(tag::K_IDX, &encode_join([name])?))
}

/// `V_IDX` row key: `enc(value)`.
pub fn v_idx_key(value: &str) -> Result<String> {
    Ok(tagged(tag::V_IDX, &encode_join([value])?))
}

/// `ID_IDX` row key: `enc(id)`.
pub fn id_idx_key(id: &str) -> Result<String> {
    Ok(tagged(tag::ID_IDX, &encode_join([id])?))
}

/// The scope token used inside `MAPS` keys: the entity id, or `*` for the
/// generic scope.
fn scope_token(scope: &Scope) -> String {
    match scope {
        Scope::Specific(id) => id.to_string(),
        Scope::Generic => ANY.to_string(),
    }
}

/// `MAPS` row key: `enc(scope) S serialize(original)`.
pub fn maps_key(scope: &Scope, original: &AttrSet) -> Result<String> {
    let serialized = serialize_attrset(original)?;
    Ok(tagged(
        tag::MAPS,
        &encode_join([scope_token(scope), serialized])?,
    ))
}

/// Prefix matching every `MAPS` row for a given scope.
pub fn maps_scope_prefix(scope: &Scope) -> Result<String> {
    Ok(format!(
        "{}{}",
        tagged(tag::MAPS, &encode_join([scope_token(scope)])?),
        entityspace_core::FIELD_SEPARATOR
    ))
}

/// Split a `MAPS` key (tag stripped) back into `(scope_token, original)`.
pub fn parse_maps_key(key_without_tag: &str) -> Result<(String, AttrSet)> {
    let parts = split_decode(key_without_tag);
    match parts.as_slice() {
        [scope, original] => Ok((scope.clone(), deserialize_attrset(original)?)),
        _ => Err(Error::invalid_input("malformed MAPS key")),
    }
}

/// Deterministically encode an [`AttrSet`] for use inside a `MAPS` key or
/// value cell.
///
/// Flattens the (already name-then-value-ordered, thanks to `AttrSet`
/// being a `BTreeSet`) pairs into `[name1, value1, name2, value2, ...]` and
/// runs them through the same field-separator-safe join the rest of the
/// schema uses — reusing the key codec rather than inventing a second
/// escaping scheme.
pub fn serialize_attrset(set: &AttrSet) -> Result<String> {
    let mut flat = Vec::with_capacity(set.len() * 2);
    for pair in set {
        flat.push(pair.name.clone());
        flat.push(pair.value.external());
    }
    encode_join(flat)
}

/// Reverse [`serialize_attrset`].
pub fn deserialize_attrset(serialized: &str) -> Result<AttrSet> {
    let flat = split_decode(serialized);
    if flat.len() % 2 != 0 {
        return Err(Error::invalid_input("malformed attribute-set encoding"));
    }
    let mut set = AttrSet::new();
    let mut iter = flat.into_iter();
    while let (Some(name), Some(value)) = (iter.next(), iter.next()) {
        set.insert(AttrPair::new(name, AttrValue::parse(&value)?));
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entityspace_core::EntityId;

    fn pair(name: &str, value: &str) -> AttrPair {
        AttrPair::new(name, AttrValue::parse(value).unwrap())
    }

    #[test]
    fn store_keys_distinguish_entity_and_attribute_rows() {
        let entity = store_entity_key("alice").unwrap();
        let attr = store_attr_key("alice", "likes").unwrap();
        assert_ne!(entity, attr);
        assert!(attr.starts_with(&store_attr_prefix("alice").unwrap()));
    }

    #[test]
    fn store_prefix_does_not_collide_across_ids_sharing_a_stem() {
        let a_prefix = store_attr_prefix("A").unwrap();
        let ab_key = store_attr_key("AB", "k").unwrap();
        assert!(!ab_key.starts_with(&a_prefix));
    }

    #[test]
    fn parse_store_attr_key_round_trips() {
        let key = store_attr_key("alice", "likes").unwrap();
        let (tag, rest) = key.split_once(':').unwrap();
        assert_eq!(tag, "S");
        let (id, name) = parse_store_attr_key(rest).unwrap();
        assert_eq!(id, "alice");
        assert_eq!(name, "likes");
    }

    #[test]
    fn attrset_serialization_round_trips() {
        let mut set = AttrSet::new();
        set.insert(pair("k1", "\"v1\""));
        set.insert(pair("k2", "bob"));
        let serialized = serialize_attrset(&set).unwrap();
        let recovered = deserialize_attrset(&serialized).unwrap();
        assert_eq!(set, recovered);
    }

    #[test]
    fn attrset_serialization_handles_embedded_separator() {
        let mut set = AttrSet::new();
        set.insert(pair("k1", "\"has///separator\""));
        let serialized = serialize_attrset(&set).unwrap();
        let recovered = deserialize_attrset(&serialized).unwrap();
        assert_eq!(set, recovered);
    }

    #[test]
    fn maps_key_round_trips_scope_and_original() {
        let scope = Scope::Specific(EntityId::new("e1").unwrap());
        let mut original = AttrSet::new();
        original.insert(pair("k1", "\"v1\""));
        let key = maps_key(&scope, &original).unwrap();
        let (_tag, rest) = key.split_once(':').unwrap();
        let (scope_tok, recovered) = parse_maps_key(rest).unwrap();
        assert_eq!(scope_tok, "e1");
        assert_eq!(recovered, original);
    }

    #[test]
    fn generic_scope_uses_wildcard_token() {
        let mut original = AttrSet::new();
        original.insert(pair("k1", "\"v1\""));
        let key = maps_key(&Scope::Generic, &original).unwrap();
        let (_tag, rest) = key.split_once(':').unwrap();
        let (scope_tok, _) = parse_maps_key(rest).unwrap();
        assert_eq!(scope_tok, "*");
    }

    #[test]
    fn index_profile_predicates() {
        assert!(!IndexProfile::StoreOnly.has_inverted());
        assert!(IndexProfile::Inverted.has_inverted());
        assert!(!IndexProfile::Inverted.has_all());
        assert!(IndexProfile::All.has_inverted());
        assert!(IndexProfile::All.has_all());
    }
}
