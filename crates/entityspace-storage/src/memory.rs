//! In-memory `Store` backend.
//!
//! A `BTreeMap` (for key order) behind a single `parking_lot::RwLock`. No
//! version history, no TTL — only ordering and the five operations in
//! [`crate::traits::Store`] are needed here.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use entityspace_core::Result;

use crate::traits::Store;

/// A `Store` backed by an in-process `BTreeMap`.
///
/// # Example
///
/// ```
/// use entityspace_storage::{MemoryStore, Store};
///
/// let store = MemoryStore::new();
/// store.put(b"a", b"1").unwrap();
/// assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn truncate(&self) -> Result<()> {
        self.data.write().clear();
        Ok(())
    }

    fn scan(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_value() {
        let store = MemoryStore::new();
        store.put(b"k", b"v").unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
        store.delete(b"k").unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
    }

    #[test]
    fn scan_is_key_ordered() {
        let store = MemoryStore::new();
        store.put(b"b", b"2").unwrap();
        store.put(b"a", b"1").unwrap();
        let rows = store.scan().unwrap();
        assert_eq!(rows, vec![(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())]);
    }

    #[test]
    fn truncate_clears_everything() {
        let store = MemoryStore::new();
        store.put(b"a", b"1").unwrap();
        store.put(b"b", b"2").unwrap();
        store.truncate().unwrap();
        assert!(store.scan().unwrap().is_empty());
    }

    #[test]
    fn delete_of_missing_key_is_a_no_op() {
        let store = MemoryStore::new();
        assert!(store.delete(b"missing").is_ok());
    }
}
