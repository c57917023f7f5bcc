//! Thin typed wrapper over [`Store`] adding multi-value cell helpers.
//!
//! A cell (the value half of a KV row) can hold either a single token or a
//! set of tokens joined by [`entityspace_core::FIELD_SEPARATOR`]. The three
//! helpers here (`value_contains`, `add_to_value`, `remove_from_value`)
//! give the physical schema and mutation engine a set-like view over that
//! cell without either of them touching the separator directly.

use entityspace_core::{Result, FIELD_SEPARATOR};

use crate::traits::Store;

/// A typed facade over a [`Store`]: string keys and values in, never raw
/// bytes, plus the multi-value cell helpers.
pub struct StoreFacade<S: Store> {
    store: S,
}

impl<S: Store> StoreFacade<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Point get, as a `String`.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let raw = self.store.get(key.as_bytes())?;
        Ok(raw.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Point put.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        self.store.put(key.as_bytes(), value.as_bytes())
    }

    /// Point delete.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.store.delete(key.as_bytes())
    }

    /// Drop every row.
    pub fn truncate(&self) -> Result<()> {
        self.store.truncate()
    }

    /// A full forward scan, as `(String, String)` pairs.
    pub fn scan(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .store
            .scan()?
            .into_iter()
            .map(|(k, v)| {
                (
                    String::from_utf8_lossy(&k).into_owned(),
                    String::from_utf8_lossy(&v).into_owned(),
                )
            })
            .collect())
    }

    /// Every row whose key starts with `prefix`, built by filtering a full
    /// forward scan — the core has no range-seek requirement (see
    /// [`crate::traits::Store::scan`]).
    pub fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect())
    }

    /// Split a multi-value cell into its separator-delimited tokens.
    fn tokens(cell: &str) -> Vec<&str> {
        cell.split(FIELD_SEPARATOR).collect()
    }

    /// True iff the cell at `key` exists and contains `token` as one of its
    /// tokens (or equals it outright, for a single-token cell).
    pub fn value_contains(&self, key: &str, token: &str) -> Result<bool> {
        match self.get(key)? {
            None => Ok(false),
            Some(cell) => Ok(Self::tokens(&cell).contains(&token)),
        }
    }

    /// Append `token` to the cell at `key`, creating the cell if absent.
    /// A no-op if `token` is already present.
    pub fn add_to_value(&self, key: &str, token: &str) -> Result<()> {
        match self.get(key)? {
            None => self.put(key, token),
            Some(cell) => {
                if Self::tokens(&cell).contains(&token) {
                    return Ok(());
                }
                self.put(key, &format!("{cell}{FIELD_SEPARATOR}{token}"))
            }
        }
    }

    /// Remove `token` from the cell at `key`.
    ///
    /// Deletes the row outright if `token` was the cell's only token.
    /// Returns whether anything changed.
    pub fn remove_from_value(&self, key: &str, token: &str) -> Result<bool> {
        match self.get(key)? {
            None => Ok(false),
            Some(cell) if cell == token => {
                self.delete(key)?;
                Ok(true)
            }
            Some(cell) => {
                let remaining: Vec<&str> = Self::tokens(&cell)
                    .into_iter()
                    .filter(|t| *t != token)
                    .collect();
                if remaining.len() == Self::tokens(&cell).len() {
                    return Ok(false);
                }
                if remaining.is_empty() {
                    self.delete(key)?;
                } else {
                    self.put(key, &remaining.join(FIELD_SEPARATOR))?;
                }
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn facade() -> StoreFacade<MemoryStore> {
        StoreFacade::new(MemoryStore::new())
    }

    #[test]
    fn add_to_value_creates_then_appends() {
        let f = facade();
        f.add_to_value("k", "a").unwrap();
        assert_eq!(f.get("k").unwrap(), Some("a".to_string()));
        f.add_to_value("k", "b").unwrap();
        assert_eq!(f.get("k").unwrap(), Some("a///b".to_string()));
    }

    #[test]
    fn add_to_value_is_idempotent() {
        let f = facade();
        f.add_to_value("k", "a").unwrap();
        f.add_to_value("k", "a").unwrap();
        assert_eq!(f.get("k").unwrap(), Some("a".to_string()));
    }

    #[test]
    fn value_contains_checks_membership() {
        let f = facade();
        f.add_to_value("k", "a").unwrap();
        f.add_to_value("k", "b").unwrap();
        assert!(f.value_contains("k", "a").unwrap());
        assert!(f.value_contains("k", "b").unwrap());
        assert!(!f.value_contains("k", "c").unwrap());
        assert!(!f.value_contains("missing", "a").unwrap());
    }

    #[test]
    fn remove_from_value_drops_row_when_last_token_removed() {
        let f = facade();
        f.add_to_value("k", "a").unwrap();
        assert!(f.remove_from_value("k", "a").unwrap());
        assert_eq!(f.get("k").unwrap(), None);
    }

    #[test]
    fn remove_from_value_rewrites_cell_when_tokens_remain() {
        let f = facade();
        f.add_to_value("k", "a").unwrap();
        f.add_to_value("k", "b").unwrap();
        f.add_to_value("k", "c").unwrap();
        assert!(f.remove_from_value("k", "b").unwrap());
        assert_eq!(f.get("k").unwrap(), Some("a///c".to_string()));
    }

    #[test]
    fn remove_from_value_reports_no_change_when_absent() {
        let f = facade();
        f.add_to_value("k", "a").unwrap();
        assert!(!f.remove_from_value("k", "z").unwrap());
        assert!(!f.remove_from_value("missing", "z").unwrap());
    }

    #[test]
    fn scan_prefix_filters_a_full_scan() {
        let f = facade();
        f.put("aa", "1").unwrap();
        f.put("ab", "2").unwrap();
        f.put("ba", "3").unwrap();
        let mut rows = f.scan_prefix("a").unwrap();
        rows.sort();
        assert_eq!(
            rows,
            vec![("aa".to_string(), "1".to_string()), ("ab".to_string(), "2".to_string())]
        );
    }
}
