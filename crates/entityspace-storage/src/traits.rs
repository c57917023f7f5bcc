//! The `Store` abstraction: the one seam the whole engine depends on.
//!
//! Anything that can offer point get/put/delete, a full truncate, and a
//! forward scan over its entire keyspace can back an `entityspace` data
//! space. The engine never assumes more than this — no range seeks, no
//! transactions beyond whatever atomicity a single call happens to have.

use entityspace_core::Result;

/// An ordered, byte-keyed key-value store.
///
/// Implementors must be safe to hold behind a single owner for the lifetime
/// of a `DataSpace` (see the concurrency model: one logical operation at a
/// time, no reentrancy). `Send + Sync` is required so a `DataSpace` can be
/// moved across threads even though it is not used concurrently from them.
pub trait Store: Send + Sync {
    /// Point lookup. `None` if the key has no row.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Point write. Overwrites any existing value for `key`.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Point delete. A no-op if `key` has no row.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Drop every row in the store.
    fn truncate(&self) -> Result<()>;

    /// A full forward scan over every `(key, value)` row, in key order.
    ///
    /// The core has no range-seek requirement; prefix scans are built on
    /// top of this by filtering against a prefix predicate (see
    /// [`crate::facade::StoreFacade::scan_prefix`]).
    fn scan(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}
