//! # entityspace
//!
//! An embedded entity/attribute data space over an ordered key-value store:
//! entities carry `(name, value)` attributes where a value is either a
//! literal or a reference to another entity, and a tree-structured
//! [`Condition`] query language lets a caller ask "does this entity, and
//! entities reachable from it, match this shape" without a textual query
//! parser.
//!
//! # Quick start
//!
//! ```
//! use entityspace::{AttrValue, Condition, DataSpace, EntityId, IndexProfile, SearchOptions, Term};
//!
//! # fn main() -> entityspace::Result<()> {
//! let mut ds = DataSpace::open_in_memory(IndexProfile::All);
//! let alice = EntityId::new("alice")?;
//! let bob = EntityId::new("bob")?;
//! ds.insert_entity(&alice)?;
//! ds.insert_entity(&bob)?;
//! ds.insert_attribute(&alice, "knows", &AttrValue::Ref(bob.clone()))?;
//!
//! let root = Condition::root(
//!     Term::Const("alice".to_string()),
//!     vec![Condition::leaf(Term::Const("knows".to_string()), Term::Const("bob".to_string()), vec![])],
//! );
//! assert_eq!(ds.search(&root, SearchOptions::default())?, vec![alice]);
//! # Ok(())
//! # }
//! ```
//!
//! Three primitives compose into the API above: the [`Key Codec`][codec]
//! and [`Store Facade`][facade] in `entityspace-storage`, the physical
//! schema/mutation engine/query evaluator/projector in `entityspace-engine`,
//! and the shared vocabulary (`EntityId`, `AttrValue`, `Condition`, `Scope`,
//! the error taxonomy) in `entityspace-core`. This crate only re-exports.
//!
//! [codec]: entityspace_storage::codec
//! [facade]: entityspace_storage::StoreFacade

#![warn(missing_docs)]

pub use entityspace_core::{
    is_subset_of, AttrPair, AttrSet, AttrValue, Condition, EntityId, Error, Result, Scope, Term,
    ANY, FIELD_SEPARATOR, INVALID_TOKEN,
};
pub use entityspace_engine::dataspace::{DataSpace, DataSpaceConfig, SearchOptions};
pub use entityspace_engine::projector::{AttrNode, EntityTree};
pub use entityspace_engine::schema::IndexProfile;
pub use entityspace_storage::{codec, MemoryStore, Store, StoreFacade};
