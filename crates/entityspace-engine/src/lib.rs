//! Physical schema, mutation engine, query evaluator, mapping-aware
//! evaluator, and result projector for entityspace.
//!
//! This crate is where the logical data model in `entityspace-core` meets
//! an actual [`entityspace_storage::Store`]: [`schema`] maps tables to
//! keys, [`mutation`] and [`query`] are the only code that reads or writes
//! them, and [`projector`] turns a matched id back into a tree for the
//! caller. [`dataspace::DataSpace`] is the facade gluing all four together
//! behind the public API.

#![warn(missing_docs)]

pub mod dataspace;
pub mod mutation;
pub mod projector;
pub mod query;
pub mod schema;

pub use dataspace::{DataSpace, DataSpaceConfig};
pub use projector::EntityTree;
pub use schema::IndexProfile;
