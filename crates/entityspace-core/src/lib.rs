//! Shared types, error taxonomy, and condition-tree model for entityspace.
//!
//! This crate has no knowledge of storage: it defines the vocabulary
//! (`EntityId`, `AttrValue`, `Condition`, `AttrSet`, `Scope`) and the error
//! taxonomy that `entityspace-storage` and `entityspace-engine` build on.

#![warn(missing_docs)]

mod attrset;
mod condition;
mod error;
mod types;

pub use attrset::{is_subset_of, AttrPair, AttrSet, Scope};
pub use condition::{Condition, Term};
pub use error::{Error, Result};
pub use types::{
    contains_invalid_token, is_literal, is_variable, variable_name, AttrValue, EntityId, ANY,
    FIELD_SEPARATOR, INVALID_TOKEN,
};
