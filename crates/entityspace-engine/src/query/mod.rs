//! Condition-tree search: the plain evaluator, its mapping-aware variant,
//! and the set-partition enumerator the latter is built on.

mod evaluator;
mod mapping_aware;
mod partition;

pub use evaluator::{Bindings, Evaluator};
