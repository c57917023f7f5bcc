//! Error taxonomy for entityspace
//!
//! `Error` is the single error type returned by every fallible operation
//! across the `entityspace-core`, `entityspace-storage`, and
//! `entityspace-engine` crates. Each variant corresponds to one outcome kind
//! from the error handling design: not a human-readable message format, a
//! stable thing callers can match on.

use std::fmt;
use thiserror::Error;

/// Result type alias used throughout entityspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for entityspace operations.
///
/// ## Categories
///
/// - **Input validation**: [`Error::InvalidInput`]
/// - **Entity lifecycle**: [`Error::EntityExists`], [`Error::NoEntity`]
/// - **Attribute lifecycle**: [`Error::AttributeExists`], [`Error::NoAttribute`]
/// - **Mapping lifecycle**: [`Error::MappingExists`], [`Error::NoMapping`]
/// - **Store lifecycle**: [`Error::StoreOpen`]
#[derive(Debug, Error)]
pub enum Error {
    /// A user-supplied id, name, or value contained the reserved invalid
    /// token, or an argument had the wrong shape for the operation (e.g. a
    /// mapping call given a condition tree where an `AttrSet` was expected).
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of what was wrong with the input.
        message: String,
    },

    /// `insert_entity` was called for an id that already has a row in the
    /// primary store.
    #[error("entity already exists: {id}")]
    EntityExists {
        /// The id that already exists.
        id: String,
    },

    /// An operation referenced an entity id that is not present.
    #[error("no such entity: {id}")]
    NoEntity {
        /// The id that was not found.
        id: String,
    },

    /// `insert_attribute` was called for a triple that is already stored.
    #[error("attribute already exists: {owner} {name} {value}")]
    AttributeExists {
        /// Owning entity id.
        owner: String,
        /// Attribute name.
        name: String,
        /// Attribute value, in its external (quoted-or-bare) form.
        value: String,
    },

    /// `delete_attribute` (or a mapping op validating attribute existence)
    /// found no matching attribute.
    #[error("no such attribute: {owner} {name}")]
    NoAttribute {
        /// Owning entity id.
        owner: String,
        /// Attribute name (may be the wildcard token).
        name: String,
    },

    /// `insert_mapping` was called with a synonym already recorded for the
    /// given `(scope, original)`.
    #[error("mapping already exists for scope {scope}")]
    MappingExists {
        /// The scope the mapping is recorded under.
        scope: String,
    },

    /// `delete_mapping` found no matching mapping row.
    #[error("no such mapping for scope {scope}")]
    NoMapping {
        /// The scope that was searched.
        scope: String,
    },

    /// The underlying key-value namespace could not be opened.
    #[error("failed to open store: {message}")]
    StoreOpen {
        /// Description of the failure.
        message: String,
    },
}

impl Error {
    /// Build an [`Error::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput {
            message: message.into(),
        }
    }

    /// Build an [`Error::EntityExists`].
    pub fn entity_exists(id: impl fmt::Display) -> Self {
        Error::EntityExists { id: id.to_string() }
    }

    /// Build an [`Error::NoEntity`].
    pub fn no_entity(id: impl fmt::Display) -> Self {
        Error::NoEntity { id: id.to_string() }
    }

    /// Build an [`Error::AttributeExists`].
    pub fn attribute_exists(
        owner: impl fmt::Display,
        name: impl fmt::Display,
        value: impl fmt::Display,
    ) -> Self {
        Error::AttributeExists {
            owner: owner.to_string(),
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Build an [`Error::NoAttribute`].
    pub fn no_attribute(owner: impl fmt::Display, name: impl fmt::Display) -> Self {
        Error::NoAttribute {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    /// Build an [`Error::MappingExists`].
    pub fn mapping_exists(scope: impl fmt::Display) -> Self {
        Error::MappingExists {
            scope: scope.to_string(),
        }
    }

    /// Build an [`Error::NoMapping`].
    pub fn no_mapping(scope: impl fmt::Display) -> Self {
        Error::NoMapping {
            scope: scope.to_string(),
        }
    }

    /// Build an [`Error::StoreOpen`].
    pub fn store_open(message: impl Into<String>) -> Self {
        Error::StoreOpen {
            message: message.into(),
        }
    }

    /// True for errors raised because of something the *caller* did wrong
    /// (bad input, operating on an id/triple/mapping that isn't there or is
    /// already there) as opposed to an infrastructure failure.
    ///
    /// Useful for deciding whether to log at `warn` (caller mistake) or
    /// `error` (store failure).
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, Error::StoreOpen { .. })
    }

    /// True for the "absent" family: [`Error::NoEntity`], [`Error::NoAttribute`],
    /// [`Error::NoMapping`].
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NoEntity { .. } | Error::NoAttribute { .. } | Error::NoMapping { .. }
        )
    }

    /// True for the "already present" family: [`Error::EntityExists`],
    /// [`Error::AttributeExists`], [`Error::MappingExists`].
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            Error::EntityExists { .. } | Error::AttributeExists { .. } | Error::MappingExists { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_displays_message() {
        let err = Error::invalid_input("contains reserved token");
        assert!(err.to_string().contains("contains reserved token"));
        assert!(err.is_caller_error());
    }

    #[test]
    fn not_found_classification() {
        assert!(Error::no_entity("e1").is_not_found());
        assert!(Error::no_attribute("e1", "k").is_not_found());
        assert!(Error::no_mapping("e1").is_not_found());
        assert!(!Error::entity_exists("e1").is_not_found());
    }

    #[test]
    fn already_exists_classification() {
        assert!(Error::entity_exists("e1").is_already_exists());
        assert!(Error::attribute_exists("e1", "k", "\"v\"").is_already_exists());
        assert!(Error::mapping_exists("e1").is_already_exists());
        assert!(!Error::no_entity("e1").is_already_exists());
    }

    #[test]
    fn store_open_is_not_a_caller_error() {
        let err = Error::store_open("namespace locked");
        assert!(!err.is_caller_error());
    }
}
