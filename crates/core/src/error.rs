//! Error types for normdb
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Read misses are never errors: lookups by identity or by index value return
//! `Option`/empty collections. Errors are reserved for configuration mistakes
//! (unknown collection, accessor collisions) and strict write preconditions
//! (unique-index conflicts, mutating absent rows).

use thiserror::Error;

/// Result type alias for normdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the normdb engines
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Referenced a collection that was never registered.
    ///
    /// Always a setup/configuration bug, so this surfaces as a hard error
    /// instead of an empty result.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// A second identity was inserted under a value already held by a
    /// unique-indexed field.
    #[error("unique index conflict on {collection}.{field} for value {value}")]
    UniqueConflict {
        /// Collection the violated index belongs to
        collection: String,
        /// The unique-indexed field
        field: String,
        /// Rendered field value that already holds an identity
        value: String,
    },

    /// Two relationship bindings derived the same accessor name on one
    /// collection.
    #[error("accessor `{accessor}` already bound on collection `{collection}`")]
    AccessorConflict {
        /// Collection carrying the colliding binding
        collection: String,
        /// The accessor name both bindings derived
        accessor: String,
    },

    /// Asked to traverse an accessor that resolution never bound.
    #[error("accessor `{accessor}` not bound on collection `{collection}`")]
    AccessorNotFound {
        /// Collection the traversal started from
        collection: String,
        /// The unknown accessor name
        accessor: String,
    },

    /// Update/delete named a row whose identity is not present in the branch.
    #[error("row {identity} not present in collection `{collection}`")]
    MissingRow {
        /// Collection the branch belongs to
        collection: String,
        /// Rendered identity of the absent row
        identity: String,
    },
}
