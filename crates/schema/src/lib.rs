//! Relational schema engine for normdb
//!
//! Registers collection definitions, synthesizes a hidden join-collection
//! per declared many-to-many relationship, and resolves the registry into an
//! immutable [`ResolvedSchema`]: per collection, a table handle and an
//! explicit map of accessor bindings for forward and backward traversal.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accessor;
pub mod registry;
pub mod resolve;

pub use accessor::{
    backward_one_name, backward_set_name, join_collection_name, join_source_field,
    join_target_field, AccessorBinding, Cardinality, Direction, Via,
};
pub use registry::SchemaRegistry;
pub use resolve::{resolve, Related, ResolvedCollection, ResolvedSchema, StoreState};
