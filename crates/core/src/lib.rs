//! Core types for normdb
//!
//! This crate defines the foundational types used throughout the system:
//! - Identity: unique record identifier within one collection
//! - Value / IndexKey: field data and its ordered, hashable projection
//! - Record: opaque field-named mapping
//! - FieldDef / CollectionDef: the declarative shapes the engines consume
//! - BatchToken / WriteMode / TransactionContext: per-write-cycle descriptors
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod fields;
pub mod identity;
pub mod record;
pub mod txn;
pub mod value;

// Re-export commonly used types
pub use error::{Error, Result};
pub use fields::{CollectionDef, FieldDef, FieldKind, TargetRef, DEFAULT_IDENTITY_FIELD};
pub use identity::Identity;
pub use record::Record;
pub use txn::{BatchToken, TransactionContext, WriteMode};
pub use value::{IndexKey, Value};
