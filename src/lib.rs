//! normdb - in-memory normalized relational data store
//!
//! normdb keeps one storage branch per record collection: an ordered
//! identity list, an identity-to-record map, secondary indexes, and
//! sequencing metadata. Writes run under a per-cycle transaction context
//! that selects copy-on-write (prior snapshots stay valid) or in-place
//! (destructive fast path within one write batch). A schema layer registers
//! collection definitions, synthesizes join-collections for many-to-many
//! relationships, and resolves the registry into an immutable accessor
//! graph for forward and backward traversal.
//!
//! # Quick Start
//!
//! ```
//! use normdb::{resolve, CollectionDef, FieldDef, Record, SchemaRegistry, TransactionContext};
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register([
//!     CollectionDef::new("authors").with_field(FieldDef::plain("name")),
//!     CollectionDef::new("books")
//!         .with_field(FieldDef::plain("title"))
//!         .with_field(FieldDef::foreign_key("author", "authors")),
//! ]);
//!
//! let schema = resolve(&registry)?;
//! let mut store = schema.empty_store();
//!
//! let tx = TransactionContext::in_place();
//! let table = schema.table("authors")?;
//! let author = table.insert(
//!     &tx,
//!     store.get_mut("authors").unwrap(),
//!     Record::new().with("name", "tolstoy"),
//! )?;
//! assert_eq!(author.identity("id"), Some(normdb::Identity::Int(0)));
//! # Ok::<(), normdb::Error>(())
//! ```
//!
//! # Architecture
//!
//! - [`normdb_core`]: values, records, identities, definitions, transaction
//!   contexts, errors
//! - [`normdb_table`]: the indexed table engine over storage branches
//! - [`normdb_schema`]: the registry and relationship-resolution engine

// Re-export the public API from the member crates
pub use normdb_core::*;
pub use normdb_schema::*;
pub use normdb_table::*;
