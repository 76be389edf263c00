//! Collection registry
//!
//! The registry holds the ordered list of explicitly registered collection
//! definitions and the join-collections synthesized from their many-to-many
//! fields. Synthesized definitions are first-class collections for storage
//! purposes but never appear in the explicit list.

use crate::accessor::{join_collection_name, join_source_field, join_target_field};
use normdb_core::{CollectionDef, Error, FieldDef, Result};
use tracing::debug;

/// A synthesized join-collection, tagged with the collection that declared it
#[derive(Debug, Clone, PartialEq, Eq)]
struct JoinEntry {
    owner: String,
    def: CollectionDef,
}

/// Ordered registry of explicit and synthesized collection definitions
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    explicit: Vec<CollectionDef>,
    implicit: Vec<JoinEntry>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one or more collection definitions
    ///
    /// Re-registering a name replaces the prior definition in place and
    /// drops the join-collections previously synthesized for it, so derived
    /// data never goes stale. Each many-to-many field synthesizes exactly
    /// one join-collection with two indexed foreign-key fields.
    pub fn register<I>(&mut self, defs: I)
    where
        I: IntoIterator<Item = CollectionDef>,
    {
        for def in defs {
            // invalidate derived data from any prior registration
            self.implicit.retain(|join| join.owner != def.name);

            for field in def.many_to_many_fields() {
                let target = field
                    .kind
                    .target()
                    .map(|t| t.resolve(&def.name))
                    .unwrap_or(&def.name);
                let join_name = join_collection_name(&def.name, &field.name);
                debug!(owner = %def.name, field = %field.name, join = %join_name, "synthesize join-collection");

                let join = CollectionDef::new(join_name)
                    .with_field(FieldDef::foreign_key(join_source_field(&def.name), def.name.as_str()))
                    .with_field(FieldDef::foreign_key(join_target_field(target), target));
                self.implicit.push(JoinEntry {
                    owner: def.name.clone(),
                    def: join,
                });
            }

            match self.explicit.iter_mut().find(|existing| existing.name == def.name) {
                Some(existing) => *existing = def,
                None => self.explicit.push(def),
            }
        }
    }

    /// Look up a collection definition by name, explicit first
    ///
    /// Referencing an unregistered collection is always a configuration
    /// mistake, so a miss is a hard error.
    pub fn get(&self, name: &str) -> Result<&CollectionDef> {
        self.explicit
            .iter()
            .find(|def| def.name == name)
            .or_else(|| {
                self.implicit
                    .iter()
                    .map(|join| &join.def)
                    .find(|def| def.name == name)
            })
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    /// All definitions in resolution order: explicit, then synthesized
    pub fn collections(&self) -> impl Iterator<Item = &CollectionDef> {
        self.explicit
            .iter()
            .chain(self.implicit.iter().map(|join| &join.def))
    }

    /// Explicitly registered definitions only
    pub fn explicit(&self) -> &[CollectionDef] {
        &self.explicit
    }

    /// Synthesized join-collection definitions only
    pub fn joins(&self) -> impl Iterator<Item = &CollectionDef> {
        self.implicit.iter().map(|join| &join.def)
    }

    /// Whether `name` is a synthesized join-collection
    pub fn is_join(&self, name: &str) -> bool {
        self.implicit.iter().any(|join| join.def.name == name)
    }
}
