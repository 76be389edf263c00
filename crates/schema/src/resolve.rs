//! Relationship resolution
//!
//! `resolve` turns a registry into a [`ResolvedSchema`]: an immutable value
//! holding, per collection, the table engine handle and the explicit map of
//! accessor bindings. Producing a value (instead of flipping a resolved flag
//! on the definitions) makes resolution trivially idempotent: resolving the
//! same registry twice yields equal bindings, and the registry itself is
//! never touched.
//!
//! Resolution is also where configuration is validated: every relational
//! target must be registered, and two bindings deriving the same accessor
//! name on one collection fail fast instead of silently overwriting each
//! other.

use crate::accessor::{
    backward_one_name, backward_set_name, join_collection_name, join_source_field,
    join_target_field, AccessorBinding, Cardinality, Direction, Via,
};
use crate::registry::SchemaRegistry;
use normdb_core::{CollectionDef, Error, FieldKind, Identity, Record, Result};
use normdb_table::{Branch, Table};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::debug;

/// Whole-store state: one branch per collection, keyed by collection name
///
/// This is the shape the orchestrator threads through write cycles and the
/// shape accessor traversal reads from.
pub type StoreState = FxHashMap<String, Branch>;

/// Result of one accessor traversal
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// To-one traversal: the related record, if any
    One(Option<Record>),
    /// To-many traversal: the related records, in storage order
    Many(Vec<Record>),
}

/// One collection with its table handle and resolved accessor map
#[derive(Debug, Clone)]
pub struct ResolvedCollection {
    def: CollectionDef,
    table: Table,
    accessors: BTreeMap<String, AccessorBinding>,
}

impl ResolvedCollection {
    /// The collection definition
    pub fn def(&self) -> &CollectionDef {
        &self.def
    }

    /// The collection's query/storage surface
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// All accessor bindings, in name order
    pub fn accessors(&self) -> &BTreeMap<String, AccessorBinding> {
        &self.accessors
    }

    /// One binding by accessor name
    pub fn accessor(&self, name: &str) -> Option<&AccessorBinding> {
        self.accessors.get(name)
    }
}

/// The resolved relationship graph of one registry
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    collections: Vec<ResolvedCollection>,
    by_name: FxHashMap<String, usize>,
}

/// Resolve a registry into its relationship graph
///
/// Collections are processed in registry order, explicit first, then
/// synthesized join-collections. Join-collections receive only the forward
/// bindings of their two foreign keys; their far sides are reached through
/// the declared many-to-many accessors instead.
pub fn resolve(registry: &SchemaRegistry) -> Result<ResolvedSchema> {
    let mut accessors: FxHashMap<String, BTreeMap<String, AccessorBinding>> = registry
        .collections()
        .map(|def| (def.name.clone(), BTreeMap::new()))
        .collect();

    for def in registry.collections() {
        let owner = def.name.as_str();
        let owner_is_join = registry.is_join(owner);

        for field in &def.fields {
            match &field.kind {
                FieldKind::Plain => {}

                FieldKind::ForeignKey(target_ref) => {
                    let target = target_ref.resolve(owner);
                    registry.get(target)?;

                    bind(
                        &mut accessors,
                        owner,
                        field.name.clone(),
                        AccessorBinding {
                            direction: Direction::Forward,
                            cardinality: Cardinality::One,
                            target: target.to_string(),
                            via: Via::ForeignKey {
                                field: field.name.clone(),
                            },
                        },
                    )?;

                    // a join's far sides are reached through the declared
                    // many-to-many accessors, not through its raw keys
                    if !owner_is_join {
                        bind(
                            &mut accessors,
                            target,
                            backward_set_name(owner),
                            AccessorBinding {
                                direction: Direction::Backward,
                                cardinality: Cardinality::Many,
                                target: owner.to_string(),
                                via: Via::ForeignKey {
                                    field: field.name.clone(),
                                },
                            },
                        )?;
                    }
                }

                FieldKind::OneToOne(target_ref) => {
                    let target = target_ref.resolve(owner);
                    registry.get(target)?;

                    bind(
                        &mut accessors,
                        owner,
                        field.name.clone(),
                        AccessorBinding {
                            direction: Direction::Forward,
                            cardinality: Cardinality::One,
                            target: target.to_string(),
                            via: Via::ForeignKey {
                                field: field.name.clone(),
                            },
                        },
                    )?;
                    bind(
                        &mut accessors,
                        target,
                        backward_one_name(owner),
                        AccessorBinding {
                            direction: Direction::Backward,
                            cardinality: Cardinality::One,
                            target: owner.to_string(),
                            via: Via::ForeignKey {
                                field: field.name.clone(),
                            },
                        },
                    )?;
                }

                FieldKind::ManyToMany(target_ref) => {
                    let target = target_ref.resolve(owner);
                    registry.get(target)?;
                    let join = join_collection_name(owner, &field.name);
                    registry.get(&join)?;

                    bind(
                        &mut accessors,
                        owner,
                        field.name.clone(),
                        AccessorBinding {
                            direction: Direction::Forward,
                            cardinality: Cardinality::Many,
                            target: target.to_string(),
                            via: Via::Join {
                                collection: join.clone(),
                                source_field: join_source_field(owner),
                                target_field: join_target_field(target),
                            },
                        },
                    )?;
                    bind(
                        &mut accessors,
                        target,
                        backward_set_name(owner),
                        AccessorBinding {
                            direction: Direction::Backward,
                            cardinality: Cardinality::Many,
                            target: owner.to_string(),
                            via: Via::Join {
                                collection: join,
                                source_field: join_target_field(target),
                                target_field: join_source_field(owner),
                            },
                        },
                    )?;
                }
            }
        }
    }

    let mut collections = Vec::new();
    let mut by_name = FxHashMap::default();
    for def in registry.collections() {
        let bindings = accessors.remove(&def.name).unwrap_or_default();
        by_name.insert(def.name.clone(), collections.len());
        collections.push(ResolvedCollection {
            table: Table::from_def(def),
            def: def.clone(),
            accessors: bindings,
        });
    }

    Ok(ResolvedSchema {
        collections,
        by_name,
    })
}

impl ResolvedSchema {
    /// Resolved collections in registry order, explicit first
    pub fn collections(&self) -> impl Iterator<Item = &ResolvedCollection> {
        self.collections.iter()
    }

    /// One resolved collection by name
    pub fn collection(&self, name: &str) -> Result<&ResolvedCollection> {
        self.by_name
            .get(name)
            .map(|&i| &self.collections[i])
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    /// One collection's table handle by name
    pub fn table(&self, name: &str) -> Result<&Table> {
        Ok(self.collection(name)?.table())
    }

    /// Whole-store state with an empty branch per collection
    pub fn empty_store(&self) -> StoreState {
        self.collections
            .iter()
            .map(|col| (col.def.name.clone(), col.table.empty_branch()))
            .collect()
    }

    /// Traverse one accessor from `record`
    ///
    /// Total over well-formed inputs: a record without an identity, a store
    /// missing a branch, or a dangling stored key all yield an empty result.
    /// Only an unknown collection or accessor name is an error.
    pub fn follow(
        &self,
        store: &StoreState,
        collection: &str,
        record: &Record,
        accessor: &str,
    ) -> Result<Related> {
        let col = self.collection(collection)?;
        let binding = col.accessor(accessor).ok_or_else(|| Error::AccessorNotFound {
            collection: collection.to_string(),
            accessor: accessor.to_string(),
        })?;
        let target_col = self.collection(&binding.target)?;

        let related = match &binding.via {
            Via::ForeignKey { field } => match binding.direction {
                Direction::Forward => {
                    let related = record
                        .get(field)
                        .and_then(Identity::from_value)
                        .and_then(|id| store.get(&binding.target)?.get(&id).cloned());
                    Related::One(related)
                }
                Direction::Backward => {
                    let pointing = match (record.identity(&col.def.identity_field), store.get(&binding.target)) {
                        (Some(my_id), Some(branch)) => {
                            backward_matches(target_col.table(), branch, field, &my_id)
                        }
                        _ => Vec::new(),
                    };
                    match binding.cardinality {
                        Cardinality::One => Related::One(pointing.into_iter().next()),
                        Cardinality::Many => Related::Many(pointing),
                    }
                }
            },
            Via::Join {
                collection: join,
                source_field,
                target_field,
            } => {
                let join_col = self.collection(join)?;
                let related = match (
                    record.identity(&col.def.identity_field),
                    store.get(join),
                    store.get(&binding.target),
                ) {
                    (Some(my_id), Some(join_branch), Some(target_branch)) => {
                        backward_matches(join_col.table(), join_branch, source_field, &my_id)
                            .iter()
                            .filter_map(|link| link.get(target_field))
                            .filter_map(Identity::from_value)
                            .filter_map(|id| target_branch.get(&id).cloned())
                            .collect()
                    }
                    _ => Vec::new(),
                };
                Related::Many(related)
            }
        };
        Ok(related)
    }
}

/// Install one binding, rejecting an already-occupied accessor name
fn bind(
    accessors: &mut FxHashMap<String, BTreeMap<String, AccessorBinding>>,
    collection: &str,
    name: String,
    binding: AccessorBinding,
) -> Result<()> {
    debug!(collection = %collection, accessor = %name, "bind accessor");
    let map = accessors
        .get_mut(collection)
        .ok_or_else(|| Error::CollectionNotFound(collection.to_string()))?;
    if map.contains_key(&name) {
        return Err(Error::AccessorConflict {
            collection: collection.to_string(),
            accessor: name,
        });
    }
    map.insert(name, binding);
    Ok(())
}

/// Records of `branch` whose `field` stores `id`
///
/// Reads the field's index bucket when it is indexed, otherwise scans.
fn backward_matches(table: &Table, branch: &Branch, field: &str, id: &Identity) -> Vec<Record> {
    let value = id.to_value();
    if branch.indexes().covers(field) {
        table
            .ids_by_index(branch, field, &value)
            .iter()
            .filter_map(|pointing| branch.get(pointing).cloned())
            .collect()
    } else {
        table
            .all(branch)
            .into_iter()
            .filter(|row| row.get(field) == Some(&value))
            .collect()
    }
}
