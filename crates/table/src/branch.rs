//! Storage branches
//!
//! A branch is the full in-memory shape of one collection's state: the
//! ordered identity list, the identity-to-record map, the secondary indexes,
//! and the sequencing metadata.
//!
//! # Snapshot sharing
//!
//! Every interior section is `Arc`-shared. `fork()` is an O(1) handle copy;
//! the first write through a forked branch unshares only the sections it
//! touches (`Arc::make_mut`), so retained snapshots stay valid and untouched
//! substructure is shared between generations.
//!
//! # Write modes
//!
//! [`Branch::for_write`] is the single point where a transaction's
//! [`WriteMode`] is consulted. `CopyOnWrite` forks, leaving the receiver a
//! frozen snapshot; `InPlace` surrenders the branch value itself, leaving an
//! empty branch behind, so the working branch's sections stay unshared and
//! every mutation in the batch lands in place. The mutation primitives
//! themselves never branch on the mode.

use crate::index::IndexSet;
use normdb_core::{Identity, Record, TransactionContext, WriteMode};
use rustc_hash::FxHashMap;
use std::mem;
use std::sync::Arc;

/// Sequencing metadata for one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BranchMeta {
    /// Highest numeric identity ever allocated, None before the first
    ///
    /// Meaningful only for numeric auto-increment; collections using
    /// caller-supplied string identities leave it stale by design.
    pub max_id: Option<i64>,
}

/// One collection's complete storage state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Branch {
    identity_list: Arc<Vec<Identity>>,
    by_identity: Arc<FxHashMap<Identity, Record>>,
    indexes: Arc<IndexSet>,
    meta: BranchMeta,
}

impl Branch {
    /// Create an empty branch with the given index layout
    pub fn with_indexes(indexes: IndexSet) -> Self {
        Self {
            identity_list: Arc::new(Vec::new()),
            by_identity: Arc::new(FxHashMap::default()),
            indexes: Arc::new(indexes),
            meta: BranchMeta::default(),
        }
    }

    /// Cheap snapshot handle sharing all substructure with `self`
    ///
    /// The fork and the receiver diverge lazily as either side is written.
    pub fn fork(&self) -> Branch {
        self.clone()
    }

    /// Working branch for one write cycle, per the transaction's mode
    ///
    /// `CopyOnWrite` forks: the receiver remains a valid, unchanged snapshot
    /// and the returned branch unshares touched sections on write. `InPlace`
    /// takes the branch value, leaving an empty one in the slot; the caller's
    /// old reference is gone, which is exactly the destructive contract.
    pub fn for_write(&mut self, tx: &TransactionContext) -> Branch {
        match tx.mode() {
            WriteMode::CopyOnWrite => self.fork(),
            WriteMode::InPlace => mem::take(self),
        }
    }

    /// Ordered identities, insertion order preserved
    pub fn identities(&self) -> &[Identity] {
        &self.identity_list
    }

    /// Fetch a record by identity
    pub fn get(&self, id: &Identity) -> Option<&Record> {
        self.by_identity.get(id)
    }

    /// Existence check by identity
    pub fn contains(&self, id: &Identity) -> bool {
        self.by_identity.contains_key(id)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    /// Check whether the branch holds no records
    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    /// Highest numeric identity ever allocated
    pub fn max_id(&self) -> Option<i64> {
        self.meta.max_id
    }

    /// Secondary indexes
    pub fn indexes(&self) -> &IndexSet {
        &self.indexes
    }

    pub(crate) fn identity_list_mut(&mut self) -> &mut Vec<Identity> {
        Arc::make_mut(&mut self.identity_list)
    }

    pub(crate) fn by_identity_mut(&mut self) -> &mut FxHashMap<Identity, Record> {
        Arc::make_mut(&mut self.by_identity)
    }

    pub(crate) fn indexes_mut(&mut self) -> &mut IndexSet {
        Arc::make_mut(&mut self.indexes)
    }

    pub(crate) fn set_max_id(&mut self, max_id: Option<i64>) {
        self.meta.max_id = max_id;
    }
}
