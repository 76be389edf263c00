//! Secondary indexes for one collection
//!
//! An [`IndexSet`] maps each indexed field name to a value-to-identities
//! index. Buckets that become empty are removed so the maps never accumulate
//! dead entries.

use normdb_core::{Identity, IndexKey};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Identities holding one indexed value; almost always one or two
pub type IdList = SmallVec<[Identity; 2]>;

/// Value-to-identities index for one field
pub type FieldIndex = FxHashMap<IndexKey, IdList>;

/// All secondary indexes of one collection
///
/// Fields are declared up front ([`IndexSet::with_fields`]); adds and
/// removes against undeclared fields are ignored, and lookups against them
/// return empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSet {
    fields: FxHashMap<String, FieldIndex>,
}

impl IndexSet {
    /// Empty index set with no declared fields
    pub fn new() -> Self {
        Self::default()
    }

    /// Index set with an empty index per declared field
    pub fn with_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|f| (f.into(), FieldIndex::default()))
                .collect(),
        }
    }

    /// Whether `field` is a declared indexed field
    pub fn covers(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Identities holding `key` under `field`
    ///
    /// Empty when the field is undeclared or the value unseen.
    pub fn ids(&self, field: &str, key: &IndexKey) -> &[Identity] {
        self.fields
            .get(field)
            .and_then(|index| index.get(key))
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// The sole occupant of a bucket, used for unique-index checks
    pub fn occupant(&self, field: &str, key: &IndexKey) -> Option<&Identity> {
        self.fields
            .get(field)
            .and_then(|index| index.get(key))
            .and_then(|ids| ids.first())
    }

    /// Add an identity into a field's bucket for `key`
    pub fn add(&mut self, field: &str, key: IndexKey, id: Identity) {
        if let Some(index) = self.fields.get_mut(field) {
            let ids = index.entry(key).or_default();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    /// Remove an identity from a field's bucket for `key`
    ///
    /// Removes the bucket entirely once it is empty.
    pub fn remove(&mut self, field: &str, key: &IndexKey, id: &Identity) {
        if let Some(index) = self.fields.get_mut(field) {
            if let Some(ids) = index.get_mut(key) {
                ids.retain(|existing| existing != id);
                if ids.is_empty() {
                    index.remove(key);
                }
            }
        }
    }

    /// Declared field names
    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }
}
