//! Records: opaque field-named mappings
//!
//! A record is the unit of storage in a collection. One field is the identity
//! attribute (default `"id"`); the engines never interpret other fields
//! beyond index maintenance and predicate matching.

use crate::identity::Identity;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One record of a collection: an ordered field-name to value mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Check whether a field is present
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Set a field value, replacing any existing one
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Builder-style [`set`](Self::set)
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Remove a field, returning its value if it was present
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Merge `patch` over this record, producing the merged record
    ///
    /// Patch fields win on conflicting names; fields absent from the patch
    /// are carried over unchanged.
    pub fn merged(&self, patch: &Record) -> Record {
        let mut fields = self.fields.clone();
        for (name, value) in &patch.fields {
            fields.insert(name.clone(), value.clone());
        }
        Record { fields }
    }

    /// Read the identity stored under `identity_field`
    ///
    /// Returns None when the field is absent or holds a non-identity value.
    pub fn identity(&self, identity_field: &str) -> Option<Identity> {
        self.fields.get(identity_field).and_then(Identity::from_value)
    }

    /// Iterate fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Record {
            fields: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Record { fields }
    }
}
