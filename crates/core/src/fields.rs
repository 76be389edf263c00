//! Field and collection definitions
//!
//! These are the minimal declarative shapes the engines consume: each field
//! exposes a kind (plain or one of the three relational kinds), a target
//! reference for relational kinds, and index options the table engine reads
//! to decide index maintenance.
//!
//! Definitions are created at schema-definition time and never change
//! afterwards.

use serde::{Deserialize, Serialize};

/// Reference to a relationship's target collection
///
/// `SelfRef` marks self-referential relationships; it is resolved against the
/// owning collection in one central step at resolution time, never by string
/// comparison at call sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetRef {
    /// A named collection
    Collection(String),
    /// The owning collection itself
    SelfRef,
}

impl TargetRef {
    /// Resolve this reference against the owning collection's name
    pub fn resolve<'a>(&'a self, owner: &'a str) -> &'a str {
        match self {
            TargetRef::Collection(name) => name,
            TargetRef::SelfRef => owner,
        }
    }
}

impl From<&str> for TargetRef {
    fn from(name: &str) -> Self {
        TargetRef::Collection(name.to_string())
    }
}

/// What a field stores and how it relates collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Plain data field, opaque to the engines
    Plain,
    /// Stored key of one record in the target collection
    ForeignKey(TargetRef),
    /// Stored key of at most one record each direction
    OneToOne(TargetRef),
    /// Computed relation mediated by a synthesized join-collection
    ManyToMany(TargetRef),
}

impl FieldKind {
    /// Target reference, for the three relational kinds
    pub fn target(&self) -> Option<&TargetRef> {
        match self {
            FieldKind::Plain => None,
            FieldKind::ForeignKey(t) | FieldKind::OneToOne(t) | FieldKind::ManyToMany(t) => Some(t),
        }
    }
}

/// One field of a collection definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Field kind
    pub kind: FieldKind,
    /// Maintain a secondary index on this field
    pub indexed: bool,
    /// Index maps each value to at most one identity
    pub unique: bool,
}

impl FieldDef {
    /// Plain data field, unindexed
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Plain,
            indexed: false,
            unique: false,
        }
    }

    /// Foreign-key field
    ///
    /// Indexed by default: backward traversal reads the index bucket of the
    /// stored key instead of scanning the owning collection.
    pub fn foreign_key(name: impl Into<String>, target: impl Into<TargetRef>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::ForeignKey(target.into()),
            indexed: true,
            unique: false,
        }
    }

    /// One-to-one field
    ///
    /// Indexed and unique by default: at most one record each direction.
    pub fn one_to_one(name: impl Into<String>, target: impl Into<TargetRef>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::OneToOne(target.into()),
            indexed: true,
            unique: true,
        }
    }

    /// Many-to-many field
    ///
    /// Never stored on the owning record; registration synthesizes a
    /// join-collection holding the relationship.
    pub fn many_to_many(name: impl Into<String>, target: impl Into<TargetRef>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::ManyToMany(target.into()),
            indexed: false,
            unique: false,
        }
    }

    /// Builder-style index toggle
    pub fn with_index(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Builder-style unique toggle; implies an index
    pub fn with_unique(mut self) -> Self {
        self.indexed = true;
        self.unique = true;
        self
    }
}

/// Static description of one record collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDef {
    /// Collection name, unique within the registry
    pub name: String,
    /// Name of the identity attribute
    pub identity_field: String,
    /// Declared fields
    pub fields: Vec<FieldDef>,
}

/// Default identity attribute name
pub const DEFAULT_IDENTITY_FIELD: &str = "id";

impl CollectionDef {
    /// New collection definition with the default `"id"` identity attribute
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity_field: DEFAULT_IDENTITY_FIELD.to_string(),
            fields: Vec::new(),
        }
    }

    /// Override the identity attribute name
    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = field.into();
        self
    }

    /// Append one field
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a declared field by name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields the table engine maintains indexes for
    ///
    /// Many-to-many fields are excluded: they are never stored on the record,
    /// so there is nothing to index on this collection.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields
            .iter()
            .filter(|f| f.indexed && !matches!(f.kind, FieldKind::ManyToMany(_)))
    }

    /// Declared many-to-many fields
    pub fn many_to_many_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::ManyToMany(_)))
    }
}
