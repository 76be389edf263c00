//! Accessor bindings and derived names
//!
//! An accessor binding is a named, computed traversal from one record to its
//! related record(s). Bindings are plain descriptors held in an explicit
//! per-collection map built once at resolution time; the record-access layer
//! consults the map instead of injecting properties at runtime.

/// Which side of the relationship the binding traverses from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From the collection declaring the relational field
    Forward,
    /// From the relationship's target back to the declaring collection
    Backward,
}

/// How many records a traversal can yield
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one record
    One,
    /// A set of records
    Many,
}

/// What mediates the traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Via {
    /// A stored foreign-key field
    ///
    /// Forward: follow the record's stored key. Backward: collect the
    /// records whose stored key points at the record; `field` lives on the
    /// declaring collection either way.
    ForeignKey {
        /// The stored key field on the declaring collection
        field: String,
    },
    /// The join-collection of a many-to-many relationship
    ///
    /// `source_field` is matched against the traversing record's identity;
    /// `target_field` holds the identities of the related records. The two
    /// are pre-swapped for backward bindings, so traversal is one code path.
    Join {
        /// Join-collection name
        collection: String,
        /// Join field matched against the traversing record
        source_field: String,
        /// Join field naming the related records
        target_field: String,
    },
}

/// One named traversal bound on a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorBinding {
    /// Traversal side
    pub direction: Direction,
    /// Result cardinality
    pub cardinality: Cardinality,
    /// Collection the traversal lands in
    pub target: String,
    /// Mediating field or join-collection
    pub via: Via,
}

/// Backward accessor name for a foreign key out of `owner`
pub fn backward_set_name(owner: &str) -> String {
    format!("{}_set", owner.to_lowercase())
}

/// Backward accessor name for a one-to-one out of `owner`
///
/// Deliberately distinct from the foreign-key rule: the single related
/// record reads as the owner itself, not a set.
pub fn backward_one_name(owner: &str) -> String {
    owner.to_lowercase()
}

/// Deterministic join-collection name for a many-to-many field
pub fn join_collection_name(owner: &str, field: &str) -> String {
    format!("{owner}_{field}")
}

/// Source-side foreign-key field of a join-collection
pub fn join_source_field(owner: &str) -> String {
    format!("from_{owner}")
}

/// Target-side foreign-key field of a join-collection
pub fn join_target_field(target: &str) -> String {
    format!("to_{target}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backward_names_are_asymmetric() {
        assert_eq!(backward_set_name("Book"), "book_set");
        assert_eq!(backward_one_name("Book"), "book");
    }

    #[test]
    fn test_join_names_are_deterministic() {
        assert_eq!(join_collection_name("books", "genres"), "books_genres");
        assert_eq!(join_source_field("books"), "from_books");
        assert_eq!(join_target_field("genres"), "to_genres");
    }

    #[test]
    fn test_self_referential_join_sides_stay_distinct() {
        // both sides land on the owner; the prefixes keep them apart
        assert_ne!(join_source_field("employees"), join_target_field("employees"));
    }
}
