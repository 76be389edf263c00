//! The indexed table engine
//!
//! A [`Table`] owns one collection's behavior: identity sequencing, index
//! maintenance, query evaluation, and transaction-scoped mutations. It holds
//! no record data itself; all state lives in the [`Branch`] threaded through
//! every call, so tables are cheap, immutable descriptions that can be
//! rebuilt from a collection definition at any time.
//!
//! ## Write cycles
//!
//! Mutations expect the working branch obtained from
//! [`Branch::for_write`]: copy-on-write callers keep the prior branch as a
//! frozen snapshot and write through a fork, in-place callers surrender the
//! branch value for the cycle. The mutation bodies are identical in both
//! modes; sharing state alone decides what gets copied.
//!
//! ## Index discipline
//!
//! Every mutation keeps indexes exact: inserts add the new identity under
//! the entry's value per indexed field, updates remove the old value's entry
//! and re-add under the new value even when unchanged, deletes remove the
//! identity from every bucket it occupies. Fields absent from a record are
//! not indexed for that record.
//!
//! Unique-indexed fields reject a second identity per value with
//! [`Error::UniqueConflict`] before any part of the branch is touched. The
//! identity attribute is implicitly unique.

use crate::branch::Branch;
use crate::index::IndexSet;
use crate::query::{self, QueryClause};
use crate::sequence::sequence;
use normdb_core::{CollectionDef, Error, Identity, IndexKey, Record, Result, TransactionContext, Value};
use rustc_hash::FxHashSet;
use tracing::debug;

/// One indexed field of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Indexed field name
    pub field: String,
    /// At most one identity per value
    pub unique: bool,
}

/// Storage, indexing, and query engine for one collection
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    identity_field: String,
    indexed: Vec<IndexSpec>,
    use_index: bool,
}

impl Table {
    /// Build a table from a collection definition
    pub fn from_def(def: &CollectionDef) -> Self {
        Self {
            name: def.name.clone(),
            identity_field: def.identity_field.clone(),
            indexed: def
                .indexed_fields()
                .map(|f| IndexSpec {
                    field: f.name.clone(),
                    unique: f.unique,
                })
                .collect(),
            use_index: true,
        }
    }

    /// Disable index acceleration in query evaluation
    ///
    /// Indexes are still maintained; queries just scan the full record list
    /// instead of intersecting index buckets.
    pub fn without_index_acceleration(mut self) -> Self {
        self.use_index = false;
        self
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity attribute name
    pub fn identity_field(&self) -> &str {
        &self.identity_field
    }

    /// Indexed fields
    pub fn indexed(&self) -> &[IndexSpec] {
        &self.indexed
    }

    /// Empty branch laid out for this table's indexes
    pub fn empty_branch(&self) -> Branch {
        Branch::with_indexes(IndexSet::with_fields(
            self.indexed.iter().map(|spec| spec.field.clone()),
        ))
    }

    // ========== Reads ==========

    /// Fetch a record by identity
    pub fn get<'a>(&self, branch: &'a Branch, id: &Identity) -> Option<&'a Record> {
        branch.get(id)
    }

    /// Existence check by identity
    pub fn exists(&self, branch: &Branch, id: &Identity) -> bool {
        branch.contains(id)
    }

    /// Full record list in identity-list order
    pub fn all(&self, branch: &Branch) -> Vec<Record> {
        branch
            .identities()
            .iter()
            .filter_map(|id| branch.get(id).cloned())
            .collect()
    }

    /// Identities holding `value` under an indexed field
    ///
    /// Empty when the field is unindexed or the value unseen.
    pub fn ids_by_index(&self, branch: &Branch, field: &str, value: &Value) -> Vec<Identity> {
        branch
            .indexes()
            .ids(field, &IndexKey::from(value))
            .to_vec()
    }

    // ========== Query evaluation ==========

    /// Evaluate an ordered clause sequence
    ///
    /// Candidates come from intersecting index buckets when any filter
    /// predicate pins an indexed field (and acceleration is enabled),
    /// otherwise from the full record list. Clauses then reduce
    /// left-to-right; a filter pinning the identity attribute to a concrete
    /// value short-circuits to a direct lookup, bypassing every other
    /// clause.
    pub fn query(&self, branch: &Branch, clauses: &[QueryClause]) -> Vec<Record> {
        let mut rows = self.candidate_rows(branch, clauses);
        for clause in clauses {
            match clause {
                QueryClause::Filter(predicate) => {
                    if let Some(pinned) = predicate.pins(&self.identity_field) {
                        if let Some(id) = Identity::from_value(pinned) {
                            // primary-key fast path
                            return branch.get(&id).cloned().into_iter().collect();
                        }
                    }
                    rows.retain(|row| predicate.matches(row));
                }
                QueryClause::Exclude(predicate) => {
                    rows.retain(|row| !predicate.matches(row));
                }
                QueryClause::OrderBy(keys) => {
                    query::sort_rows(&mut rows, keys);
                }
                #[allow(unreachable_patterns)]
                _ => {
                    // unrecognized clause kinds pass rows through unchanged
                }
            }
        }
        rows
    }

    fn candidate_rows(&self, branch: &Branch, clauses: &[QueryClause]) -> Vec<Record> {
        if !self.use_index {
            return self.all(branch);
        }

        let mut candidates: Option<FxHashSet<Identity>> = None;
        for clause in clauses {
            if let QueryClause::Filter(predicate) = clause {
                for spec in &self.indexed {
                    if let Some(value) = predicate.pins(&spec.field) {
                        let bucket: FxHashSet<Identity> = branch
                            .indexes()
                            .ids(&spec.field, &IndexKey::from(value))
                            .iter()
                            .cloned()
                            .collect();
                        candidates = Some(match candidates.take() {
                            None => bucket,
                            Some(prev) => prev.intersection(&bucket).cloned().collect(),
                        });
                    }
                }
            }
        }

        match candidates {
            None => self.all(branch),
            // preserve identity-list order over the narrowed set
            Some(ids) => branch
                .identities()
                .iter()
                .filter(|id| ids.contains(*id))
                .filter_map(|id| branch.get(id).cloned())
                .collect(),
        }
    }

    // ========== Mutations ==========

    /// Insert one entry, sequencing its identity if absent
    ///
    /// Returns the finalized record with the identity attribute filled in.
    /// The branch is untouched when an identity or unique-index conflict is
    /// reported.
    pub fn insert(
        &self,
        tx: &TransactionContext,
        branch: &mut Branch,
        entry: Record,
    ) -> Result<Record> {
        let supplied = entry.identity(&self.identity_field);
        let seq = sequence(branch.max_id(), supplied);

        let mut record = entry;
        record.set(self.identity_field.clone(), seq.identity.to_value());

        if branch.contains(&seq.identity) {
            return Err(Error::UniqueConflict {
                collection: self.name.clone(),
                field: self.identity_field.clone(),
                value: seq.identity.to_string(),
            });
        }
        self.check_unique(branch, &record, &seq.identity)?;

        debug!(
            collection = %self.name,
            identity = %seq.identity,
            batch = %tx.batch(),
            "insert"
        );

        for spec in &self.indexed {
            if let Some(value) = record.get(&spec.field) {
                let key = IndexKey::from(value);
                branch.indexes_mut().add(&spec.field, key, seq.identity.clone());
            }
        }
        branch.identity_list_mut().push(seq.identity.clone());
        branch
            .by_identity_mut()
            .insert(seq.identity.clone(), record.clone());
        branch.set_max_id(seq.max_id);

        Ok(record)
    }

    /// Merge `patch` over each target row and reindex the touched fields
    ///
    /// Patch fields win on conflicting names; the identity attribute always
    /// keeps the row's identity. Rows are processed in order, so on error
    /// the working branch may already hold earlier rows' updates;
    /// copy-on-write callers simply discard it.
    pub fn update(
        &self,
        tx: &TransactionContext,
        branch: &mut Branch,
        rows: &[Record],
        patch: &Record,
    ) -> Result<()> {
        for row in rows {
            let (id, old) = self.member(branch, row)?;

            let mut merged = old.merged(patch);
            merged.set(self.identity_field.clone(), id.to_value());

            for spec in &self.indexed {
                if !spec.unique {
                    continue;
                }
                if let Some(value) = merged.get(&spec.field) {
                    let key = IndexKey::from(value);
                    if let Some(occupant) = branch.indexes().occupant(&spec.field, &key) {
                        if occupant != &id {
                            return Err(Error::UniqueConflict {
                                collection: self.name.clone(),
                                field: spec.field.clone(),
                                value: value.to_string(),
                            });
                        }
                    }
                }
            }

            debug!(
                collection = %self.name,
                identity = %id,
                batch = %tx.batch(),
                "update"
            );

            // delete-then-insert per indexed field, even when unchanged,
            // keeps the buckets exact
            for spec in &self.indexed {
                if let Some(value) = old.get(&spec.field) {
                    branch
                        .indexes_mut()
                        .remove(&spec.field, &IndexKey::from(value), &id);
                }
                if let Some(value) = merged.get(&spec.field) {
                    branch
                        .indexes_mut()
                        .add(&spec.field, IndexKey::from(value), id.clone());
                }
            }
            branch.by_identity_mut().insert(id, merged);
        }
        Ok(())
    }

    /// Remove each target row and its index entries
    pub fn delete(
        &self,
        tx: &TransactionContext,
        branch: &mut Branch,
        rows: &[Record],
    ) -> Result<()> {
        for row in rows {
            let (id, old) = self.member(branch, row)?;

            debug!(
                collection = %self.name,
                identity = %id,
                batch = %tx.batch(),
                "delete"
            );

            for spec in &self.indexed {
                if let Some(value) = old.get(&spec.field) {
                    branch
                        .indexes_mut()
                        .remove(&spec.field, &IndexKey::from(value), &id);
                }
            }
            branch.identity_list_mut().retain(|existing| existing != &id);
            branch.by_identity_mut().remove(&id);
        }
        Ok(())
    }

    /// Resolve a caller-supplied row to a current member of the branch
    fn member(&self, branch: &Branch, row: &Record) -> Result<(Identity, Record)> {
        let id = row
            .identity(&self.identity_field)
            .ok_or_else(|| self.missing_row(row))?;
        let old = branch
            .get(&id)
            .cloned()
            .ok_or_else(|| self.missing_row(row))?;
        Ok((id, old))
    }

    fn missing_row(&self, row: &Record) -> Error {
        Error::MissingRow {
            collection: self.name.clone(),
            identity: row
                .get(&self.identity_field)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<none>".to_string()),
        }
    }

    fn check_unique(&self, branch: &Branch, record: &Record, id: &Identity) -> Result<()> {
        for spec in &self.indexed {
            if !spec.unique {
                continue;
            }
            if let Some(value) = record.get(&spec.field) {
                let key = IndexKey::from(value);
                if let Some(occupant) = branch.indexes().occupant(&spec.field, &key) {
                    if occupant != id {
                        return Err(Error::UniqueConflict {
                            collection: self.name.clone(),
                            field: spec.field.clone(),
                            value: value.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Predicate, SortKey};
    use normdb_core::{CollectionDef, FieldDef};

    fn books_table() -> Table {
        Table::from_def(
            &CollectionDef::new("books")
                .with_field(FieldDef::plain("title"))
                .with_field(FieldDef::plain("shelf").with_index())
                .with_field(FieldDef::plain("isbn").with_unique()),
        )
    }

    fn book(title: &str, shelf: i64) -> Record {
        Record::new().with("title", title).with("shelf", shelf)
    }

    fn insert_all(table: &Table, branch: &mut Branch, entries: Vec<Record>) -> Vec<Record> {
        let tx = TransactionContext::in_place();
        entries
            .into_iter()
            .map(|entry| table.insert(&tx, branch, entry).unwrap())
            .collect()
    }

    // ========================================
    // Sequencing
    // ========================================

    #[test]
    fn test_insert_sequences_from_zero() {
        let table = books_table();
        let mut branch = table.empty_branch();
        let tx = TransactionContext::in_place();

        let first = table.insert(&tx, &mut branch, book("a", 1)).unwrap();
        assert_eq!(first.identity("id"), Some(Identity::Int(0)));

        for expected in 1..4 {
            let rec = table.insert(&tx, &mut branch, book("x", 1)).unwrap();
            assert_eq!(rec.identity("id"), Some(Identity::Int(expected)));
        }
    }

    #[test]
    fn test_explicit_identity_bumps_sequence() {
        let table = books_table();
        let mut branch = table.empty_branch();
        let tx = TransactionContext::in_place();

        table.insert(&tx, &mut branch, book("a", 1)).unwrap();
        table
            .insert(&tx, &mut branch, book("b", 1).with("id", 10i64))
            .unwrap();

        let next = table.insert(&tx, &mut branch, book("c", 1)).unwrap();
        assert_eq!(next.identity("id"), Some(Identity::Int(11)));
    }

    #[test]
    fn test_string_identities_are_caller_supplied() {
        let table = Table::from_def(&CollectionDef::new("files"));
        let mut branch = table.empty_branch();
        let tx = TransactionContext::in_place();

        let rec = table
            .insert(&tx, &mut branch, Record::new().with("id", "ext-1"))
            .unwrap();
        assert_eq!(rec.identity("id"), Some(Identity::Str("ext-1".into())));
        assert_eq!(branch.max_id(), None);
    }

    #[test]
    fn test_duplicate_identity_conflicts() {
        let table = books_table();
        let mut branch = table.empty_branch();
        let tx = TransactionContext::in_place();

        table
            .insert(&tx, &mut branch, book("a", 1).with("id", 5i64))
            .unwrap();
        let err = table
            .insert(&tx, &mut branch, book("b", 1).with("id", 5i64))
            .unwrap_err();
        assert!(matches!(err, Error::UniqueConflict { ref field, .. } if field == "id"));
        assert_eq!(branch.len(), 1);
    }

    // ========================================
    // Index consistency
    // ========================================

    #[test]
    fn test_insert_populates_indexes() {
        let table = books_table();
        let mut branch = table.empty_branch();
        insert_all(&table, &mut branch, vec![book("a", 1), book("b", 1), book("c", 2)]);

        assert_eq!(
            table.ids_by_index(&branch, "shelf", &Value::Int(1)),
            vec![Identity::Int(0), Identity::Int(1)]
        );
        assert_eq!(
            table.ids_by_index(&branch, "shelf", &Value::Int(2)),
            vec![Identity::Int(2)]
        );
        assert!(table.ids_by_index(&branch, "shelf", &Value::Int(9)).is_empty());
        assert!(table.ids_by_index(&branch, "title", &Value::from("a")).is_empty());
    }

    #[test]
    fn test_update_moves_index_entries() {
        let table = books_table();
        let mut branch = table.empty_branch();
        let rows = insert_all(&table, &mut branch, vec![book("a", 1), book("b", 1)]);

        let tx = TransactionContext::in_place();
        let patch = Record::new().with("shelf", 3i64);
        table.update(&tx, &mut branch, &rows[..1], &patch).unwrap();

        assert_eq!(
            table.ids_by_index(&branch, "shelf", &Value::Int(1)),
            vec![Identity::Int(1)]
        );
        assert_eq!(
            table.ids_by_index(&branch, "shelf", &Value::Int(3)),
            vec![Identity::Int(0)]
        );
        let updated = table.get(&branch, &Identity::Int(0)).unwrap();
        assert_eq!(updated.get("shelf"), Some(&Value::Int(3)));
        assert_eq!(updated.get("title"), Some(&Value::from("a")));
    }

    #[test]
    fn test_update_preserves_identity_attribute() {
        let table = books_table();
        let mut branch = table.empty_branch();
        let rows = insert_all(&table, &mut branch, vec![book("a", 1)]);

        let tx = TransactionContext::in_place();
        let patch = Record::new().with("id", 99i64);
        table.update(&tx, &mut branch, &rows, &patch).unwrap();

        assert!(table.exists(&branch, &Identity::Int(0)));
        assert!(!table.exists(&branch, &Identity::Int(99)));
    }

    #[test]
    fn test_delete_clears_indexes_and_rows() {
        let table = books_table();
        let mut branch = table.empty_branch();
        let rows = insert_all(&table, &mut branch, vec![book("a", 1), book("b", 1)]);

        let tx = TransactionContext::in_place();
        table.delete(&tx, &mut branch, &rows[..1]).unwrap();

        assert_eq!(branch.len(), 1);
        assert_eq!(branch.identities(), &[Identity::Int(1)]);
        assert_eq!(
            table.ids_by_index(&branch, "shelf", &Value::Int(1)),
            vec![Identity::Int(1)]
        );
    }

    // ========================================
    // Unique index policy
    // ========================================

    #[test]
    fn test_unique_insert_conflicts() {
        let table = books_table();
        let mut branch = table.empty_branch();
        let tx = TransactionContext::in_place();

        table
            .insert(&tx, &mut branch, book("a", 1).with("isbn", "x-1"))
            .unwrap();
        let err = table
            .insert(&tx, &mut branch, book("b", 2).with("isbn", "x-1"))
            .unwrap_err();

        match err {
            Error::UniqueConflict { collection, field, .. } => {
                assert_eq!(collection, "books");
                assert_eq!(field, "isbn");
            }
            other => panic!("expected UniqueConflict, got {other:?}"),
        }
        // failed insert left the branch untouched
        assert_eq!(branch.len(), 1);
        assert_eq!(branch.max_id(), Some(0));
    }

    #[test]
    fn test_unique_update_conflicts() {
        let table = books_table();
        let mut branch = table.empty_branch();
        let tx = TransactionContext::in_place();

        table
            .insert(&tx, &mut branch, book("a", 1).with("isbn", "x-1"))
            .unwrap();
        let second = table
            .insert(&tx, &mut branch, book("b", 2).with("isbn", "x-2"))
            .unwrap();

        let patch = Record::new().with("isbn", "x-1");
        let err = table.update(&tx, &mut branch, &[second], &patch).unwrap_err();
        assert!(matches!(err, Error::UniqueConflict { ref field, .. } if field == "isbn"));
    }

    #[test]
    fn test_unique_update_to_same_value_is_allowed() {
        let table = books_table();
        let mut branch = table.empty_branch();
        let tx = TransactionContext::in_place();

        let rec = table
            .insert(&tx, &mut branch, book("a", 1).with("isbn", "x-1"))
            .unwrap();
        let patch = Record::new().with("isbn", "x-1").with("title", "a2");
        table.update(&tx, &mut branch, &[rec], &patch).unwrap();

        assert_eq!(
            table.ids_by_index(&branch, "isbn", &Value::from("x-1")),
            vec![Identity::Int(0)]
        );
    }

    // ========================================
    // Missing-row preconditions
    // ========================================

    #[test]
    fn test_update_missing_row_fails() {
        let table = books_table();
        let mut branch = table.empty_branch();
        let tx = TransactionContext::in_place();

        let ghost = Record::new().with("id", 7i64);
        let err = table
            .update(&tx, &mut branch, &[ghost], &Record::new())
            .unwrap_err();
        assert!(matches!(err, Error::MissingRow { .. }));
    }

    #[test]
    fn test_delete_unidentified_row_fails() {
        let table = books_table();
        let mut branch = table.empty_branch();
        let tx = TransactionContext::in_place();

        let err = table
            .delete(&tx, &mut branch, &[Record::new().with("title", "t")])
            .unwrap_err();
        assert!(matches!(err, Error::MissingRow { .. }));
    }

    // ========================================
    // Query evaluation
    // ========================================

    #[test]
    fn test_query_filter_and_exclude() {
        let table = books_table();
        let mut branch = table.empty_branch();
        insert_all(
            &table,
            &mut branch,
            vec![book("a", 1), book("b", 1), book("c", 2)],
        );

        let rows = table.query(
            &branch,
            &[
                QueryClause::Filter(Predicate::new().with("shelf", 1i64)),
                QueryClause::Exclude(Predicate::new().with("title", "a")),
            ],
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("title"), Some(&Value::from("b")));
    }

    #[test]
    fn test_query_order_by() {
        let table = books_table();
        let mut branch = table.empty_branch();
        insert_all(
            &table,
            &mut branch,
            vec![book("b", 2), book("a", 1), book("c", 3)],
        );

        let rows = table.query(&branch, &[QueryClause::OrderBy(vec![SortKey::desc("shelf")])]);
        let shelves: Vec<i64> = rows
            .iter()
            .map(|r| r.get("shelf").unwrap().as_int().unwrap())
            .collect();
        assert_eq!(shelves, vec![3, 2, 1]);
    }

    #[test]
    fn test_query_identity_fast_path() {
        let table = books_table();
        let mut branch = table.empty_branch();
        insert_all(&table, &mut branch, vec![book("a", 1), book("b", 2)]);

        // surrounding clauses are bypassed entirely
        let rows = table.query(
            &branch,
            &[
                QueryClause::Exclude(Predicate::new().with("title", "b")),
                QueryClause::Filter(Predicate::new().with("id", 1i64)),
                QueryClause::OrderBy(vec![SortKey::asc("title")]),
            ],
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("title"), Some(&Value::from("b")));

        let rows = table.query(
            &branch,
            &[QueryClause::Filter(Predicate::new().with("id", 99i64))],
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn test_query_uses_index_candidates() {
        let table = books_table();
        let mut branch = table.empty_branch();
        insert_all(
            &table,
            &mut branch,
            vec![book("a", 1), book("b", 1), book("c", 2)],
        );

        // indexed predicate narrows candidates; unindexed evaluation agrees
        let indexed = table.query(
            &branch,
            &[QueryClause::Filter(Predicate::new().with("shelf", 1i64))],
        );
        let scanned = table.clone().without_index_acceleration().query(
            &branch,
            &[QueryClause::Filter(Predicate::new().with("shelf", 1i64))],
        );
        assert_eq!(indexed, scanned);
        assert_eq!(indexed.len(), 2);
    }

    #[test]
    fn test_query_empty_clauses_returns_all_in_order() {
        let table = books_table();
        let mut branch = table.empty_branch();
        insert_all(&table, &mut branch, vec![book("a", 1), book("b", 2)]);

        let rows = table.query(&branch, &[]);
        let titles: Vec<&str> = rows
            .iter()
            .map(|r| r.get("title").unwrap().as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["a", "b"]);
    }
}
