//! Integration tests for the indexed table engine
//!
//! These tests exercise whole-branch behavior across operation sequences:
//!
//! 1. **Identity uniqueness** - the identity list never holds a duplicate and
//!    always set-equals the record map's keys
//! 2. **Index consistency** - after any operation sequence, every index
//!    bucket holds exactly the identities whose field equals the value
//! 3. **Transaction-mode equivalence** - copy-on-write and in-place cycles
//!    produce equal end states, and only copy-on-write leaves prior
//!    snapshots unmodified

use normdb_core::{CollectionDef, FieldDef, Identity, Record, TransactionContext, Value};
use normdb_table::{Branch, Table};
use proptest::prelude::*;
use std::collections::HashSet;

// ============================================================================
// Test Helpers
// ============================================================================

fn shelf_table() -> Table {
    Table::from_def(
        &CollectionDef::new("books").with_field(FieldDef::plain("shelf").with_index()),
    )
}

fn entry(shelf: i64) -> Record {
    Record::new().with("shelf", shelf)
}

/// One step of a generated operation sequence
#[derive(Debug, Clone)]
enum Op {
    Insert { shelf: i64 },
    Update { target: usize, shelf: i64 },
    Delete { target: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0i64..4).prop_map(|shelf| Op::Insert { shelf }),
        ((0usize..16), (0i64..4)).prop_map(|(target, shelf)| Op::Update { target, shelf }),
        (0usize..16).prop_map(|target| Op::Delete { target }),
    ]
}

/// Apply one op through the given transaction context
fn apply(table: &Table, tx: &TransactionContext, branch: &mut Branch, op: &Op) {
    match op {
        Op::Insert { shelf } => {
            table.insert(tx, branch, entry(*shelf)).unwrap();
        }
        Op::Update { target, shelf } => {
            let rows = table.all(branch);
            if rows.is_empty() {
                return;
            }
            let row = rows[target % rows.len()].clone();
            let patch = Record::new().with("shelf", *shelf);
            table.update(tx, branch, &[row], &patch).unwrap();
        }
        Op::Delete { target } => {
            let rows = table.all(branch);
            if rows.is_empty() {
                return;
            }
            let row = rows[target % rows.len()].clone();
            table.delete(tx, branch, &[row]).unwrap();
        }
    }
}

fn assert_identity_uniqueness(branch: &Branch) {
    let ids: Vec<&Identity> = branch.identities().iter().collect();
    let unique: HashSet<&Identity> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len(), "identity list holds a duplicate");

    assert_eq!(unique.len(), branch.len());
    for id in &unique {
        assert!(branch.contains(id), "listed identity missing from record map");
    }
}

fn assert_index_consistency(table: &Table, branch: &Branch) {
    for value in 0..4i64 {
        let value = Value::Int(value);
        let indexed: HashSet<Identity> = table
            .ids_by_index(branch, "shelf", &value)
            .into_iter()
            .collect();
        let expected: HashSet<Identity> = table
            .all(branch)
            .iter()
            .filter(|row| row.get("shelf") == Some(&value))
            .filter_map(|row| row.identity("id"))
            .collect();
        assert_eq!(indexed, expected, "index bucket for {value} diverged");
    }
}

// ============================================================================
// SECTION 1: Property Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_identity_uniqueness_under_op_sequences(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let table = shelf_table();
        let mut branch = table.empty_branch();
        let tx = TransactionContext::in_place();

        for op in &ops {
            apply(&table, &tx, &mut branch, op);
            assert_identity_uniqueness(&branch);
        }
    }

    #[test]
    fn prop_index_consistency_under_op_sequences(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let table = shelf_table();
        let mut branch = table.empty_branch();
        let tx = TransactionContext::in_place();

        for op in &ops {
            apply(&table, &tx, &mut branch, op);
            assert_index_consistency(&table, &branch);
        }
    }

    #[test]
    fn prop_transaction_modes_agree(ops in prop::collection::vec(op_strategy(), 0..30)) {
        let table = shelf_table();

        // in-place: one working branch mutated destructively
        let mut destructive = table.empty_branch();
        let in_place = TransactionContext::in_place();
        for op in &ops {
            apply(&table, &in_place, &mut destructive, op);
        }

        // copy-on-write: each op writes through a fork, retaining every
        // prior generation alongside its materialized contents
        let mut generations: Vec<(Branch, Vec<Record>)> = Vec::new();
        let mut current = table.empty_branch();
        for op in &ops {
            let tx = TransactionContext::copy_on_write();
            let mut working = current.fork();
            apply(&table, &tx, &mut working, op);
            let contents = table.all(&current);
            generations.push((current, contents));
            current = working;
        }

        // identical observable outcome across modes
        prop_assert_eq!(table.all(&destructive), table.all(&current));
        prop_assert_eq!(destructive.max_id(), current.max_id());

        // every retained snapshot is untouched
        for (snapshot, contents) in &generations {
            prop_assert_eq!(&table.all(snapshot), contents);
        }
    }
}

// ============================================================================
// SECTION 2: Snapshot Retention
// ============================================================================

#[test]
fn test_copy_on_write_cycle_keeps_prior_generation() {
    let table = shelf_table();
    let mut prior = table.empty_branch();

    let setup = TransactionContext::in_place();
    table.insert(&setup, &mut prior, entry(1)).unwrap();

    let tx = TransactionContext::copy_on_write();
    let mut working = prior.for_write(&tx);
    table.insert(&tx, &mut working, entry(2)).unwrap();
    let rows = table.all(&working);
    table
        .update(&tx, &mut working, &rows[..1], &Record::new().with("shelf", 9i64))
        .unwrap();

    // the prior generation still reads as before the cycle
    assert_eq!(prior.len(), 1);
    let old = table.get(&prior, &Identity::Int(0)).unwrap();
    assert_eq!(old.get("shelf"), Some(&Value::Int(1)));

    // the working branch carries the cycle's writes
    assert_eq!(working.len(), 2);
    let new = table.get(&working, &Identity::Int(0)).unwrap();
    assert_eq!(new.get("shelf"), Some(&Value::Int(9)));
}

#[test]
fn test_in_place_cycle_surrenders_prior_branch() {
    let table = shelf_table();
    let mut slot = table.empty_branch();

    let setup = TransactionContext::in_place();
    table.insert(&setup, &mut slot, entry(1)).unwrap();

    let tx = TransactionContext::in_place();
    let mut working = slot.for_write(&tx);
    table.insert(&tx, &mut working, entry(2)).unwrap();

    // the old slot no longer holds the data; the working branch does
    assert!(slot.is_empty());
    assert_eq!(working.len(), 2);
}

#[test]
fn test_forked_snapshots_share_until_written() {
    let table = shelf_table();
    let mut branch = table.empty_branch();
    let tx = TransactionContext::in_place();
    for shelf in 0..3 {
        table.insert(&tx, &mut branch, entry(shelf)).unwrap();
    }

    let snapshot = branch.fork();
    assert_eq!(snapshot, branch);

    table.insert(&tx, &mut branch, entry(3)).unwrap();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(branch.len(), 4);
}
