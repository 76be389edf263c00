//! Query clauses and predicate matching
//!
//! A query is an ordered sequence of clauses reduced left-to-right over a
//! candidate row set by [`Table::query`](crate::Table::query). This module
//! holds the clause vocabulary, partial-field predicates, and the stable
//! multi-key sort.

use normdb_core::{IndexKey, Record, Value};
use std::collections::BTreeMap;

/// Partial-field predicate: a row matches when every predicate field equals
/// the row's field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    fields: BTreeMap<String, Value>,
}

impl Predicate {
    /// Empty predicate; matches every row
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field constraint
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Whether `row` satisfies every constraint
    pub fn matches(&self, row: &Record) -> bool {
        self.fields
            .iter()
            .all(|(field, value)| row.get(field) == Some(value))
    }

    /// The concrete value this predicate pins `field` to, if any
    pub fn pins(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Constrained field names
    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Whether the predicate constrains nothing
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Record> for Predicate {
    fn from(record: Record) -> Self {
        Self {
            fields: record
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Per-key sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// One field selector of an order-by clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Field to sort by
    pub field: String,
    /// Direction for this key
    pub direction: SortDirection,
}

impl SortKey {
    /// Ascending sort on `field`
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending sort on `field`
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// One clause of a query
///
/// Clause kinds the evaluator does not recognize pass rows through
/// unchanged; the enum is non-exhaustive so new kinds can be added without
/// breaking evaluation.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum QueryClause {
    /// Keep rows matching the predicate
    Filter(Predicate),
    /// Drop rows matching the predicate
    Exclude(Predicate),
    /// Stable re-sort by the given keys
    OrderBy(Vec<SortKey>),
}

/// Stable multi-key sort over `rows`
///
/// Fields are compared through their [`IndexKey`] projection; a missing
/// field sorts as null, before every present value.
pub(crate) fn sort_rows(rows: &mut [Record], keys: &[SortKey]) {
    rows.sort_by(|a, b| {
        for key in keys {
            let ka = a.get(&key.field).map(IndexKey::from).unwrap_or(IndexKey::Null);
            let kb = b.get(&key.field).map(IndexKey::from).unwrap_or(IndexKey::Null);
            let ordering = match key.direction {
                SortDirection::Ascending => ka.cmp(&kb),
                SortDirection::Descending => kb.cmp(&ka),
            };
            if !ordering.is_eq() {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}
