//! Value types for normdb
//!
//! This module defines:
//! - Value: unified enum for all record field data
//! - IndexKey: total, hashable, ordered projection of Value used for index
//!   buckets and sort keys
//!
//! ## Value model
//!
//! The Value enum has exactly 7 variants:
//! - Null, Bool, Int, Float, String, Array, Object
//!
//! Type rules:
//! - No implicit type coercions
//! - `Int(1) != Float(1.0)` - different types are NEVER equal
//! - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
//! - Object uses an ordered map so every projection is deterministic

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical normdb value type for record fields
///
/// Different types are NEVER equal, even if they contain the same "value":
/// `Int(1) != Float(1.0)`.
///
/// Float equality follows IEEE-754 semantics:
/// - `NaN != NaN`
/// - `-0.0 == 0.0`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Array of values
    Array(Vec<Value>),
    /// Object with string keys, ordered for deterministic projection
    Object(BTreeMap<String, Value>),
}

// Custom PartialEq implementation for IEEE-754 float semantics
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // IEEE-754: NaN != NaN, -0.0 == 0.0
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            // Different types are NEVER equal
            _ => false,
        }
    }
}

impl Value {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the integer value, if this is an Int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the string slice, if this is a String
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Total, hashable, ordered projection of a [`Value`]
///
/// Index buckets and sort keys need `Eq + Hash + Ord`, which `Value` cannot
/// provide directly because of `f64`. IndexKey maps floats through a
/// monotone bit representation so numeric order is preserved, and keeps the
/// no-coercion rule: `Int(1)` and `Float(1.0)` project to different keys.
///
/// Cross-type ordering follows variant order:
/// Null < Bool < Int < Float < String < Array < Object.
///
/// Unlike `Value` equality, `NaN` projects to a key equal to itself, so NaN
/// field values still land in exactly one index bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKey {
    /// Projection of `Value::Null`
    Null,
    /// Projection of `Value::Bool`
    Bool(bool),
    /// Projection of `Value::Int`
    Int(i64),
    /// Projection of `Value::Float`, as order-preserving bits
    Float(u64),
    /// Projection of `Value::String`
    Str(String),
    /// Projection of `Value::Array`, element-wise
    Array(Vec<IndexKey>),
    /// Projection of `Value::Object`, as ordered entries
    Object(Vec<(String, IndexKey)>),
}

/// Map an f64 to bits whose unsigned order matches IEEE-754 total order
fn ordered_float_bits(f: f64) -> u64 {
    let bits = f.to_bits();
    if bits >> 63 == 1 {
        // negative: flip all bits so more-negative sorts first
        !bits
    } else {
        // non-negative: set the sign bit so positives sort after negatives
        bits | (1 << 63)
    }
}

impl From<&Value> for IndexKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => IndexKey::Null,
            Value::Bool(b) => IndexKey::Bool(*b),
            Value::Int(i) => IndexKey::Int(*i),
            Value::Float(f) => IndexKey::Float(ordered_float_bits(*f)),
            Value::String(s) => IndexKey::Str(s.clone()),
            Value::Array(items) => IndexKey::Array(items.iter().map(IndexKey::from).collect()),
            Value::Object(entries) => IndexKey::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), IndexKey::from(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}
