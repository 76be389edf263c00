//! Identity sequencing
//!
//! Numeric identities auto-increment per collection. The counter tracks the
//! highest identity ever allocated, including caller-supplied values, so a
//! later automatic assignment never collides with an earlier explicit one.

use normdb_core::Identity;

/// Outcome of sequencing one insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequenced {
    /// Identity the new record will carry
    pub identity: Identity,
    /// Counter value after this insert
    pub max_id: Option<i64>,
}

/// Assign an identity for a new record
///
/// With no supplied value the next counter value is allocated (an absent
/// counter acts as `-1`, so the first identity is `0`). A supplied numeric
/// value is used as-is and bumps the counter to
/// `max(counter + 1, supplied)`. A supplied string value is used as-is and
/// leaves the counter stale; collections with string identities must always
/// supply them.
pub fn sequence(max_id: Option<i64>, supplied: Option<Identity>) -> Sequenced {
    let floor = max_id.unwrap_or(-1);
    match supplied {
        None => {
            let next = floor + 1;
            Sequenced {
                identity: Identity::Int(next),
                max_id: Some(next),
            }
        }
        Some(Identity::Int(value)) => Sequenced {
            identity: Identity::Int(value),
            max_id: Some((floor + 1).max(value)),
        },
        Some(id @ Identity::Str(_)) => Sequenced {
            identity: id,
            max_id,
        },
    }
}
