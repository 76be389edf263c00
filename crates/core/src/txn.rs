//! Transaction contexts
//!
//! A transaction context describes one write cycle's execution mode. It is
//! created once per external write, threaded through every table operation in
//! that cycle, and discarded afterwards.
//!
//! The context that matters here is temporal, not parallel: `InPlace` is
//! valid only because the orchestrator guarantees no other reader or writer
//! observes the branch mid-cycle, while `CopyOnWrite` guarantees the branch
//! passed in stays a valid snapshot after the call returns.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque handle identifying one write batch
///
/// Scopes structural-sharing decisions to a single write cycle. Two contexts
/// never share a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchToken(Uuid);

impl BatchToken {
    /// Create a fresh batch token
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How mutations touch the branch they are given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    /// Produce a new branch sharing untouched substructure with the old one;
    /// the old branch remains a valid, unchanged snapshot.
    CopyOnWrite,
    /// Apply changes destructively to the working branch. Prior references
    /// into it are no longer reliable snapshots.
    InPlace,
}

/// Per-write-cycle descriptor threading batch identity and write mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionContext {
    batch: BatchToken,
    mode: WriteMode,
}

impl TransactionContext {
    /// Create a context with a fresh batch token
    pub fn new(mode: WriteMode) -> Self {
        Self {
            batch: BatchToken::new(),
            mode,
        }
    }

    /// Context for a snapshot-preserving write cycle
    pub fn copy_on_write() -> Self {
        Self::new(WriteMode::CopyOnWrite)
    }

    /// Context for a destructive in-place write cycle
    pub fn in_place() -> Self {
        Self::new(WriteMode::InPlace)
    }

    /// This cycle's batch token
    pub fn batch(&self) -> BatchToken {
        self.batch
    }

    /// This cycle's write mode
    pub fn mode(&self) -> WriteMode {
        self.mode
    }
}
