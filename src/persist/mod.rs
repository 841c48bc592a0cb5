/// SQLite-backed journal sink and loader.
pub mod sqlite;

use thiserror::Error;

use crate::{
    core::store::{StoreError, StoreSnapshotV1},
    op::StoredOp,
    types::OpSeq,
};

/// Failures surfaced by journal sinks and loaders.
#[derive(Debug, Error)]
pub enum PersistError {
    /// SQLite-level failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Payload encode or decode failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The store rejected a replayed operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Free-form sink failure.
    #[error("{0}")]
    Message(String),
}

/// Shorthand for persistence results.
pub type PersistResult<T> = Result<T, PersistError>;

/// Destination for journaled operations and snapshots.
///
/// Only [`OpSink::append_ops`] is required; in-memory sinks can leave the
/// durability hooks as no-ops.
pub trait OpSink: Send {
    /// Appends a batch of operations, returning the highest durable seq.
    fn append_ops(&mut self, ops: &[StoredOp]) -> PersistResult<OpSeq>;

    /// Forces buffered writes to durable storage.
    fn flush(&mut self) -> PersistResult<()> {
        Ok(())
    }

    /// Records a full-state snapshot covering ops up to `last_seq`.
    fn write_snapshot(&mut self, _snapshot: &StoreSnapshotV1, _last_seq: OpSeq) -> PersistResult<()> {
        Ok(())
    }

    /// Drops journaled ops at or below `seq`, returning how many went.
    fn compact_through(&mut self, _seq: OpSeq) -> PersistResult<usize> {
        Ok(0)
    }
}
