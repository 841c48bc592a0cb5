//! SQLite journal: append-only op rows plus full-state snapshots.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    core::store::{ContactStore, StoreSnapshotV1},
    op::{Op, StoredOp, StoredOpEnvelope},
    types::OpSeq,
};

use super::{OpSink, PersistError, PersistResult};

const SNAPSHOT_FORMAT_VERSION: u16 = 1;

// ops.kind column values.
const KIND_CREATE: i64 = 1;
const KIND_REPLACE: i64 = 2;
const KIND_REMOVE: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEnvelope {
    format_version: u16,
    snapshot: StoreSnapshotV1,
}

/// [`OpSink`] over a SQLite database file.
pub struct SqliteOpSink {
    conn: Connection,
}

impl SqliteOpSink {
    /// Opens (creating if needed) the journal database at `path`.
    ///
    /// The connection runs in WAL mode with `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens a throwaway in-memory journal.
    pub fn open_in_memory() -> PersistResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> PersistResult<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    /// Rebuilds the store from the latest snapshot plus every op past it.
    pub fn load_store(&self) -> PersistResult<ContactStore> {
        let mut store = match self.load_latest_snapshot()? {
            Some(snapshot) => ContactStore::from_snapshot(snapshot)?,
            None => ContactStore::new(),
        };

        let tail = self.load_ops_after(store.latest_op_seq())?;
        let replayed = tail.len();
        for stored in tail {
            store.apply_replayed_op(stored)?;
        }
        debug!(contacts = store.len(), replayed, "journal replay complete");
        Ok(store)
    }

    /// Reads journaled ops with sequence greater than `seq`, ascending.
    pub fn load_ops_after(&self, seq: OpSeq) -> PersistResult<Vec<StoredOp>> {
        let mut stmt = self
            .conn
            .prepare("SELECT seq, ts_ms, payload FROM ops WHERE seq > ?1 ORDER BY seq")?;
        let rows = stmt.query_map(params![seq as i64], decode_op_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Highest op sequence on disk, 0 when the journal is empty.
    pub fn latest_seq(&self) -> PersistResult<OpSeq> {
        // MAX over an empty table yields a single NULL row.
        let max: Option<i64> = self
            .conn
            .query_row("SELECT MAX(seq) FROM ops", [], |row| row.get(0))?;
        Ok(max.unwrap_or(0) as OpSeq)
    }

    fn load_latest_snapshot(&self) -> PersistResult<Option<StoreSnapshotV1>> {
        let newest: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT payload FROM snapshots ORDER BY covers_seq DESC, id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = newest else {
            return Ok(None);
        };
        let decoded: SnapshotEnvelope = serde_json::from_slice(&payload)?;
        if decoded.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(PersistError::Message(format!(
                "unsupported snapshot format version {}",
                decoded.format_version
            )));
        }
        Ok(Some(decoded.snapshot))
    }
}

impl OpSink for SqliteOpSink {
    fn append_ops(&mut self, ops: &[StoredOp]) -> PersistResult<OpSeq> {
        let Some(last) = ops.last() else {
            return self.latest_seq();
        };
        let last_seq = last.seq;

        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO ops(seq, ts_ms, kind, contact_id, payload) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for stored in ops {
                let payload = serde_json::to_vec(&StoredOpEnvelope::seal(stored.clone()))?;
                insert.execute(params![
                    stored.seq as i64,
                    stored.ts_ms as i64,
                    journal_kind(&stored.op),
                    stored.op.contact_id() as i64,
                    payload,
                ])?;
            }
        }
        tx.commit()?;
        Ok(last_seq)
    }

    fn flush(&mut self) -> PersistResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }

    fn write_snapshot(&mut self, snapshot: &StoreSnapshotV1, last_seq: OpSeq) -> PersistResult<()> {
        let payload = serde_json::to_vec(&SnapshotEnvelope {
            format_version: SNAPSHOT_FORMAT_VERSION,
            snapshot: snapshot.clone(),
        })?;
        self.conn.execute(
            "INSERT INTO snapshots(covers_seq, ts_ms, payload) VALUES (?1, ?2, ?3)",
            params![last_seq as i64, now_ms() as i64, payload],
        )?;
        Ok(())
    }

    fn compact_through(&mut self, seq: OpSeq) -> PersistResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM ops WHERE seq <= ?1", params![seq as i64])?;
        Ok(removed)
    }
}

fn decode_op_row(row: &Row<'_>) -> rusqlite::Result<StoredOp> {
    let seq: i64 = row.get(0)?;
    let ts_ms: i64 = row.get(1)?;
    let payload: Vec<u8> = row.get(2)?;

    let envelope: StoredOpEnvelope = serde_json::from_slice(&payload)
        .map_err(|err| bad_payload(payload.len(), Box::new(err)))?;
    let mut stored = envelope.open().map_err(|found| {
        let msg = format!("unsupported op format version {found}");
        bad_payload(payload.len(), msg.into())
    })?;

    // The indexed columns stay authoritative for ordering metadata.
    stored.seq = seq as OpSeq;
    stored.ts_ms = ts_ms as u64;
    Ok(stored)
}

fn bad_payload(len: usize, err: Box<dyn std::error::Error + Send + Sync>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(len, rusqlite::types::Type::Blob, err)
}

fn journal_kind(op: &Op) -> i64 {
    match op {
        Op::Create { .. } => KIND_CREATE,
        Op::Replace { .. } => KIND_REPLACE,
        Op::Remove { .. } => KIND_REMOVE,
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
