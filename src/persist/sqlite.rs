//! SQLite-backed append-only op journal and overdue-combo cache.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::{
    analysis::ranking::RankedCombo,
    core::store::{DrawStore, StoreSnapshotV1},
    op::{Op, StoredOp, StoredOpEnvelope},
    types::{DrawId, GameKind, Jurisdiction, OpSeq},
};

use super::{OpSink, PersistError, PersistResult};

const SNAPSHOT_FORMAT_VERSION: u16 = 1;
const UPSERT_CHUNK: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEnvelope {
    format_version: u16,
    snapshot: StoreSnapshotV1,
}

/// SQLite implementation of [`crate::persist::OpSink`].
pub struct SqliteOpSink {
    conn: Connection,
}

impl SqliteOpSink {
    /// Opens or creates a SQLite-backed sink at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        let conn = init_connection(conn)?;
        Ok(Self { conn })
    }

    /// Opens an in-memory SQLite sink.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        let conn = init_connection(conn)?;
        Ok(Self { conn })
    }

    /// Loads store state from latest snapshot plus tail events.
    pub fn load_store(&self) -> PersistResult<DrawStore> {
        let mut store = if let Some(snapshot) = self.load_latest_snapshot()? {
            DrawStore::from_snapshot(snapshot)?
        } else {
            DrawStore::new()
        };

        let start_seq = store.export_snapshot().next_op_seq.saturating_sub(1);
        let events = self.load_events_after(start_seq)?;
        for event in events {
            store.apply_replayed_op(event)?;
        }
        Ok(store)
    }

    /// Loads events strictly after `seq`.
    pub fn load_events_after(&self, seq: OpSeq) -> PersistResult<Vec<StoredOp>> {
        let mut stmt = self
            .conn
            .prepare("SELECT seq, ts_ms, payload FROM events WHERE seq > ?1 ORDER BY seq ASC")?;

        let rows = stmt.query_map(params![seq], |row| {
            let seq: i64 = row.get(0)?;
            let ts_ms: i64 = row.get(1)?;
            let payload: Vec<u8> = row.get(2)?;
            let mut op = decode_stored_op_payload(&payload).map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(
                    payload.len(),
                    rusqlite::types::Type::Blob,
                    Box::new(std::io::Error::other(err)),
                )
            })?;
            op.seq = seq as OpSeq;
            op.ts_ms = ts_ms as u64;
            Ok(op)
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Writes a snapshot covering `last_seq`.
    pub fn write_snapshot(
        &mut self,
        snapshot: &StoreSnapshotV1,
        last_seq: OpSeq,
    ) -> PersistResult<()> {
        let env = SnapshotEnvelope {
            format_version: SNAPSHOT_FORMAT_VERSION,
            snapshot: snapshot.clone(),
        };
        let payload = serde_json::to_vec(&env)?;
        let ts_ms = now_ms();
        self.conn.execute(
            "INSERT INTO snapshots(last_seq, ts_ms, payload) VALUES (?1, ?2, ?3)",
            params![last_seq as i64, ts_ms as i64, payload],
        )?;
        Ok(())
    }

    /// Deletes events up to and including `seq`.
    pub fn compact_through(&mut self, seq: OpSeq) -> PersistResult<usize> {
        let count = self
            .conn
            .execute("DELETE FROM events WHERE seq <= ?1", params![seq as i64])?;
        Ok(count)
    }

    /// Returns the latest sequence persisted in the events table.
    pub fn latest_seq(&self) -> PersistResult<OpSeq> {
        // MAX(seq) yields a single row holding NULL when the table is empty,
        // so the column must be read as nullable.
        let seq: Option<i64> = self
            .conn
            .query_row("SELECT MAX(seq) FROM events", [], |row| {
                row.get::<_, Option<i64>>(0)
            })?;
        Ok(seq.unwrap_or(0) as OpSeq)
    }

    fn load_latest_snapshot(&self) -> PersistResult<Option<StoreSnapshotV1>> {
        let payload: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT payload FROM snapshots ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let env: SnapshotEnvelope = serde_json::from_slice(&payload)?;
        if env.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(PersistError::Message(
                "unsupported snapshot format".to_string(),
            ));
        }
        Ok(Some(env.snapshot))
    }
}

impl OpSink for SqliteOpSink {
    fn append_ops(&mut self, ops: &[StoredOp]) -> PersistResult<OpSeq> {
        if ops.is_empty() {
            return self.latest_seq();
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO events(seq, ts_ms, kind, draw_id, payload) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for stored in ops {
                let payload = serde_json::to_vec(&StoredOpEnvelope::new(stored.clone()))?;
                let (kind, draw_id) = op_kind_and_id(&stored.op);
                stmt.execute(params![
                    stored.seq as i64,
                    stored.ts_ms as i64,
                    kind,
                    draw_id.map(|v| v as i64),
                    payload,
                ])?;
            }
        }
        tx.commit()?;

        Ok(ops.last().map(|o| o.seq).unwrap_or(0))
    }

    fn flush(&mut self) -> PersistResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }

    fn write_snapshot(&mut self, snapshot: &StoreSnapshotV1, last_seq: OpSeq) -> PersistResult<()> {
        SqliteOpSink::write_snapshot(self, snapshot, last_seq)
    }

    fn compact_through(&mut self, seq: OpSeq) -> PersistResult<usize> {
        SqliteOpSink::compact_through(self, seq)
    }
}

/// Persisted write-through cache of computed overdue-combo metrics, keyed
/// by `(location, game, size, combo_key)`.
///
/// Upserts are idempotent last-write-wins; concurrent recomputation of the
/// same input history derives the same rows, so no locking is needed.
pub struct ComboCache {
    conn: Connection,
}

impl ComboCache {
    /// Opens or creates a cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        let conn = init_connection(conn)?;
        Ok(Self { conn })
    }

    /// Opens an in-memory cache.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        let conn = init_connection(conn)?;
        Ok(Self { conn })
    }

    /// Upserts ranked rows in bounded transactions; returns rows written.
    pub fn upsert_batch(
        &mut self,
        location: Jurisdiction,
        game: GameKind,
        size: usize,
        rows: &[RankedCombo],
    ) -> PersistResult<usize> {
        let ts_ms = now_ms() as i64;
        let mut written = 0usize;

        for chunk in rows.chunks(UPSERT_CHUNK) {
            let tx = self.conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO combo_cache(
                        location, game, size, combo_key, rank, frequency, avg_every,
                        current_drought, longest_drought, win_percentage, total_draws,
                        last_appeared, updated_ms)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                     ON CONFLICT(location, game, size, combo_key) DO UPDATE SET
                        rank = excluded.rank,
                        frequency = excluded.frequency,
                        avg_every = excluded.avg_every,
                        current_drought = excluded.current_drought,
                        longest_drought = excluded.longest_drought,
                        win_percentage = excluded.win_percentage,
                        total_draws = excluded.total_draws,
                        last_appeared = excluded.last_appeared,
                        updated_ms = excluded.updated_ms",
                )?;
                for row in chunk {
                    stmt.execute(params![
                        location.code(),
                        game.tag(),
                        size as i64,
                        row.combo_key,
                        row.rank as i64,
                        row.frequency as i64,
                        row.avg_every.map(|v| v as i64),
                        row.current_drought as i64,
                        row.longest_drought as i64,
                        row.win_percentage,
                        row.total_draws as i64,
                        row.last_appeared,
                        ts_ms,
                    ])?;
                    written += 1;
                }
            }
            tx.commit()?;
        }

        Ok(written)
    }

    /// Loads cached rows for one `(location, game, size)` scope in rank
    /// order.
    pub fn load(
        &self,
        location: Jurisdiction,
        game: GameKind,
        size: usize,
    ) -> PersistResult<Vec<RankedCombo>> {
        let mut stmt = self.conn.prepare(
            "SELECT combo_key, rank, frequency, avg_every, current_drought,
                    longest_drought, win_percentage, total_draws, last_appeared
             FROM combo_cache
             WHERE location = ?1 AND game = ?2 AND size = ?3
             ORDER BY rank ASC",
        )?;

        let rows = stmt.query_map(
            params![location.code(), game.tag(), size as i64],
            |row| {
                let combo_key: String = row.get(0)?;
                let rank: i64 = row.get(1)?;
                let frequency: i64 = row.get(2)?;
                let avg_every: Option<i64> = row.get(3)?;
                let current_drought: i64 = row.get(4)?;
                let longest_drought: i64 = row.get(5)?;
                let win_percentage: f64 = row.get(6)?;
                let total_draws: i64 = row.get(7)?;
                let last_appeared: Option<String> = row.get(8)?;
                Ok(RankedCombo {
                    rank: rank as usize,
                    combination: parse_key_values(&combo_key),
                    combo_key,
                    frequency: frequency as u64,
                    avg_every: avg_every.map(|v| v as u64),
                    current_drought: current_drought as u64,
                    longest_drought: longest_drought as u64,
                    win_percentage,
                    total_draws: total_draws as usize,
                    last_appeared,
                })
            },
        )?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn init_connection(conn: Connection) -> PersistResult<Connection> {
    conn.execute_batch(include_str!("schema.sql"))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(conn)
}

fn parse_key_values(key: &str) -> Vec<u8> {
    crate::analysis::combos::ComboKey::parse(key)
        .map(|k| k.values().to_vec())
        .unwrap_or_default()
}

fn op_kind_and_id(op: &Op) -> (i64, Option<DrawId>) {
    match op {
        Op::Insert { draw } => (1, Some(draw.id)),
        Op::Repair { id, .. } => (2, Some(*id)),
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn decode_stored_op_payload(payload: &[u8]) -> Result<StoredOp, String> {
    let envelope = serde_json::from_slice::<StoredOpEnvelope>(payload)
        .map_err(|e| format!("op payload decode failed: {e}"))?;
    if envelope.format_version != crate::op::OP_FORMAT_VERSION {
        return Err(format!(
            "unsupported op format version: {}",
            envelope.format_version
        ));
    }
    Ok(envelope.stored)
}
