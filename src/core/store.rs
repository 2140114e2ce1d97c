use std::time::{SystemTime, UNIX_EPOCH};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{
    draw::{DrawDraft, DrawRecord, GameOutcome},
    op::{Op, StoredOp},
    types::{DrawId, GameKind, Jurisdiction, OpSeq},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    MissingDraw(DrawId),
    AlreadyExists(DrawId),
    DuplicateSource(String),
    GameMismatch(DrawId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshotV1 {
    pub next_draw_id: DrawId,
    pub next_op_seq: OpSeq,
    pub order: Vec<DrawId>,
    pub records: Vec<DrawRecord>,
}

#[derive(Debug, Default)]
pub struct DrawStore {
    records: HashMap<DrawId, DrawRecord>,
    order: Vec<DrawId>,
    pos: HashMap<DrawId, usize>,
    by_jurisdiction: HashMap<Jurisdiction, Vec<DrawId>>,
    by_game: HashMap<GameKind, Vec<DrawId>>,
    by_source: HashMap<String, DrawId>,
    pending_ops: Vec<StoredOp>,
    next_op_seq: OpSeq,
    next_draw_id: DrawId,
}

impl DrawStore {
    pub fn new() -> Self {
        Self {
            next_op_seq: 1,
            next_draw_id: 1,
            ..Self::default()
        }
    }

    pub fn from_snapshot(snapshot: StoreSnapshotV1) -> Result<Self, StoreError> {
        let mut store = Self {
            next_draw_id: snapshot.next_draw_id,
            next_op_seq: snapshot.next_op_seq,
            order: snapshot.order,
            ..Self::default()
        };

        for (idx, id) in store.order.iter().copied().enumerate() {
            store.pos.insert(id, idx);
        }

        for rec in snapshot.records {
            store.insert_indices(&rec);
            store.records.insert(rec.id, rec);
        }

        Ok(store)
    }

    pub fn export_snapshot(&self) -> StoreSnapshotV1 {
        let records = self
            .order
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect();

        StoreSnapshotV1 {
            next_draw_id: self.next_draw_id,
            next_op_seq: self.next_op_seq,
            order: self.order.clone(),
            records,
        }
    }

    pub fn insert(&mut self, draft: DrawDraft) -> Result<(DrawId, StoredOp), StoreError> {
        if self.by_source.contains_key(&draft.source_id) {
            return Err(StoreError::DuplicateSource(draft.source_id));
        }

        let id = self.next_draw_id;
        self.next_draw_id += 1;

        let draw = DrawRecord {
            id,
            source_id: draft.source_id,
            jurisdiction: draft.jurisdiction,
            draw_number: draft.draw_number,
            date: draft.date,
            created_at_ms: draft.created_at_ms,
            outcome: draft.outcome,
        };

        let stored = self.apply_insert(draw)?;
        self.pending_ops.push(stored.clone());
        Ok((id, stored))
    }

    /// Replaces the outcome of a malformed logical draw. The only mutation
    /// a stored record supports; everything else is append-only.
    pub fn repair_outcome(
        &mut self,
        id: DrawId,
        outcome: GameOutcome,
    ) -> Result<((), StoredOp), StoreError> {
        let prev = self
            .records
            .get(&id)
            .ok_or(StoreError::MissingDraw(id))?
            .outcome
            .clone();
        if prev.game() != outcome.game() {
            return Err(StoreError::GameMismatch(id));
        }
        let stored = self.apply_repair(id, outcome, prev)?;
        self.pending_ops.push(stored.clone());
        Ok(((), stored))
    }

    pub fn apply_replayed_op(&mut self, stored: StoredOp) -> Result<(), StoreError> {
        let seq = stored.seq;
        match stored.op {
            Op::Insert { draw } => {
                self.apply_insert_with_seq(draw, seq)?;
            }
            Op::Repair { id, outcome, prev } => {
                self.apply_repair_with_seq(id, outcome, prev, seq)?;
            }
        }
        Ok(())
    }

    pub fn get(&self, id: DrawId) -> Option<&DrawRecord> {
        self.records.get(&id)
    }

    pub fn get_cloned(&self, id: DrawId) -> Option<DrawRecord> {
        self.get(id).cloned()
    }

    pub fn find_by_source(&self, source_id: &str) -> Option<&DrawRecord> {
        self.by_source
            .get(source_id)
            .and_then(|id| self.records.get(id))
    }

    pub fn recent(&self, n: usize) -> Vec<&DrawRecord> {
        let len = self.order.len();
        let start = len.saturating_sub(n);
        self.order[start..]
            .iter()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    pub fn recent_cloned(&self, n: usize) -> Vec<DrawRecord> {
        self.recent(n).into_iter().cloned().collect()
    }

    /// Most recent `limit` draws for a jurisdiction in insertion order,
    /// optionally restricted to one game.
    pub fn by_jurisdiction(
        &self,
        jurisdiction: Jurisdiction,
        game: Option<GameKind>,
        limit: usize,
    ) -> Vec<&DrawRecord> {
        let ids = match self.by_jurisdiction.get(&jurisdiction) {
            Some(ids) => ids.as_slice(),
            None => return Vec::new(),
        };

        let matching: Vec<&DrawRecord> = ids
            .iter()
            .filter_map(|id| self.records.get(id))
            .filter(|rec| game.is_none_or(|g| rec.game() == g))
            .collect();

        let start = matching.len().saturating_sub(limit);
        matching[start..].to_vec()
    }

    pub fn by_jurisdiction_cloned(
        &self,
        jurisdiction: Jurisdiction,
        game: Option<GameKind>,
        limit: usize,
    ) -> Vec<DrawRecord> {
        self.by_jurisdiction(jurisdiction, game, limit)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn ordered_ids(&self) -> &[DrawId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn drain_pending_ops(&mut self) -> Vec<StoredOp> {
        std::mem::take(&mut self.pending_ops)
    }

    pub fn latest_op_seq(&self) -> OpSeq {
        self.next_op_seq.saturating_sub(1)
    }

    fn apply_insert(&mut self, draw: DrawRecord) -> Result<StoredOp, StoreError> {
        let seq = self.take_next_op_seq();
        self.apply_insert_with_seq(draw, seq)
    }

    fn apply_insert_with_seq(&mut self, draw: DrawRecord, seq: OpSeq) -> Result<StoredOp, StoreError> {
        if self.records.contains_key(&draw.id) {
            return Err(StoreError::AlreadyExists(draw.id));
        }

        let id = draw.id;
        self.next_draw_id = self.next_draw_id.max(id.saturating_add(1));
        self.insert_indices(&draw);
        self.pos.insert(id, self.order.len());
        self.order.push(id);
        self.records.insert(id, draw.clone());

        self.bump_next_seq_from(seq);
        Ok(StoredOp {
            seq,
            ts_ms: now_ms(),
            op: Op::Insert { draw },
        })
    }

    fn apply_repair(
        &mut self,
        id: DrawId,
        outcome: GameOutcome,
        prev: GameOutcome,
    ) -> Result<StoredOp, StoreError> {
        let seq = self.take_next_op_seq();
        self.apply_repair_with_seq(id, outcome, prev, seq)
    }

    fn apply_repair_with_seq(
        &mut self,
        id: DrawId,
        outcome: GameOutcome,
        prev: GameOutcome,
        seq: OpSeq,
    ) -> Result<StoredOp, StoreError> {
        let rec = self.records.get_mut(&id).ok_or(StoreError::MissingDraw(id))?;
        rec.outcome = outcome.clone();

        self.bump_next_seq_from(seq);
        Ok(StoredOp {
            seq,
            ts_ms: now_ms(),
            op: Op::Repair { id, outcome, prev },
        })
    }

    fn insert_indices(&mut self, rec: &DrawRecord) {
        self.by_jurisdiction
            .entry(rec.jurisdiction)
            .or_default()
            .push(rec.id);
        self.by_game.entry(rec.game()).or_default().push(rec.id);
        self.by_source.insert(rec.source_id.clone(), rec.id);
    }

    fn take_next_op_seq(&mut self) -> OpSeq {
        let seq = self.next_op_seq;
        self.next_op_seq += 1;
        seq
    }

    fn bump_next_seq_from(&mut self, seq: OpSeq) {
        self.next_op_seq = self.next_op_seq.max(seq.saturating_add(1));
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
