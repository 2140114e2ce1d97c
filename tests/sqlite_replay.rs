use drawstats::{
    analysis::ranking::RankedCombo,
    core::store::DrawStore,
    draw::{DrawDraft, GameOutcome},
    persist::{
        sqlite::{ComboCache, SqliteOpSink},
        OpSink,
    },
    types::{GameKind, Jurisdiction},
};

fn draft(source: &str, jurisdiction: Jurisdiction, outcome: GameOutcome) -> DrawDraft {
    DrawDraft {
        source_id: source.to_string(),
        jurisdiction,
        draw_number: Some(100),
        date: Some("2024-05-01".to_string()),
        created_at_ms: 10,
        outcome,
    }
}

fn keno_outcome() -> GameOutcome {
    GameOutcome::Keno {
        numbers: (1..=20).collect(),
    }
}

fn race_outcome(placings: Vec<u8>) -> GameOutcome {
    GameOutcome::Trackside {
        placings,
        dividend_cents: Some(980),
    }
}

fn ranked_row(rank: usize, combo_key: &str, frequency: u64) -> RankedCombo {
    RankedCombo {
        rank,
        combination: combo_key
            .split('-')
            .map(|p| p.parse().unwrap())
            .collect(),
        combo_key: combo_key.to_string(),
        frequency,
        avg_every: Some(3),
        current_drought: 5,
        longest_drought: 9,
        win_percentage: 12.5,
        total_draws: 40,
        last_appeared: Some("2024-05-01".to_string()),
    }
}

#[test]
fn journal_replay_restores_store_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("draws.db");

    let mut store = DrawStore::new();
    store
        .insert(draft("keno-1", Jurisdiction::Nsw, keno_outcome()))
        .expect("insert");
    let (race_id, _) = store
        .insert(draft("race-1", Jurisdiction::Vic, race_outcome(vec![1, 2, 3, 4])))
        .expect("insert");
    store
        .repair_outcome(race_id, race_outcome(vec![4, 3, 2, 1]))
        .expect("repair");

    {
        let mut sink = SqliteOpSink::open(&path).expect("open");
        let ops = store.drain_pending_ops();
        assert_eq!(ops.len(), 3);
        let seq = sink.append_ops(&ops).expect("append");
        assert_eq!(seq, 3);
    }

    let sink = SqliteOpSink::open(&path).expect("reopen");
    let loaded = sink.load_store().expect("load");

    assert_eq!(loaded.export_snapshot(), store.export_snapshot());
    let repaired = loaded.get(race_id).expect("record");
    assert_eq!(repaired.outcome, race_outcome(vec![4, 3, 2, 1]));
}

#[test]
fn snapshot_plus_compaction_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("draws.db");

    let mut store = DrawStore::new();
    for i in 0..5 {
        store
            .insert(draft(
                &format!("race-{i}"),
                Jurisdiction::Act,
                race_outcome(vec![1, 2, 3, 4]),
            ))
            .expect("insert");
    }

    {
        let mut sink = SqliteOpSink::open(&path).expect("open");
        sink.append_ops(&store.drain_pending_ops()).expect("append");

        let last_seq = store.latest_op_seq();
        sink.write_snapshot(&store.export_snapshot(), last_seq)
            .expect("snapshot");
        let removed = sink.compact_through(last_seq).expect("compact");
        assert_eq!(removed, 5);
        assert_eq!(sink.latest_seq().expect("latest"), 0);
    }

    let sink = SqliteOpSink::open(&path).expect("reopen");
    let loaded = sink.load_store().expect("load");
    assert_eq!(loaded.export_snapshot(), store.export_snapshot());
    assert_eq!(loaded.len(), 5);
}

#[test]
fn empty_journal_reports_zero_latest_seq() {
    let mut sink = SqliteOpSink::open_in_memory().expect("open");
    assert_eq!(sink.latest_seq().expect("latest"), 0);

    // An empty append only reads back the current high-water mark.
    assert_eq!(sink.append_ops(&[]).expect("append"), 0);

    let mut store = DrawStore::new();
    store
        .insert(draft("keno-1", Jurisdiction::Nsw, keno_outcome()))
        .expect("insert");
    sink.append_ops(&store.drain_pending_ops()).expect("append");
    sink.compact_through(store.latest_op_seq()).expect("compact");

    // Compaction leaves the events table empty again.
    assert_eq!(sink.latest_seq().expect("latest"), 0);
    assert_eq!(sink.append_ops(&[]).expect("append"), 0);
}

#[test]
fn events_after_snapshot_are_replayed_on_top() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("draws.db");

    let mut store = DrawStore::new();
    store
        .insert(draft("keno-1", Jurisdiction::Nsw, keno_outcome()))
        .expect("insert");

    let mut sink = SqliteOpSink::open(&path).expect("open");
    sink.append_ops(&store.drain_pending_ops()).expect("append");
    sink.write_snapshot(&store.export_snapshot(), store.latest_op_seq())
        .expect("snapshot");

    // Post-snapshot tail.
    store
        .insert(draft("keno-2", Jurisdiction::Nsw, keno_outcome()))
        .expect("insert");
    sink.append_ops(&store.drain_pending_ops()).expect("append");
    drop(sink);

    let sink = SqliteOpSink::open(&path).expect("reopen");
    let loaded = sink.load_store().expect("load");
    assert_eq!(loaded.len(), 2);
    assert!(loaded.find_by_source("keno-2").is_some());
    assert_eq!(loaded.export_snapshot(), store.export_snapshot());
}

#[test]
fn combo_cache_upserts_are_idempotent() {
    let mut cache = ComboCache::open_in_memory().expect("open");
    let rows = vec![ranked_row(1, "1-2", 7), ranked_row(2, "3-4", 5)];

    let written = cache
        .upsert_batch(Jurisdiction::Nsw, GameKind::Trackside, 2, &rows)
        .expect("upsert");
    assert_eq!(written, 2);
    cache
        .upsert_batch(Jurisdiction::Nsw, GameKind::Trackside, 2, &rows)
        .expect("upsert again");

    let loaded = cache
        .load(Jurisdiction::Nsw, GameKind::Trackside, 2)
        .expect("load");
    assert_eq!(loaded, rows);
}

#[test]
fn combo_cache_last_write_wins() {
    let mut cache = ComboCache::open_in_memory().expect("open");
    cache
        .upsert_batch(
            Jurisdiction::Vic,
            GameKind::Keno,
            3,
            &[ranked_row(1, "1-2-3", 4)],
        )
        .expect("upsert");

    let mut newer = ranked_row(2, "1-2-3", 6);
    newer.current_drought = 0;
    newer.last_appeared = Some("2024-05-09".to_string());
    cache
        .upsert_batch(Jurisdiction::Vic, GameKind::Keno, 3, &[newer.clone()])
        .expect("re-upsert");

    let loaded = cache
        .load(Jurisdiction::Vic, GameKind::Keno, 3)
        .expect("load");
    assert_eq!(loaded, vec![newer]);
}

#[test]
fn combo_cache_scopes_are_isolated() {
    let mut cache = ComboCache::open_in_memory().expect("open");
    cache
        .upsert_batch(
            Jurisdiction::Nsw,
            GameKind::Keno,
            2,
            &[ranked_row(1, "1-2", 9)],
        )
        .expect("upsert");
    cache
        .upsert_batch(
            Jurisdiction::Nsw,
            GameKind::Trackside,
            2,
            &[ranked_row(1, "1-2", 3)],
        )
        .expect("upsert");

    let keno = cache
        .load(Jurisdiction::Nsw, GameKind::Keno, 2)
        .expect("load");
    assert_eq!(keno.len(), 1);
    assert_eq!(keno[0].frequency, 9);

    assert!(cache
        .load(Jurisdiction::Sa, GameKind::Keno, 2)
        .expect("load")
        .is_empty());
}
