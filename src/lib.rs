//! Draw-result ingestion store with append-only SQLite journaling and an
//! overdue/drought combinatorial analytics engine.
//!
//! # Examples
//!
//! In-memory usage with [`core::store::DrawStore`] and the analytics core:
//! ```
//! use drawstats::{
//!     analysis::{
//!         accumulator::{self, AnalysisRequest, Window},
//!         combos::ComboMode,
//!         ranking,
//!     },
//!     core::{ordering, store::DrawStore},
//!     draw::{DrawDraft, GameOutcome},
//!     types::{GameKind, Jurisdiction},
//! };
//!
//! let mut store = DrawStore::new();
//! let (id, _op) = store.insert(DrawDraft {
//!     source_id: "race-1001".to_string(),
//!     jurisdiction: Jurisdiction::Nsw,
//!     draw_number: Some(1001),
//!     date: Some("2024-05-01".to_string()),
//!     created_at_ms: 1,
//!     outcome: GameOutcome::Trackside {
//!         placings: vec![7, 2, 11, 4],
//!         dividend_cents: Some(1250),
//!     },
//! }).expect("insert");
//! assert_eq!(id, 1);
//!
//! let mut draws = store.recent_cloned(500);
//! ordering::canonical_sort(&mut draws);
//! let tally = accumulator::accumulate(&draws, &AnalysisRequest {
//!     game: GameKind::Trackside,
//!     size: 2,
//!     mode: ComboMode::Boxed,
//!     window: Window::AllTime,
//! });
//! let overdue = ranking::rank_cold(&tally, 2, 10);
//! assert_eq!(overdue[0].combo_key, "2-7");
//! ```
//!
//! Runtime usage with SQLite sink:
//! ```no_run
//! use drawstats::{
//!     core::store::DrawStore,
//!     draw::{DrawDraft, GameOutcome},
//!     persist::sqlite::SqliteOpSink,
//!     runtime::handle::{spawn_drawlog, RuntimeConfig},
//!     types::Jurisdiction,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink = SqliteOpSink::open("draws.db").expect("open sqlite");
//! let handle = spawn_drawlog(DrawStore::new(), Some(Box::new(sink)), RuntimeConfig::default());
//! let _id = handle.insert(DrawDraft {
//!     source_id: "keno-nsw-774412".to_string(),
//!     jurisdiction: Jurisdiction::Nsw,
//!     draw_number: Some(774_412),
//!     date: Some("2024-05-01".to_string()),
//!     created_at_ms: 1,
//!     outcome: GameOutcome::Keno {
//!         numbers: (1..=20).collect(),
//!     },
//! }).await.expect("insert");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```

/// Overdue/drought analytics: enumeration, accumulation, ranking, queries.
pub mod analysis;
/// Core in-memory store and canonical ordering.
pub mod core;
/// Draw domain records and outcome validation.
pub mod draw;
/// Mutation op model and persistence wrapper types.
pub mod op;
/// Persistence abstraction, SQLite journal, and combo cache.
pub mod persist;
/// Single-writer ingestion runtime and events.
pub mod runtime;
/// Shared primitive types and enums.
pub mod types;
