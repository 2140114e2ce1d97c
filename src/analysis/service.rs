//! Query boundary: validated, fan-out analytics over partitioned draw logs.

use std::sync::{Arc, Mutex};

use hashbrown::HashSet;
use thiserror::Error;
use tracing::warn;

use crate::{
    core::ordering,
    draw::DrawRecord,
    persist::sqlite::ComboCache,
    runtime::handle::DrawLogHandle,
    types::{GameKind, Jurisdiction},
};

use super::{
    accumulator::{self, AnalysisRequest, FrequencyReport, Window},
    combos::{self, ComboKey, ComboMode, DEFAULT_SAMPLE_ATTEMPTS},
    ranking::{self, HotColdNumbers, RankedCombo},
};

/// Upper bound on requested combination size; anything larger is absurd for
/// the domains served here.
pub const MAX_COMBO_SIZE: usize = 10;

/// Client-visible analytics failure.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Unknown jurisdiction/location code.
    #[error("unknown location code: {0}")]
    InvalidLocation(String),
    /// Non-positive or absurdly large combination size.
    #[error("invalid combination size {size} for {game:?}")]
    InvalidSize {
        /// Requested game.
        game: GameKind,
        /// Offending size.
        size: usize,
    },
    /// Supplied entries do not match the requested size.
    #[error("entries length {got} does not match requested size {expected}")]
    EntriesMismatch {
        /// Requested size.
        expected: usize,
        /// Supplied entry count.
        got: usize,
    },
    /// The same entry value supplied twice.
    #[error("duplicate entry value {0}")]
    DuplicateEntry(u8),
    /// Entry value outside the game's domain.
    #[error("entry value {value} outside 1-{max}")]
    OutOfRange {
        /// Offending value.
        value: u8,
        /// Domain maximum for the game.
        max: u8,
    },
    /// Zero qualifying draws for the requested scope; distinct from error.
    #[error("no qualifying draws for the requested scope")]
    NoData,
    /// Every partition read failed.
    #[error("all draw partitions failed: {0}")]
    Upstream(String),
}

/// Analytics façade over one draw-log handle per source partition.
///
/// Every operation recomputes from a fresh bounded read of the draw
/// history; nothing is shared mutably across requests.
pub struct StatsService {
    partitions: Vec<DrawLogHandle>,
    cache: Option<Arc<Mutex<ComboCache>>>,
}

impl StatsService {
    /// Builds a service over the given partitions, without a combo cache.
    pub fn new(partitions: Vec<DrawLogHandle>) -> Self {
        Self {
            partitions,
            cache: None,
        }
    }

    /// Attaches a write-through overdue-combo cache.
    pub fn with_cache(mut self, cache: ComboCache) -> Self {
        self.cache = Some(Arc::new(Mutex::new(cache)));
        self
    }

    /// Ranked most-overdue combinations for a location.
    ///
    /// Fan-out reads all partitions concurrently, merges and canonically
    /// re-sorts the draws, bounds them to the most recent `max_draws`, then
    /// accumulates and cold-ranks. Pagination applies to the ranked list.
    pub async fn overdue_combinations(
        &self,
        location: &str,
        game: GameKind,
        size: usize,
        mode: ComboMode,
        max_draws: usize,
        page: usize,
        limit: usize,
    ) -> Result<Vec<RankedCombo>, StatsError> {
        let jurisdiction = parse_location(location)?;
        validate_size(game, size)?;

        let records = self.gather(jurisdiction, game, max_draws).await?;
        let tally = accumulator::accumulate(
            &records,
            &AnalysisRequest {
                game,
                size,
                mode,
                window: Window::AllTime,
            },
        );
        if tally.total_draws == 0 {
            return Err(StatsError::NoData);
        }

        let ranked = ranking::rank_cold(&tally, size, usize::MAX);
        self.write_through(jurisdiction, game, size, &ranked).await;
        Ok(ranking::paginate(ranked, page, limit))
    }

    /// Hot and cold single numbers for a location over one window.
    pub async fn hot_cold_numbers(
        &self,
        location: &str,
        game: GameKind,
        window: Window,
        k: usize,
    ) -> Result<HotColdNumbers, StatsError> {
        let jurisdiction = parse_location(location)?;

        let max_draws = match window {
            Window::LastN(n) => n,
            Window::AllTime | Window::Today => usize::MAX,
        };
        let records = self.gather(jurisdiction, game, max_draws).await?;
        let tally = accumulator::accumulate(
            &records,
            &AnalysisRequest {
                game,
                size: 1,
                mode: ComboMode::Boxed,
                window,
            },
        );
        if tally.total_draws == 0 {
            return Err(StatsError::NoData);
        }

        Ok(ranking::hot_cold_numbers(&tally, game, k))
    }

    /// Exact-match history for one caller-supplied combination.
    pub async fn historical_frequency(
        &self,
        location: &str,
        game: GameKind,
        entries: &[u8],
        size: usize,
        mode: ComboMode,
        max_draws: usize,
    ) -> Result<FrequencyReport, StatsError> {
        let jurisdiction = parse_location(location)?;
        validate_size(game, size)?;
        validate_entries(game, entries, size)?;

        let records = self.gather(jurisdiction, game, max_draws).await?;
        let report = accumulator::exact_frequency(&records, game, entries, mode);
        if report.total_draws == 0 {
            return Err(StatsError::NoData);
        }
        Ok(report)
    }

    /// Proposes up to `want` combinations absent from the recent history,
    /// found by bounded randomized sampling rather than enumeration of the
    /// full number space.
    pub async fn overdue_candidates(
        &self,
        location: &str,
        game: GameKind,
        size: usize,
        max_draws: usize,
        want: usize,
    ) -> Result<Vec<ComboKey>, StatsError> {
        let jurisdiction = parse_location(location)?;
        validate_size(game, size)?;

        let records = self.gather(jurisdiction, game, max_draws).await?;
        let tally = accumulator::accumulate(
            &records,
            &AnalysisRequest {
                game,
                size,
                mode: ComboMode::Boxed,
                window: Window::AllTime,
            },
        );
        if tally.total_draws == 0 {
            return Err(StatsError::NoData);
        }

        let seen: HashSet<ComboKey> = tally.stats.keys().cloned().collect();
        let mut rng = rand::thread_rng();
        Ok(combos::sample_unseen(
            game,
            size,
            &seen,
            want,
            DEFAULT_SAMPLE_ATTEMPTS,
            &mut rng,
        ))
    }

    /// Concurrent fan-out read across partitions, joined before processing.
    ///
    /// A failing partition contributes nothing (with a warning); only when
    /// every partition fails does the request fail as retryable upstream.
    async fn gather(
        &self,
        jurisdiction: Jurisdiction,
        game: GameKind,
        max_draws: usize,
    ) -> Result<Vec<DrawRecord>, StatsError> {
        let mut tasks = Vec::with_capacity(self.partitions.len());
        for handle in &self.partitions {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle.by_jurisdiction(jurisdiction, Some(game), max_draws).await
            }));
        }

        let total = tasks.len();
        let mut failures = 0usize;
        let mut last_error = String::new();
        let mut merged: Vec<DrawRecord> = Vec::new();

        for task in tasks {
            match task.await {
                Ok(Ok(records)) => merged.extend(records),
                Ok(Err(err)) => {
                    failures += 1;
                    last_error = format!("{err:?}");
                    warn!(location = jurisdiction.code(), error = %last_error, "partition read failed");
                }
                Err(err) => {
                    failures += 1;
                    last_error = format!("join error: {err}");
                    warn!(location = jurisdiction.code(), error = %last_error, "partition task failed");
                }
            }
        }

        if total > 0 && failures == total {
            return Err(StatsError::Upstream(last_error));
        }

        ordering::canonical_sort(&mut merged);
        if merged.len() > max_draws {
            let excess = merged.len() - max_draws;
            merged.drain(..excess);
        }
        Ok(merged)
    }

    /// Idempotent cache upsert; failures are warned, never fatal to the
    /// response.
    async fn write_through(
        &self,
        jurisdiction: Jurisdiction,
        game: GameKind,
        size: usize,
        ranked: &[RankedCombo],
    ) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };

        let cache = Arc::clone(cache);
        let rows = ranked.to_vec();
        let result = tokio::task::spawn_blocking(move || {
            let mut cache = cache.lock().map_err(|e| format!("cache lock poisoned: {e}"))?;
            cache
                .upsert_batch(jurisdiction, game, size, &rows)
                .map_err(|e| format!("{e:?}"))
        })
        .await;

        match result {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => warn!(error = %err, "combo cache upsert failed"),
            Err(err) => warn!(error = %err, "combo cache task failed"),
        }
    }
}

fn parse_location(location: &str) -> Result<Jurisdiction, StatsError> {
    Jurisdiction::parse(location).ok_or_else(|| StatsError::InvalidLocation(location.to_string()))
}

fn validate_size(game: GameKind, size: usize) -> Result<(), StatsError> {
    let max = match game {
        GameKind::Keno => MAX_COMBO_SIZE,
        GameKind::Trackside => 4,
    };
    if size == 0 || size > max {
        return Err(StatsError::InvalidSize { game, size });
    }
    Ok(())
}

fn validate_entries(game: GameKind, entries: &[u8], size: usize) -> Result<(), StatsError> {
    if entries.len() != size {
        return Err(StatsError::EntriesMismatch {
            expected: size,
            got: entries.len(),
        });
    }

    let max = game.domain_max();
    let mut seen = [false; 81];
    for &value in entries {
        if value == 0 || value > max {
            return Err(StatsError::OutOfRange { value, max });
        }
        if seen[value as usize] {
            return Err(StatsError::DuplicateEntry(value));
        }
        seen[value as usize] = true;
    }
    Ok(())
}
