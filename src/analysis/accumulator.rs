//! Single-pass drought/frequency accumulation over ordered draws.

use hashbrown::HashMap;
use tracing::warn;

use crate::{
    core::ordering,
    draw::DrawRecord,
    types::GameKind,
};

use super::combos::{self, ComboKey, ComboMode};

/// Draw-count granularity of one accumulation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Every qualifying draw available.
    AllTime,
    /// The most recent N qualifying draws in canonical order.
    LastN(usize),
    /// Draws sharing the latest calendar day present.
    Today,
}

/// Parameters of one accumulation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Game to analyze.
    pub game: GameKind,
    /// Combination size.
    pub size: usize,
    /// Boxed or ordered matching.
    pub mode: ComboMode,
    /// Draw window.
    pub window: Window,
}

/// Per-combination accumulator state for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComboStat {
    /// Draws in which the combination appeared.
    pub count: u64,
    /// Window-relative index of the most recent appearance.
    pub last_index: Option<usize>,
    /// Missed-draw counts between consecutive appearances.
    pub gaps: Vec<u64>,
    /// Largest historical gap.
    pub max_gap: u64,
    /// Business date of the most recent appearance.
    pub last_date: Option<String>,
    /// Dividend side channel total, cents.
    pub dividend_cents: u64,
    /// True when the combination appeared on the latest calendar day.
    pub hit_latest_day: bool,
}

impl ComboStat {
    /// Draws since the last appearance; 0 means it appeared in the most
    /// recent draw, `total` means it never appeared.
    pub fn current_drought(&self, total: usize) -> u64 {
        match self.last_index {
            Some(i) => (total as u64).saturating_sub(i as u64 + 1),
            None => total as u64,
        }
    }

    /// Longest of the historical gaps and the current drought.
    pub fn longest_drought(&self, total: usize) -> u64 {
        self.max_gap.max(self.current_drought(total))
    }

    /// Rounded mean draws between appearances, `None` when never seen.
    pub fn avg_every(&self, total: usize) -> Option<u64> {
        if self.count == 0 {
            return None;
        }
        Some((total as f64 / self.count as f64).round() as u64)
    }

    /// Hit rate as a percentage, two decimals.
    pub fn win_percentage(&self, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        round2(self.count as f64 / total as f64 * 100.0)
    }

    /// Mean historical gap, two decimals; `None` before a second appearance.
    pub fn average_gap(&self) -> Option<f64> {
        if self.gaps.is_empty() {
            return None;
        }
        let sum: u64 = self.gaps.iter().sum();
        Some(round2(sum as f64 / self.gaps.len() as f64))
    }

    fn record_hit(&mut self, index: usize) {
        if let Some(last) = self.last_index {
            let gap = (index - last - 1) as u64;
            self.max_gap = self.max_gap.max(gap);
            self.gaps.push(gap);
        }
        self.count += 1;
        self.last_index = Some(index);
    }
}

/// Result of one accumulation pass. Owned by the invocation that built it;
/// never shared across requests.
#[derive(Debug, Default)]
pub struct DroughtTally {
    /// Per-combination statistics.
    pub stats: HashMap<ComboKey, ComboStat>,
    /// Qualifying draws in the window.
    pub total_draws: usize,
    /// Malformed records skipped with a warning.
    pub skipped: usize,
}

/// Runs a single accumulation pass.
///
/// `records` must already be in canonical order ([`ordering::canonical_sort`]);
/// processing out of order corrupts gap and drought math. Malformed records
/// are skipped with a warning and do not occupy a draw index.
pub fn accumulate(records: &[DrawRecord], req: &AnalysisRequest) -> DroughtTally {
    let mut tally = DroughtTally::default();
    let valid = qualifying(records, req.game, &mut tally.skipped);
    let windowed = apply_window(valid, req.window);

    tally.total_draws = windowed.len();
    let latest_day = windowed.last().map(|rec| ordering::utc_day_number(rec));

    for (i, rec) in windowed.iter().enumerate() {
        let keys = combos::draw_combinations(rec, req.size, req.mode);
        let on_latest_day = latest_day == Some(ordering::utc_day_number(rec));
        let dividend = rec.outcome.dividend_cents().unwrap_or(0);

        for key in keys {
            let stat = tally.stats.entry(key).or_default();
            stat.record_hit(i);
            stat.last_date = rec.date.clone();
            stat.dividend_cents += dividend;
            if on_latest_day {
                stat.hit_latest_day = true;
            }
        }
    }

    tally
}

/// Exact-match statistics for one caller-supplied combination.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyReport {
    /// Draws in which the combination occurred.
    pub occurrences: u64,
    /// Qualifying draws considered.
    pub total_draws: usize,
    /// Draws since the last occurrence; `total_draws` when never seen.
    pub last_occurrence_races_ago: u64,
    /// Rounded mean draws between occurrences.
    pub average_interval: Option<u64>,
    /// Hit rate as a percentage, two decimals.
    pub winning_percentage: f64,
}

/// Subset test (boxed) or exact-prefix test (ordered) for one fixed
/// combination; no enumeration. `records` must be in canonical order.
/// Entry validation is the caller's job.
pub fn exact_frequency(
    records: &[DrawRecord],
    game: GameKind,
    entries: &[u8],
    mode: ComboMode,
) -> FrequencyReport {
    let mut skipped = 0;
    let valid = qualifying(records, game, &mut skipped);
    let total = valid.len();

    let boxed_key = combos::ComboKey::boxed(entries);
    let ordered_key = combos::ComboKey::ordered(entries);

    let mut stat = ComboStat::default();
    for (i, rec) in valid.iter().enumerate() {
        let numbers = rec.outcome.numbers();
        let hit = match rec.game() {
            GameKind::Keno => entries.iter().all(|e| numbers.contains(e)),
            GameKind::Trackside => match mode {
                ComboMode::Boxed => {
                    combos::boxed_prefix(numbers, entries.len()).as_ref() == Some(&boxed_key)
                }
                ComboMode::Ordered => {
                    combos::ordered_prefix(numbers, entries.len()).as_ref() == Some(&ordered_key)
                }
            },
        };
        if hit {
            stat.record_hit(i);
        }
    }

    FrequencyReport {
        occurrences: stat.count,
        total_draws: total,
        last_occurrence_races_ago: stat.current_drought(total),
        average_interval: stat.avg_every(total),
        winning_percentage: stat.win_percentage(total),
    }
}

/// Rounds to two decimal places.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn qualifying<'a>(
    records: &'a [DrawRecord],
    game: GameKind,
    skipped: &mut usize,
) -> Vec<&'a DrawRecord> {
    let mut out = Vec::with_capacity(records.len());
    for rec in records {
        if rec.game() != game {
            continue;
        }
        match game.validate_outcome(rec.outcome.numbers()) {
            Ok(()) => out.push(rec),
            Err(err) => {
                *skipped += 1;
                warn!(
                    id = rec.id,
                    source = %rec.source_id,
                    ?err,
                    "skipping malformed draw record"
                );
            }
        }
    }
    out
}

fn apply_window(valid: Vec<&DrawRecord>, window: Window) -> Vec<&DrawRecord> {
    match window {
        Window::AllTime => valid,
        Window::LastN(n) => {
            let start = valid.len().saturating_sub(n);
            valid[start..].to_vec()
        }
        Window::Today => {
            let Some(latest) = valid.last().map(|rec| ordering::utc_day_number(rec)) else {
                return valid;
            };
            valid
                .into_iter()
                .filter(|rec| ordering::utc_day_number(rec) == latest)
                .collect()
        }
    }
}
