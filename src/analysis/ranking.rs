//! Ranking and formatting of accumulated combination statistics.

use serde::Serialize;

use crate::types::GameKind;

use super::{
    accumulator::{ComboStat, DroughtTally},
    combos::ComboKey,
};

/// Externally consumable per-combination row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCombo {
    /// 1-based rank under the requested sort intent.
    pub rank: usize,
    /// Member values in key order.
    pub combination: Vec<u8>,
    /// Canonical `"1-2-3"` key.
    pub combo_key: String,
    /// Draws in which the combination appeared.
    pub frequency: u64,
    /// Rounded mean draws between appearances; `None` when never seen.
    pub avg_every: Option<u64>,
    /// Draws since the last appearance.
    pub current_drought: u64,
    /// Longest historical or current drought.
    pub longest_drought: u64,
    /// Hit rate percentage, two decimals.
    pub win_percentage: f64,
    /// Qualifying draws considered.
    pub total_draws: usize,
    /// Business date of the most recent appearance.
    pub last_appeared: Option<String>,
}

/// Per-number row for hot/cold number presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberEntry {
    /// The number.
    pub number: u8,
    /// Hit rate percentage, two decimals.
    pub win_percentage: f64,
    /// Mean gap between appearances, two decimals; current drought when
    /// fewer than two appearances exist.
    pub average_drought: f64,
    /// Draws since the last appearance.
    pub current_drought: u64,
    /// Longest historical or current drought.
    pub longest_drought: u64,
    /// Business date of the most recent appearance.
    pub last_appeared: Option<String>,
}

/// Hot and cold number lists for one window.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HotColdNumbers {
    /// Most frequent numbers.
    pub hot: Vec<NumberEntry>,
    /// Most overdue numbers.
    pub cold: Vec<NumberEntry>,
}

/// Top-`k` by frequency: count desc, then current drought asc (more recent
/// wins ties), then member values asc.
pub fn rank_hot(tally: &DroughtTally, expected_size: usize, k: usize) -> Vec<RankedCombo> {
    let mut rows = collect(tally, expected_size);
    rows.sort_by(|a, b| {
        b.1.count
            .cmp(&a.1.count)
            .then_with(|| {
                a.1.current_drought(tally.total_draws)
                    .cmp(&b.1.current_drought(tally.total_draws))
            })
            .then_with(|| a.0.values().cmp(b.0.values()))
    });
    finish(rows, tally.total_draws, k)
}

/// Top-`k` by drought: current drought desc, then longest drought desc,
/// then count asc, then member values asc.
pub fn rank_cold(tally: &DroughtTally, expected_size: usize, k: usize) -> Vec<RankedCombo> {
    let total = tally.total_draws;
    let mut rows = collect(tally, expected_size);
    rows.sort_by(|a, b| {
        b.1.current_drought(total)
            .cmp(&a.1.current_drought(total))
            .then_with(|| b.1.longest_drought(total).cmp(&a.1.longest_drought(total)))
            .then_with(|| a.1.count.cmp(&b.1.count))
            .then_with(|| a.0.values().cmp(b.0.values()))
    });
    finish(rows, total, k)
}

/// Applies 1-based pagination to an already-ranked list, preserving the
/// original ranks.
pub fn paginate(ranked: Vec<RankedCombo>, page: usize, limit: usize) -> Vec<RankedCombo> {
    if limit == 0 {
        return ranked;
    }
    let page = page.max(1);
    let start = (page - 1).saturating_mul(limit);
    ranked.into_iter().skip(start).take(limit).collect()
}

/// Top-`k` hot and cold single numbers across the game's whole domain.
/// Numbers never drawn in the window appear with a full-window drought.
pub fn hot_cold_numbers(tally: &DroughtTally, game: GameKind, k: usize) -> HotColdNumbers {
    let total = tally.total_draws;
    let default = ComboStat::default();

    let mut rows: Vec<(u8, &ComboStat)> = (1..=game.domain_max())
        .map(|n| {
            let stat = tally
                .stats
                .get(&ComboKey::boxed(&[n]))
                .unwrap_or(&default);
            (n, stat)
        })
        .collect();

    let mut hot = rows.clone();
    hot.sort_by(|a, b| {
        b.1.count
            .cmp(&a.1.count)
            .then_with(|| a.1.current_drought(total).cmp(&b.1.current_drought(total)))
            .then_with(|| a.0.cmp(&b.0))
    });

    rows.sort_by(|a, b| {
        b.1.current_drought(total)
            .cmp(&a.1.current_drought(total))
            .then_with(|| b.1.longest_drought(total).cmp(&a.1.longest_drought(total)))
            .then_with(|| a.1.count.cmp(&b.1.count))
            .then_with(|| a.0.cmp(&b.0))
    });

    HotColdNumbers {
        hot: hot.into_iter().take(k).map(|r| number_entry(r, total)).collect(),
        cold: rows.into_iter().take(k).map(|r| number_entry(r, total)).collect(),
    }
}

fn number_entry((number, stat): (u8, &ComboStat), total: usize) -> NumberEntry {
    NumberEntry {
        number,
        win_percentage: stat.win_percentage(total),
        average_drought: stat
            .average_gap()
            .unwrap_or(stat.current_drought(total) as f64),
        current_drought: stat.current_drought(total),
        longest_drought: stat.longest_drought(total),
        last_appeared: stat.last_date.clone(),
    }
}

// Keys that do not decompose into exactly the expected size guard against
// malformed aggregation keys and are dropped before ranking.
fn collect(tally: &DroughtTally, expected_size: usize) -> Vec<(&ComboKey, &ComboStat)> {
    tally
        .stats
        .iter()
        .filter(|(key, _)| key.len() == expected_size)
        .collect()
}

fn finish(rows: Vec<(&ComboKey, &ComboStat)>, total: usize, k: usize) -> Vec<RankedCombo> {
    rows.into_iter()
        .take(k)
        .enumerate()
        .map(|(i, (key, stat))| RankedCombo {
            rank: i + 1,
            combination: key.values().to_vec(),
            combo_key: key.to_string(),
            frequency: stat.count,
            avg_every: stat.avg_every(total),
            current_drought: stat.current_drought(total),
            longest_drought: stat.longest_drought(total),
            win_percentage: stat.win_percentage(total),
            total_draws: total,
            last_appeared: stat.last_date.clone(),
        })
        .collect()
}
