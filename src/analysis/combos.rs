//! Combination keys, per-draw enumeration, and candidate sampling.

use std::fmt;

use hashbrown::HashSet;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{draw::DrawRecord, types::GameKind};

/// Default attempt budget for randomized candidate generation.
pub const DEFAULT_SAMPLE_ATTEMPTS: usize = 1000;

/// How combination members are matched against a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComboMode {
    /// Order-insensitive (Quinella-style, Keno subsets). Keys canonicalize
    /// by sorting.
    Boxed,
    /// Order-sensitive (Exacta/Trifecta/First Four). Finishing order is
    /// preserved verbatim because payout depends on exact placing.
    Ordered,
}

/// Canonical identity of one tracked combination.
///
/// Equal combinations normalize to the same key regardless of discovery
/// order for boxed matching; ordered keys keep their tuple order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComboKey {
    values: Vec<u8>,
}

impl ComboKey {
    /// Order-insensitive key: members are sorted.
    pub fn boxed(values: &[u8]) -> Self {
        let mut v = values.to_vec();
        v.sort_unstable();
        Self { values: v }
    }

    /// Order-sensitive key: members kept verbatim.
    pub fn ordered(values: &[u8]) -> Self {
        Self {
            values: values.to_vec(),
        }
    }

    /// Member values in key order.
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a zero-member key.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parses a `"1-2-3"` key as persisted in the combo cache.
    pub fn parse(key: &str) -> Option<Self> {
        let mut values = Vec::new();
        for part in key.split('-') {
            values.push(part.trim().parse::<u8>().ok()?);
        }
        if values.is_empty() {
            return None;
        }
        Some(Self { values })
    }
}

impl fmt::Display for ComboKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, "-")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// All size-`k` sub-combinations of `outcome`, each exactly once.
///
/// Members are sorted first so every subset canonicalizes identically.
/// Only safe for a single draw's winning set or small domains; the full
/// number space is never enumerated this way.
pub fn enumerate_boxed(outcome: &[u8], k: usize) -> Vec<ComboKey> {
    if k == 0 || outcome.len() < k {
        return Vec::new();
    }

    let mut pool = outcome.to_vec();
    pool.sort_unstable();

    let mut out = Vec::new();
    let mut current = Vec::with_capacity(k);
    choose(&pool, k, 0, &mut current, &mut out);
    out
}

fn choose(pool: &[u8], k: usize, start: usize, current: &mut Vec<u8>, out: &mut Vec<ComboKey>) {
    if current.len() == k {
        out.push(ComboKey {
            values: current.clone(),
        });
        return;
    }

    let needed = k - current.len();
    // Short-circuit once the remaining candidates cannot fill the slots.
    for i in start..=pool.len().saturating_sub(needed) {
        current.push(pool[i]);
        choose(pool, k, i + 1, current, out);
        current.pop();
    }
}

/// The exact top-`k` finishing-order tuple, or `None` when fewer than `k`
/// qualifying entries exist.
pub fn ordered_prefix(outcome: &[u8], k: usize) -> Option<ComboKey> {
    if k == 0 || outcome.len() < k {
        return None;
    }
    Some(ComboKey::ordered(&outcome[..k]))
}

/// The top-`k` finishers as an unordered (boxed) set.
pub fn boxed_prefix(outcome: &[u8], k: usize) -> Option<ComboKey> {
    if k == 0 || outcome.len() < k {
        return None;
    }
    Some(ComboKey::boxed(&outcome[..k]))
}

/// Qualifying combinations contributed by one draw.
///
/// Keno draws contribute every size-`size` subset of the winning numbers;
/// Trackside races contribute a single top-`size` key, boxed or ordered
/// per `mode`. A draw with fewer qualifying entries than `size` contributes
/// nothing. Callers are expected to have filtered malformed records.
pub fn draw_combinations(rec: &DrawRecord, size: usize, mode: ComboMode) -> Vec<ComboKey> {
    let numbers = rec.outcome.numbers();
    match rec.game() {
        GameKind::Keno => enumerate_boxed(numbers, size),
        GameKind::Trackside => {
            let key = match mode {
                ComboMode::Boxed => boxed_prefix(numbers, size),
                ComboMode::Ordered => ordered_prefix(numbers, size),
            };
            key.into_iter().collect()
        }
    }
}

/// Randomly samples up to `want` size-`size` boxed combinations from the
/// game's full domain that are absent from `seen`, giving up after
/// `attempts` rejection-tested draws.
///
/// Exhaustive enumeration of C(80, k) is infeasible, so overdue-candidate
/// proposal works by sampling with a bounded budget instead.
pub fn sample_unseen<R: Rng>(
    game: GameKind,
    size: usize,
    seen: &HashSet<ComboKey>,
    want: usize,
    attempts: usize,
    rng: &mut R,
) -> Vec<ComboKey> {
    let domain = game.domain_max();
    if size == 0 || size > usize::from(domain) {
        return Vec::new();
    }

    let mut picked: HashSet<ComboKey> = HashSet::new();
    let mut out = Vec::new();

    for _ in 0..attempts {
        if out.len() >= want {
            break;
        }

        let mut values: Vec<u8> = Vec::with_capacity(size);
        while values.len() < size {
            let v = rng.gen_range(1..=domain);
            if !values.contains(&v) {
                values.push(v);
            }
        }

        let key = ComboKey::boxed(&values);
        if seen.contains(&key) || !picked.insert(key.clone()) {
            continue;
        }
        out.push(key);
    }

    out
}

/// C(n, k) without overflow for the domains handled here.
pub fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = acc * u128::from(n - i) / u128::from(i + 1);
    }
    acc as u64
}
