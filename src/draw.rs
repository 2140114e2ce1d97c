//! Draw domain records, insert drafts, and outcome validation.

use serde::{Deserialize, Serialize};

use crate::types::{DrawId, GameKind, Jurisdiction};

/// Game-specific outcome payload of one draw.
///
/// Fields that only matter to presentation (dividends) ride along here but
/// are never read by the drought accumulator core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    /// Keno draw: the 20 winning numbers as scraped.
    Keno {
        /// Drawn numbers, 1-80, order as published.
        numbers: Vec<u8>,
    },
    /// Trackside race: finishing horse numbers, winner first.
    Trackside {
        /// Finishing placings, 1-12, first-past-the-post order.
        placings: Vec<u8>,
        /// Winning dividend in cents, when published.
        dividend_cents: Option<u64>,
    },
}

impl GameOutcome {
    /// Game family this outcome belongs to.
    pub fn game(&self) -> GameKind {
        match self {
            Self::Keno { .. } => GameKind::Keno,
            Self::Trackside { .. } => GameKind::Trackside,
        }
    }

    /// The raw outcome numbers, in published order.
    pub fn numbers(&self) -> &[u8] {
        match self {
            Self::Keno { numbers } => numbers,
            Self::Trackside { placings, .. } => placings,
        }
    }

    /// Dividend side channel, cents. Only Trackside publishes one.
    pub fn dividend_cents(&self) -> Option<u64> {
        match self {
            Self::Keno { .. } => None,
            Self::Trackside { dividend_cents, .. } => *dividend_cents,
        }
    }
}

/// Reason an outcome fails validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeError {
    /// Outcome length outside the game's expected bounds.
    BadLength {
        /// Observed length.
        got: usize,
    },
    /// A value of zero, i.e. a scratched/invalid entry.
    ZeroEntry,
    /// A value above the game's domain maximum.
    OutOfDomain {
        /// Offending value.
        value: u8,
    },
    /// The same value appears twice in one outcome.
    Duplicate {
        /// Repeated value.
        value: u8,
    },
}

impl GameKind {
    /// Checks outcome length, domain range, zero entries, and duplicates.
    ///
    /// Records failing this check stay in the store but are skipped by
    /// every analysis pass.
    pub fn validate_outcome(&self, numbers: &[u8]) -> Result<(), OutcomeError> {
        let len_ok = match self {
            Self::Keno => numbers.len() == 20,
            Self::Trackside => (1..=4).contains(&numbers.len()),
        };
        if !len_ok {
            return Err(OutcomeError::BadLength { got: numbers.len() });
        }

        let mut seen = [false; 81];
        for &n in numbers {
            if n == 0 {
                return Err(OutcomeError::ZeroEntry);
            }
            if n > self.domain_max() {
                return Err(OutcomeError::OutOfDomain { value: n });
            }
            if seen[n as usize] {
                return Err(OutcomeError::Duplicate { value: n });
            }
            seen[n as usize] = true;
        }
        Ok(())
    }
}

/// Fully materialized, authoritative draw record.
///
/// Immutable after insert except for outcome repair of a malformed draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    /// Stable store-assigned identifier.
    pub id: DrawId,
    /// Identity assigned by the upstream scraper.
    pub source_id: String,
    /// Source partition the draw was scraped from.
    pub jurisdiction: Jurisdiction,
    /// Published draw/game number, when the site provided one.
    pub draw_number: Option<u64>,
    /// Business date string as scraped; not authoritative for ordering.
    pub date: Option<String>,
    /// Ingestion timestamp in milliseconds since epoch.
    pub created_at_ms: u64,
    /// Outcome payload.
    pub outcome: GameOutcome,
}

impl DrawRecord {
    /// Game family of this record.
    pub fn game(&self) -> GameKind {
        self.outcome.game()
    }

    /// True when the outcome passes the game's validity checks.
    pub fn is_valid(&self) -> bool {
        self.game().validate_outcome(self.outcome.numbers()).is_ok()
    }
}

/// Insert payload used to create a new [`DrawRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawDraft {
    /// Identity assigned by the upstream scraper.
    pub source_id: String,
    /// Source partition the draw was scraped from.
    pub jurisdiction: Jurisdiction,
    /// Published draw/game number, when the site provided one.
    pub draw_number: Option<u64>,
    /// Business date string as scraped.
    pub date: Option<String>,
    /// Ingestion timestamp in milliseconds since epoch.
    pub created_at_ms: u64,
    /// Outcome payload.
    pub outcome: GameOutcome,
}
