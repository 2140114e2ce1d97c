//! Shared primitive IDs and draw-source enums.

use serde::{Deserialize, Serialize};

/// Monotonic draw record identifier.
pub type DrawId = u64;
/// Monotonic operation sequence number.
pub type OpSeq = u64;

/// Regional source partition a draw was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Jurisdiction {
    /// New South Wales.
    Nsw,
    /// Victoria.
    Vic,
    /// Australian Capital Territory.
    Act,
    /// South Australia.
    Sa,
}

impl Jurisdiction {
    /// Parses a location code as used by the upstream site.
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "NSW" => Some(Self::Nsw),
            "VIC" => Some(Self::Vic),
            "ACT" => Some(Self::Act),
            "SA" => Some(Self::Sa),
            _ => None,
        }
    }

    /// Canonical location code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Nsw => "NSW",
            Self::Vic => "VIC",
            Self::Act => "ACT",
            Self::Sa => "SA",
        }
    }
}

/// Game family a draw record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameKind {
    /// Keno: 20 numbers drawn from 1-80.
    Keno,
    /// Trackside: up to 4 finishing horse numbers from 1-12.
    Trackside,
}

impl GameKind {
    /// Largest valid outcome value for this game.
    pub fn domain_max(&self) -> u8 {
        match self {
            Self::Keno => 80,
            Self::Trackside => 12,
        }
    }

    /// Stable lowercase tag used in persisted cache rows.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Keno => "keno",
            Self::Trackside => "trackside",
        }
    }
}
