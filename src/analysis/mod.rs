//! Overdue/drought combinatorial analytics engine.

/// Drought/frequency accumulation over canonically ordered draws.
pub mod accumulator;
/// Combination keys, enumeration, and candidate sampling.
pub mod combos;
/// Ranking and formatting of accumulated statistics.
pub mod ranking;
/// Validated fan-out query boundary.
pub mod service;
