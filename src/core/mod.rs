//! In-memory authoritative store and canonical draw ordering.

/// Canonical draw comparator underlying all drought math.
pub mod ordering;
/// Authoritative append-only draw store.
pub mod store;
