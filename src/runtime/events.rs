//! Runtime event stream payloads.
//!
//! The notification fan-out collaborator (in-app/push/email) subscribes to
//! this stream to react to newly ingested results.

use crate::types::{DrawId, OpSeq};

/// Events emitted from the single-writer runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawEvent {
    /// A new draw result was ingested.
    Inserted {
        /// Inserted draw id.
        id: DrawId,
    },
    /// A malformed draw's outcome was repaired.
    Repaired {
        /// Repaired draw id.
        id: DrawId,
    },
    /// Persistence has reached at least this op sequence.
    DurableUpTo {
        /// Highest sequence known durable.
        op_seq: OpSeq,
    },
}
