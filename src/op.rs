//! Journal operation model and persistence wrappers.
//!
//! Every committed engine mutation is captured as exactly one [`Op`]. A
//! swap proposal or resolution therefore travels to the journal as a single
//! row covering the request change and both slot changes; replay can never
//! observe one slot of a pair updated without the other.

use serde::{Deserialize, Serialize};

use crate::{
    slot::{SlotRecord, UserProfile},
    swap::SwapRequestRecord,
    types::{OpSeq, RequestId, SlotId, SlotStatus, SwapStatus},
};

/// Version number for serialized [`StoredOpEnvelope`] payloads.
pub const OP_FORMAT_VERSION: u16 = 1;

/// Immutable operation appended to the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Register a user profile.
    RegisterUser {
        /// Registered profile.
        user: UserProfile,
    },
    /// Insert a fully materialized slot.
    CreateSlot {
        /// Inserted record.
        slot: SlotRecord,
    },
    /// Owner-driven status move (trading opt-in/opt-out).
    SetSlotStatus {
        /// Slot to mutate.
        slot: SlotId,
        /// Expected status prior to the move.
        from: SlotStatus,
        /// Status after the move.
        to: SlotStatus,
    },
    /// Create a pending swap request and claim both referenced slots.
    Propose {
        /// The new request, status `Pending`.
        request: SwapRequestRecord,
    },
    /// Resolve a pending swap request.
    ///
    /// `Accepted` exchanges slot ownership and frees both slots; `Rejected`
    /// restores both slots to `Swappable` with ownership unchanged.
    Resolve {
        /// Request to resolve.
        request: RequestId,
        /// Terminal outcome, `Accepted` or `Rejected`.
        outcome: SwapStatus,
    },
}

/// Journal row metadata plus operation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOp {
    /// Monotonic operation sequence.
    pub seq: OpSeq,
    /// Operation timestamp in milliseconds.
    pub ts_ms: u64,
    /// Operation body.
    pub op: Op,
}

/// Versioned wrapper for stable on-disk payload decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOpEnvelope {
    /// Payload format version.
    pub format_version: u16,
    /// Wrapped operation.
    pub stored: StoredOp,
}

impl StoredOpEnvelope {
    /// Constructs an envelope using [`OP_FORMAT_VERSION`].
    pub fn new(stored: StoredOp) -> Self {
        Self {
            format_version: OP_FORMAT_VERSION,
            stored,
        }
    }
}
