//! Shared primitive IDs and status enums.

use serde::{Deserialize, Serialize};

/// Monotonic user identifier.
pub type UserId = u64;
/// Monotonic calendar-slot identifier.
pub type SlotId = u64;
/// Monotonic swap-request identifier.
pub type RequestId = u64;
/// Monotonic operation sequence number.
pub type OpSeq = u64;

/// Lifecycle status of a calendar slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotStatus {
    /// Held by its owner and not offered for trade.
    Free,
    /// Offered for trade by its owner.
    Swappable,
    /// Claimed by exactly one pending swap request.
    SwapPending,
}

/// Lifecycle status of a swap request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapStatus {
    /// Awaiting the recipient's decision.
    Pending,
    /// Recipient accepted; ownership was exchanged.
    Accepted,
    /// Recipient rejected; ownership unchanged.
    Rejected,
}

impl SwapStatus {
    /// Returns true for the non-terminal state.
    pub fn is_active(self) -> bool {
        matches!(self, SwapStatus::Pending)
    }
}
