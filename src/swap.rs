//! Swap-request records and read-side views.

use serde::{Deserialize, Serialize};

use crate::types::{RequestId, SlotId, SwapStatus, UserId};

/// Authoritative swap request between two slots and two parties.
///
/// Terminal requests are retained for history; a request is never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequestRecord {
    /// Stable request identifier.
    pub id: RequestId,
    /// Slot put up by the requester.
    pub offered_slot: SlotId,
    /// Slot the requester wants in exchange.
    pub requested_slot: SlotId,
    /// User who proposed the swap; owner of `offered_slot` at creation.
    pub requester: UserId,
    /// User who decides; owner of `requested_slot` at creation.
    pub recipient: UserId,
    /// Lifecycle status.
    pub status: SwapStatus,
    /// Creation timestamp, milliseconds since epoch.
    pub created_ms: u64,
}

/// Display view of a pending request, annotated with the counterparty side.
///
/// For outgoing requests the counterparty slot is the one being requested;
/// for incoming requests it is the one being offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequestView {
    /// Request identifier.
    pub id: RequestId,
    /// Request status.
    pub status: SwapStatus,
    /// Title of the counterparty's slot.
    pub counterparty_slot_title: String,
    /// Display name of the counterparty.
    pub counterparty_name: String,
    /// Creation timestamp, milliseconds since epoch.
    pub created_ms: u64,
}
