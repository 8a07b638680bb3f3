//! Calendar-slot records, drafts, and read-side views.

use serde::{Deserialize, Serialize};

use crate::types::{SlotId, SlotStatus, UserId};

/// Registered user, kept so read views can annotate slots with owner names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable user identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
}

/// Fully materialized, authoritative calendar slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    /// Stable slot identifier.
    pub id: SlotId,
    /// Human-readable slot title.
    pub title: String,
    /// Start of the claim, milliseconds since epoch.
    pub start_ms: u64,
    /// End of the claim, milliseconds since epoch. Always after `start_ms`.
    pub end_ms: u64,
    /// Current holder. Changes only on swap acceptance.
    pub owner: UserId,
    /// Lifecycle status.
    pub status: SlotStatus,
    /// Creation timestamp, milliseconds since epoch.
    pub created_ms: u64,
}

/// Insert payload used to create a new [`SlotRecord`].
///
/// New slots start as [`SlotStatus::Free`]; the owner opts into trading
/// separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDraft {
    /// Human-readable slot title.
    pub title: String,
    /// Start of the claim, milliseconds since epoch.
    pub start_ms: u64,
    /// End of the claim, milliseconds since epoch.
    pub end_ms: u64,
    /// Owning user.
    pub owner: UserId,
}

/// Marketplace view of a slot another user has offered for trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwappableSlotView {
    /// Slot identifier.
    pub id: SlotId,
    /// Slot title.
    pub title: String,
    /// Start of the claim, milliseconds since epoch.
    pub start_ms: u64,
    /// End of the claim, milliseconds since epoch.
    pub end_ms: u64,
    /// Owning user.
    pub owner: UserId,
    /// Owner display name.
    pub owner_name: String,
}
