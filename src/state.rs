//! Slot status transition rules.
//!
//! The transition function is pure: it inspects the current and requested
//! status and either returns the next status or rejects the move. Callers
//! decide when a legal move is additionally blocked by swap activity (e.g.
//! opting out of trading while a request is in flight).

use crate::types::SlotStatus;

/// A transition the state machine refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    /// Status the slot currently holds.
    pub from: SlotStatus,
    /// Status that was requested.
    pub to: SlotStatus,
}

/// Computes the next status for a slot, or fails with [`InvalidTransition`].
///
/// Legal moves:
/// - `Free -> Swappable` (owner opts in to trading)
/// - `Swappable -> Free` (owner opts out)
/// - `Swappable -> SwapPending` (engine, on swap proposal)
/// - `SwapPending -> Free` (engine, on acceptance)
/// - `SwapPending -> Swappable` (engine, on rejection)
pub fn transition(from: SlotStatus, to: SlotStatus) -> Result<SlotStatus, InvalidTransition> {
    use SlotStatus::*;
    match (from, to) {
        (Free, Swappable)
        | (Swappable, Free)
        | (Swappable, SwapPending)
        | (SwapPending, Free)
        | (SwapPending, Swappable) => Ok(to),
        (Free, Free) | (Free, SwapPending) | (Swappable, Swappable) | (SwapPending, SwapPending) => {
            Err(InvalidTransition { from, to })
        }
    }
}
