use hashbrown::HashMap;

use crate::types::{RequestId, SlotId};

/// Index of slots currently claimed by a non-terminal swap request.
///
/// A slot may be referenced by at most one pending request at a time, as
/// offered or requested side. The guard tracks that reference so a proposal
/// touching a claimed slot is refused before any state changes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConflictGuard {
    active: HashMap<SlotId, RequestId>,
}

impl ConflictGuard {
    /// Returns the pending request claiming `slot`, if any.
    pub fn active_request(&self, slot: SlotId) -> Option<RequestId> {
        self.active.get(&slot).copied()
    }

    /// Checks that neither slot of a pair is already claimed.
    ///
    /// On failure returns the first claimed slot and the request holding it.
    pub fn check_pair(&self, a: SlotId, b: SlotId) -> Result<(), (SlotId, RequestId)> {
        for slot in [a, b] {
            if let Some(request) = self.active_request(slot) {
                return Err((slot, request));
            }
        }
        Ok(())
    }

    /// Records `request` as the active claim on both slots.
    pub fn claim_pair(&mut self, a: SlotId, b: SlotId, request: RequestId) {
        self.active.insert(a, request);
        self.active.insert(b, request);
    }

    /// Drops the active claim on both slots.
    pub fn release_pair(&mut self, a: SlotId, b: SlotId) {
        self.active.remove(&a);
        self.active.remove(&b);
    }

    /// Number of slots currently claimed.
    pub fn claimed_len(&self) -> usize {
        self.active.len()
    }
}
