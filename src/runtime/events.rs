//! Runtime event stream payloads.

use crate::types::{OpSeq, RequestId, SlotId, SlotStatus, UserId};

/// Events emitted from the single-writer runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapEvent {
    /// A user profile was registered.
    UserRegistered {
        /// New user id.
        id: UserId,
    },
    /// A calendar slot was created.
    SlotCreated {
        /// New slot id.
        id: SlotId,
    },
    /// A slot owner opted in or out of trading.
    SlotStatusChanged {
        /// Affected slot id.
        slot: SlotId,
        /// Status after the change.
        status: SlotStatus,
    },
    /// A swap was proposed; both slots are now claimed.
    Proposed {
        /// New request id.
        request: RequestId,
    },
    /// A swap was accepted; ownership was exchanged.
    Accepted {
        /// Resolved request id.
        request: RequestId,
    },
    /// A swap was rejected; ownership unchanged.
    Rejected {
        /// Resolved request id.
        request: RequestId,
    },
    /// Persistence has reached at least this op sequence.
    DurableUpTo {
        /// Highest sequence known durable.
        op_seq: OpSeq,
    },
}
