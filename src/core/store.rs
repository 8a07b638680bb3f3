use std::time::{SystemTime, UNIX_EPOCH};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{
    core::guard::ConflictGuard,
    op::{Op, StoredOp},
    slot::{SlotDraft, SlotRecord, SwappableSlotView, UserProfile},
    state::{self, InvalidTransition},
    swap::{SwapRequestRecord, SwapRequestView},
    types::{OpSeq, RequestId, SlotId, SlotStatus, SwapStatus, UserId},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    SlotNotFound(SlotId),
    RequestNotFound(RequestId),
    UserNotFound(UserId),
    NotOwner {
        slot: SlotId,
        owner: UserId,
        acting: UserId,
    },
    NotAuthorized {
        request: RequestId,
        recipient: UserId,
        acting: UserId,
    },
    InvalidTransition(InvalidTransition),
    SlotNotSwappable {
        slot: SlotId,
        status: SlotStatus,
    },
    SlotAlreadyPending {
        slot: SlotId,
        request: RequestId,
    },
    SameSlot(SlotId),
    AlreadyResolved {
        request: RequestId,
        status: SwapStatus,
    },
    InvalidTimeRange {
        start_ms: u64,
        end_ms: u64,
    },
    Conflict {
        slot: Option<SlotId>,
        request: Option<RequestId>,
    },
}

impl From<InvalidTransition> for StoreError {
    fn from(value: InvalidTransition) -> Self {
        Self::InvalidTransition(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshotV1 {
    pub next_user_id: UserId,
    pub next_slot_id: SlotId,
    pub next_request_id: RequestId,
    pub next_op_seq: OpSeq,
    pub users: Vec<UserProfile>,
    pub slots: Vec<SlotRecord>,
    pub requests: Vec<SwapRequestRecord>,
}

#[derive(Debug)]
pub struct SwapStore {
    users: HashMap<UserId, UserProfile>,
    slots: HashMap<SlotId, SlotRecord>,
    requests: HashMap<RequestId, SwapRequestRecord>,
    slots_by_owner: HashMap<UserId, Vec<SlotId>>,
    guard: ConflictGuard,
    pending_ops: Vec<StoredOp>,
    next_user_id: UserId,
    next_slot_id: SlotId,
    next_request_id: RequestId,
    next_op_seq: OpSeq,
}

impl Default for SwapStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SwapStore {
    /// Ids and op sequences start at 1; sequence 0 means "nothing replayed"
    /// to the journal.
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            slots: HashMap::new(),
            requests: HashMap::new(),
            slots_by_owner: HashMap::new(),
            guard: ConflictGuard::default(),
            pending_ops: Vec::new(),
            next_user_id: 1,
            next_slot_id: 1,
            next_request_id: 1,
            next_op_seq: 1,
        }
    }

    pub fn from_snapshot(snapshot: StoreSnapshotV1) -> Result<Self, StoreError> {
        let mut store = Self {
            next_user_id: snapshot.next_user_id,
            next_slot_id: snapshot.next_slot_id,
            next_request_id: snapshot.next_request_id,
            next_op_seq: snapshot.next_op_seq,
            ..Self::new()
        };

        for user in snapshot.users {
            store.users.insert(user.id, user);
        }

        for slot in snapshot.slots {
            store
                .slots_by_owner
                .entry(slot.owner)
                .or_default()
                .push(slot.id);
            store.slots.insert(slot.id, slot);
        }

        for req in snapshot.requests {
            if req.status.is_active() {
                store
                    .guard
                    .check_pair(req.offered_slot, req.requested_slot)
                    .map_err(|(slot, request)| StoreError::Conflict {
                        slot: Some(slot),
                        request: Some(request),
                    })?;
                store
                    .guard
                    .claim_pair(req.offered_slot, req.requested_slot, req.id);
            }
            store.requests.insert(req.id, req);
        }

        Ok(store)
    }

    pub fn export_snapshot(&self) -> StoreSnapshotV1 {
        let mut users: Vec<UserProfile> = self.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        let mut slots: Vec<SlotRecord> = self.slots.values().cloned().collect();
        slots.sort_by_key(|s| s.id);
        let mut requests: Vec<SwapRequestRecord> = self.requests.values().cloned().collect();
        requests.sort_by_key(|r| r.id);

        StoreSnapshotV1 {
            next_user_id: self.next_user_id,
            next_slot_id: self.next_slot_id,
            next_request_id: self.next_request_id,
            next_op_seq: self.next_op_seq,
            users,
            slots,
            requests,
        }
    }

    // ---- mutations -------------------------------------------------------

    pub fn register_user(&mut self, name: String) -> Result<(UserId, StoredOp), StoreError> {
        let id = self.next_user_id;
        self.next_user_id += 1;

        let user = UserProfile { id, name };
        let stored = self.apply_register_user(user)?;
        self.pending_ops.push(stored.clone());
        Ok((id, stored))
    }

    pub fn create_slot(&mut self, draft: SlotDraft) -> Result<(SlotId, StoredOp), StoreError> {
        if draft.end_ms <= draft.start_ms {
            return Err(StoreError::InvalidTimeRange {
                start_ms: draft.start_ms,
                end_ms: draft.end_ms,
            });
        }
        if !self.users.contains_key(&draft.owner) {
            return Err(StoreError::UserNotFound(draft.owner));
        }

        let id = self.next_slot_id;
        self.next_slot_id += 1;

        let slot = SlotRecord {
            id,
            title: draft.title,
            start_ms: draft.start_ms,
            end_ms: draft.end_ms,
            owner: draft.owner,
            status: SlotStatus::Free,
            created_ms: now_ms(),
        };

        let stored = self.apply_create_slot(slot)?;
        self.pending_ops.push(stored.clone());
        Ok((id, stored))
    }

    /// Owner opt-in/opt-out between `Free` and `Swappable`.
    pub fn set_slot_status(
        &mut self,
        slot: SlotId,
        acting: UserId,
        target: SlotStatus,
    ) -> Result<((), StoredOp), StoreError> {
        let rec = self.slots.get(&slot).ok_or(StoreError::SlotNotFound(slot))?;
        if rec.owner != acting {
            return Err(StoreError::NotOwner {
                slot,
                owner: rec.owner,
                acting,
            });
        }

        let from = rec.status;
        // SwapPending is reserved for the swap engine.
        if target == SlotStatus::SwapPending {
            return Err(InvalidTransition { from, to: target }.into());
        }
        state::transition(from, target)?;
        if let Some(request) = self.guard.active_request(slot) {
            return Err(StoreError::SlotAlreadyPending { slot, request });
        }

        let stored = self.apply_set_slot_status(slot, from, target)?;
        self.pending_ops.push(stored.clone());
        Ok(((), stored))
    }

    /// Proposes a swap of `offered` (owned by `requester`) for `requested`.
    ///
    /// Both slots must be `Swappable`, owned by different users, and free of
    /// any in-flight swap. On success both slots move to `SwapPending` and a
    /// `Pending` request is committed as a single journal op.
    pub fn propose(
        &mut self,
        offered: SlotId,
        requested: SlotId,
        requester: UserId,
    ) -> Result<(SwapRequestRecord, StoredOp), StoreError> {
        if offered == requested {
            return Err(StoreError::SameSlot(offered));
        }

        let offered_rec = self
            .slots
            .get(&offered)
            .ok_or(StoreError::SlotNotFound(offered))?;
        let requested_rec = self
            .slots
            .get(&requested)
            .ok_or(StoreError::SlotNotFound(requested))?;

        if offered_rec.owner != requester {
            return Err(StoreError::NotOwner {
                slot: offered,
                owner: offered_rec.owner,
                acting: requester,
            });
        }
        if requested_rec.owner == requester {
            return Err(StoreError::NotOwner {
                slot: requested,
                owner: requested_rec.owner,
                acting: requester,
            });
        }

        // Guard first: a claimed slot reports the in-flight swap rather
        // than its transient SwapPending status.
        self.guard
            .check_pair(offered, requested)
            .map_err(|(slot, request)| StoreError::SlotAlreadyPending { slot, request })?;

        for rec in [offered_rec, requested_rec] {
            if rec.status != SlotStatus::Swappable {
                return Err(StoreError::SlotNotSwappable {
                    slot: rec.id,
                    status: rec.status,
                });
            }
        }

        let recipient = requested_rec.owner;
        let id = self.next_request_id;
        self.next_request_id += 1;

        let request = SwapRequestRecord {
            id,
            offered_slot: offered,
            requested_slot: requested,
            requester,
            recipient,
            status: SwapStatus::Pending,
            created_ms: now_ms(),
        };

        let stored = self.apply_propose(request.clone())?;
        self.pending_ops.push(stored.clone());
        Ok((request, stored))
    }

    pub fn accept(
        &mut self,
        request: RequestId,
        acting: UserId,
    ) -> Result<(SwapRequestRecord, StoredOp), StoreError> {
        self.resolve(request, acting, SwapStatus::Accepted)
    }

    pub fn reject(
        &mut self,
        request: RequestId,
        acting: UserId,
    ) -> Result<(SwapRequestRecord, StoredOp), StoreError> {
        self.resolve(request, acting, SwapStatus::Rejected)
    }

    fn resolve(
        &mut self,
        request: RequestId,
        acting: UserId,
        outcome: SwapStatus,
    ) -> Result<(SwapRequestRecord, StoredOp), StoreError> {
        let rec = self
            .requests
            .get(&request)
            .ok_or(StoreError::RequestNotFound(request))?;

        if rec.status != SwapStatus::Pending {
            return Err(StoreError::AlreadyResolved {
                request,
                status: rec.status,
            });
        }
        if rec.recipient != acting {
            return Err(StoreError::NotAuthorized {
                request,
                recipient: rec.recipient,
                acting,
            });
        }

        let stored = self.apply_resolve(request, outcome)?;
        self.pending_ops.push(stored.clone());
        let resolved = self
            .requests
            .get(&request)
            .cloned()
            .ok_or(StoreError::RequestNotFound(request))?;
        Ok((resolved, stored))
    }

    pub fn apply_replayed_op(&mut self, stored: StoredOp) -> Result<(), StoreError> {
        let seq = stored.seq;
        match stored.op {
            Op::RegisterUser { user } => {
                self.next_user_id = self.next_user_id.max(user.id.saturating_add(1));
                self.apply_register_user_with_seq(user, seq)?;
            }
            Op::CreateSlot { slot } => {
                self.next_slot_id = self.next_slot_id.max(slot.id.saturating_add(1));
                self.apply_create_slot_with_seq(slot, seq)?;
            }
            Op::SetSlotStatus { slot, from, to } => {
                self.apply_set_slot_status_with_seq(slot, from, to, seq)?;
            }
            Op::Propose { request } => {
                self.next_request_id = self.next_request_id.max(request.id.saturating_add(1));
                self.apply_propose_with_seq(request, seq)?;
            }
            Op::Resolve { request, outcome } => {
                self.apply_resolve_with_seq(request, outcome, seq)?;
            }
        }
        Ok(())
    }

    // ---- reads -----------------------------------------------------------

    pub fn get_user(&self, id: UserId) -> Option<&UserProfile> {
        self.users.get(&id)
    }

    pub fn get_slot(&self, id: SlotId) -> Option<&SlotRecord> {
        self.slots.get(&id)
    }

    pub fn get_slot_cloned(&self, id: SlotId) -> Option<SlotRecord> {
        self.get_slot(id).cloned()
    }

    pub fn get_request(&self, id: RequestId) -> Option<&SwapRequestRecord> {
        self.requests.get(&id)
    }

    pub fn get_request_cloned(&self, id: RequestId) -> Option<SwapRequestRecord> {
        self.get_request(id).cloned()
    }

    pub fn active_request_on(&self, slot: SlotId) -> Option<RequestId> {
        self.guard.active_request(slot)
    }

    /// All slots owned by `user`, ascending by start time.
    pub fn slots_for_user(&self, user: UserId) -> Vec<SlotRecord> {
        let mut out: Vec<SlotRecord> = self
            .slots_by_owner
            .get(&user)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.slots.get(id).cloned())
            .collect();
        out.sort_by_key(|s| (s.start_ms, s.id));
        out
    }

    /// Marketplace listing: slots offered for trade by other users,
    /// ascending by start time, annotated with the owner's name.
    pub fn swappable_slots(&self, excluding: UserId) -> Vec<SwappableSlotView> {
        let mut out: Vec<SwappableSlotView> = self
            .slots
            .values()
            .filter(|s| s.status == SlotStatus::Swappable && s.owner != excluding)
            .filter_map(|s| {
                let owner = self.users.get(&s.owner)?;
                Some(SwappableSlotView {
                    id: s.id,
                    title: s.title.clone(),
                    start_ms: s.start_ms,
                    end_ms: s.end_ms,
                    owner: s.owner,
                    owner_name: owner.name.clone(),
                })
            })
            .collect();
        out.sort_by_key(|s| (s.start_ms, s.id));
        out
    }

    /// Pending requests involving `user`, split into (outgoing, incoming).
    ///
    /// Outgoing rows are annotated with the requested slot and its owner;
    /// incoming rows with the offered slot and its owner. Both sides are
    /// ordered newest-first by creation time, ties broken by request id.
    pub fn list_for_user(&self, user: UserId) -> (Vec<SwapRequestView>, Vec<SwapRequestView>) {
        let mut outgoing = Vec::new();
        let mut incoming = Vec::new();

        for req in self.requests.values() {
            if req.status != SwapStatus::Pending {
                continue;
            }
            if req.requester == user {
                if let Some(view) = self.request_view(req, req.requested_slot, req.recipient) {
                    outgoing.push(view);
                }
            } else if req.recipient == user {
                if let Some(view) = self.request_view(req, req.offered_slot, req.requester) {
                    incoming.push(view);
                }
            }
        }

        let newest_first =
            |a: &SwapRequestView, b: &SwapRequestView| (b.created_ms, b.id).cmp(&(a.created_ms, a.id));
        outgoing.sort_by(newest_first);
        incoming.sort_by(newest_first);
        (outgoing, incoming)
    }

    fn request_view(
        &self,
        req: &SwapRequestRecord,
        counterparty_slot: SlotId,
        counterparty: UserId,
    ) -> Option<SwapRequestView> {
        let slot = self.slots.get(&counterparty_slot)?;
        let user = self.users.get(&counterparty)?;
        Some(SwapRequestView {
            id: req.id,
            status: req.status,
            counterparty_slot_title: slot.title.clone(),
            counterparty_name: user.name.clone(),
            created_ms: req.created_ms,
        })
    }

    pub fn drain_pending_ops(&mut self) -> Vec<StoredOp> {
        std::mem::take(&mut self.pending_ops)
    }

    pub fn latest_op_seq(&self) -> OpSeq {
        self.next_op_seq.saturating_sub(1)
    }

    // ---- apply layer: conditional writes shared with journal replay ------

    fn apply_register_user(&mut self, user: UserProfile) -> Result<StoredOp, StoreError> {
        let seq = self.take_next_op_seq();
        self.apply_register_user_with_seq(user, seq)
    }

    fn apply_register_user_with_seq(
        &mut self,
        user: UserProfile,
        seq: OpSeq,
    ) -> Result<StoredOp, StoreError> {
        if self.users.contains_key(&user.id) {
            return Err(StoreError::Conflict {
                slot: None,
                request: None,
            });
        }
        self.users.insert(user.id, user.clone());
        self.bump_next_seq_from(seq);
        Ok(StoredOp {
            seq,
            ts_ms: now_ms(),
            op: Op::RegisterUser { user },
        })
    }

    fn apply_create_slot(&mut self, slot: SlotRecord) -> Result<StoredOp, StoreError> {
        let seq = self.take_next_op_seq();
        self.apply_create_slot_with_seq(slot, seq)
    }

    fn apply_create_slot_with_seq(
        &mut self,
        slot: SlotRecord,
        seq: OpSeq,
    ) -> Result<StoredOp, StoreError> {
        if self.slots.contains_key(&slot.id) {
            return Err(StoreError::Conflict {
                slot: Some(slot.id),
                request: None,
            });
        }
        self.slots_by_owner
            .entry(slot.owner)
            .or_default()
            .push(slot.id);
        self.slots.insert(slot.id, slot.clone());
        self.bump_next_seq_from(seq);
        Ok(StoredOp {
            seq,
            ts_ms: now_ms(),
            op: Op::CreateSlot { slot },
        })
    }

    fn apply_set_slot_status(
        &mut self,
        slot: SlotId,
        from: SlotStatus,
        to: SlotStatus,
    ) -> Result<StoredOp, StoreError> {
        let seq = self.take_next_op_seq();
        self.apply_set_slot_status_with_seq(slot, from, to, seq)
    }

    fn apply_set_slot_status_with_seq(
        &mut self,
        slot: SlotId,
        from: SlotStatus,
        to: SlotStatus,
        seq: OpSeq,
    ) -> Result<StoredOp, StoreError> {
        self.cas_slot_status(slot, from, to)?;
        self.bump_next_seq_from(seq);
        Ok(StoredOp {
            seq,
            ts_ms: now_ms(),
            op: Op::SetSlotStatus { slot, from, to },
        })
    }

    fn apply_propose(&mut self, request: SwapRequestRecord) -> Result<StoredOp, StoreError> {
        let seq = self.take_next_op_seq();
        self.apply_propose_with_seq(request, seq)
    }

    fn apply_propose_with_seq(
        &mut self,
        request: SwapRequestRecord,
        seq: OpSeq,
    ) -> Result<StoredOp, StoreError> {
        if self.requests.contains_key(&request.id) {
            return Err(StoreError::Conflict {
                slot: None,
                request: Some(request.id),
            });
        }
        self.guard
            .check_pair(request.offered_slot, request.requested_slot)
            .map_err(|(slot, holder)| StoreError::Conflict {
                slot: Some(slot),
                request: Some(holder),
            })?;

        // Claim both slots; back out the first if the second fails so a
        // refused op leaves nothing behind.
        self.cas_slot_status(
            request.offered_slot,
            SlotStatus::Swappable,
            SlotStatus::SwapPending,
        )?;
        if let Err(err) = self.cas_slot_status(
            request.requested_slot,
            SlotStatus::Swappable,
            SlotStatus::SwapPending,
        ) {
            self.force_slot_status(request.offered_slot, SlotStatus::Swappable);
            return Err(err);
        }

        self.guard
            .claim_pair(request.offered_slot, request.requested_slot, request.id);
        self.requests.insert(request.id, request.clone());
        self.bump_next_seq_from(seq);
        Ok(StoredOp {
            seq,
            ts_ms: now_ms(),
            op: Op::Propose { request },
        })
    }

    fn apply_resolve(
        &mut self,
        request: RequestId,
        outcome: SwapStatus,
    ) -> Result<StoredOp, StoreError> {
        let seq = self.take_next_op_seq();
        self.apply_resolve_with_seq(request, outcome, seq)
    }

    fn apply_resolve_with_seq(
        &mut self,
        request: RequestId,
        outcome: SwapStatus,
        seq: OpSeq,
    ) -> Result<StoredOp, StoreError> {
        let accepted = match outcome {
            SwapStatus::Accepted => true,
            SwapStatus::Rejected => false,
            SwapStatus::Pending => {
                return Err(StoreError::Conflict {
                    slot: None,
                    request: Some(request),
                });
            }
        };

        let rec = self
            .requests
            .get(&request)
            .ok_or(StoreError::RequestNotFound(request))?;
        if rec.status != SwapStatus::Pending {
            return Err(StoreError::Conflict {
                slot: None,
                request: Some(request),
            });
        }

        let offered = rec.offered_slot;
        let requested = rec.requested_slot;

        for slot in [offered, requested] {
            let status = self
                .slots
                .get(&slot)
                .map(|s| s.status)
                .ok_or(StoreError::SlotNotFound(slot))?;
            if status != SlotStatus::SwapPending {
                return Err(StoreError::Conflict {
                    slot: Some(slot),
                    request: Some(request),
                });
            }
        }

        if accepted {
            self.exchange_owners(offered, requested)?;
            self.cas_slot_status(offered, SlotStatus::SwapPending, SlotStatus::Free)?;
            self.cas_slot_status(requested, SlotStatus::SwapPending, SlotStatus::Free)?;
        } else {
            self.cas_slot_status(offered, SlotStatus::SwapPending, SlotStatus::Swappable)?;
            self.cas_slot_status(requested, SlotStatus::SwapPending, SlotStatus::Swappable)?;
        }

        self.guard.release_pair(offered, requested);
        if let Some(rec) = self.requests.get_mut(&request) {
            rec.status = outcome;
        }
        self.bump_next_seq_from(seq);
        Ok(StoredOp {
            seq,
            ts_ms: now_ms(),
            op: Op::Resolve { request, outcome },
        })
    }

    fn cas_slot_status(
        &mut self,
        slot: SlotId,
        expected: SlotStatus,
        to: SlotStatus,
    ) -> Result<(), StoreError> {
        let rec = self.slots.get_mut(&slot).ok_or(StoreError::SlotNotFound(slot))?;
        if rec.status != expected {
            return Err(StoreError::Conflict {
                slot: Some(slot),
                request: None,
            });
        }
        rec.status = state::transition(expected, to)?;
        Ok(())
    }

    fn force_slot_status(&mut self, slot: SlotId, status: SlotStatus) {
        if let Some(rec) = self.slots.get_mut(&slot) {
            rec.status = status;
        }
    }

    fn exchange_owners(&mut self, a: SlotId, b: SlotId) -> Result<(), StoreError> {
        let owner_a = self
            .slots
            .get(&a)
            .map(|s| s.owner)
            .ok_or(StoreError::SlotNotFound(a))?;
        let owner_b = self
            .slots
            .get(&b)
            .map(|s| s.owner)
            .ok_or(StoreError::SlotNotFound(b))?;

        if let Some(rec) = self.slots.get_mut(&a) {
            rec.owner = owner_b;
        }
        if let Some(rec) = self.slots.get_mut(&b) {
            rec.owner = owner_a;
        }

        Self::remove_from_vec_index(self.slots_by_owner.entry(owner_a).or_default(), a);
        Self::remove_from_vec_index(self.slots_by_owner.entry(owner_b).or_default(), b);
        self.slots_by_owner.entry(owner_b).or_default().push(a);
        self.slots_by_owner.entry(owner_a).or_default().push(b);
        Ok(())
    }

    fn remove_from_vec_index(v: &mut Vec<SlotId>, id: SlotId) {
        if let Some(pos) = v.iter().position(|x| *x == id) {
            v.remove(pos);
        }
    }

    fn take_next_op_seq(&mut self) -> OpSeq {
        let seq = self.next_op_seq;
        self.next_op_seq += 1;
        seq
    }

    fn bump_next_seq_from(&mut self, seq: OpSeq) {
        self.next_op_seq = self.next_op_seq.max(seq.saturating_add(1));
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
