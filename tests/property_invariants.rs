use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

use slotswap::{
    core::store::SwapStore,
    slot::SlotDraft,
    types::{RequestId, SlotId, SlotStatus, UserId},
};

const USERS: usize = 3;
const SLOTS_PER_USER: usize = 2;

#[derive(Debug, Clone)]
enum Action {
    OptIn { slot: u8 },
    OptOut { slot: u8 },
    Propose { offered: u8, requested: u8 },
    Accept { req: u8 },
    Reject { req: u8 },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    let slots = (USERS * SLOTS_PER_USER) as u8;
    prop_oneof![
        (0..slots).prop_map(|slot| Action::OptIn { slot }),
        (0..slots).prop_map(|slot| Action::OptOut { slot }),
        (0..slots, 0..slots).prop_map(|(offered, requested)| Action::Propose { offered, requested }),
        (0u8..64).prop_map(|req| Action::Accept { req }),
        (0u8..64).prop_map(|req| Action::Reject { req }),
    ]
}

fn seeded_store() -> (SwapStore, Vec<UserId>, Vec<SlotId>) {
    let mut store = SwapStore::new();
    let mut users = Vec::new();
    let mut slots = Vec::new();
    for u in 0..USERS {
        let (user, _) = store.register_user(format!("user{u}")).expect("user");
        users.push(user);
        for s in 0..SLOTS_PER_USER {
            let (slot, _) = store
                .create_slot(SlotDraft {
                    title: format!("slot {u}/{s}"),
                    start_ms: (u * 10 + s) as u64 * 1_000,
                    end_ms: (u * 10 + s) as u64 * 1_000 + 500,
                    owner: user,
                })
                .expect("slot");
            slots.push(slot);
        }
    }
    (store, users, slots)
}

fn owner_multiset(store: &SwapStore, slots: &[SlotId]) -> Vec<UserId> {
    let mut owners: Vec<UserId> = slots
        .iter()
        .filter_map(|id| store.get_slot(*id).map(|s| s.owner))
        .collect();
    owners.sort_unstable();
    owners
}

fn check_invariants(
    store: &SwapStore,
    users: &[UserId],
    slots: &[SlotId],
    requests: &[RequestId],
) -> Result<(), TestCaseError> {
    // A slot is claimed by the guard exactly when it is SwapPending.
    let mut pending_slots = 0usize;
    for id in slots {
        let slot = store.get_slot(*id).ok_or_else(|| {
            TestCaseError::fail(format!("slot {id} vanished"))
        })?;
        let claimed = store.active_request_on(*id).is_some();
        prop_assert_eq!(
            claimed,
            slot.status == SlotStatus::SwapPending,
            "slot {} claim/status mismatch",
            id
        );
        if claimed {
            pending_slots += 1;
        }
    }

    // Every pending request claims exactly its two slots, and nothing else
    // holds a claim.
    let mut pending_requests = 0usize;
    for id in requests {
        let req = store.get_request(*id).ok_or_else(|| {
            TestCaseError::fail(format!("request {id} vanished"))
        })?;
        if req.status.is_active() {
            pending_requests += 1;
            prop_assert_eq!(store.active_request_on(req.offered_slot), Some(*id));
            prop_assert_eq!(store.active_request_on(req.requested_slot), Some(*id));
        }
    }
    prop_assert_eq!(pending_slots, pending_requests * 2);

    // Swaps move ownership around but never create or destroy slots.
    let mut by_owner_total = 0usize;
    for user in users {
        let owned = store.slots_for_user(*user);
        for slot in &owned {
            prop_assert_eq!(slot.owner, *user);
        }
        by_owner_total += owned.len();
    }
    prop_assert_eq!(by_owner_total, slots.len());

    Ok(())
}

proptest! {
    #[test]
    fn random_sequences_preserve_guard_and_ownership_invariants(
        actions in prop::collection::vec(action_strategy(), 1..150)
    ) {
        let (mut store, users, slots) = seeded_store();
        let initial_owners = owner_multiset(&store, &slots);
        let mut requests: Vec<RequestId> = Vec::new();

        for action in actions {
            let before = store.export_snapshot();
            let failed = match action {
                Action::OptIn { slot } => {
                    let slot = slots[usize::from(slot) % slots.len()];
                    let owner = store.get_slot(slot).map(|s| s.owner).unwrap_or(0);
                    store.set_slot_status(slot, owner, SlotStatus::Swappable).is_err()
                }
                Action::OptOut { slot } => {
                    let slot = slots[usize::from(slot) % slots.len()];
                    let owner = store.get_slot(slot).map(|s| s.owner).unwrap_or(0);
                    store.set_slot_status(slot, owner, SlotStatus::Free).is_err()
                }
                Action::Propose { offered, requested } => {
                    let offered = slots[usize::from(offered) % slots.len()];
                    let requested = slots[usize::from(requested) % slots.len()];
                    let requester = store.get_slot(offered).map(|s| s.owner).unwrap_or(0);
                    match store.propose(offered, requested, requester) {
                        Ok((req, _)) => {
                            requests.push(req.id);
                            false
                        }
                        Err(_) => true,
                    }
                }
                Action::Accept { req } => {
                    if requests.is_empty() {
                        continue;
                    }
                    let id = requests[usize::from(req) % requests.len()];
                    let acting = store.get_request(id).map(|r| r.recipient).unwrap_or(0);
                    store.accept(id, acting).is_err()
                }
                Action::Reject { req } => {
                    if requests.is_empty() {
                        continue;
                    }
                    let id = requests[usize::from(req) % requests.len()];
                    let acting = store.get_request(id).map(|r| r.recipient).unwrap_or(0);
                    store.reject(id, acting).is_err()
                }
            };

            // A refused operation must leave no trace.
            if failed {
                prop_assert_eq!(store.export_snapshot(), before);
            }

            check_invariants(&store, &users, &slots, &requests)?;
            prop_assert_eq!(owner_multiset(&store, &slots), initial_owners.clone());
        }

        // Replaying the journal from scratch reproduces the exact state.
        let ops = store.drain_pending_ops();
        let mut replayed = SwapStore::new();
        for op in ops {
            replayed.apply_replayed_op(op).expect("replay");
        }
        prop_assert_eq!(replayed.export_snapshot(), store.export_snapshot());
    }
}
