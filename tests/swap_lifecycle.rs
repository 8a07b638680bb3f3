use slotswap::{
    core::store::{StoreError, SwapStore},
    slot::SlotDraft,
    types::{SlotStatus, SwapStatus, UserId},
};

fn draft(title: &str, start_ms: u64, owner: UserId) -> SlotDraft {
    SlotDraft {
        title: title.to_string(),
        start_ms,
        end_ms: start_ms + 3_600_000,
        owner,
    }
}

/// Two users, each with one swappable slot. Returns (u1, u2, a, b).
fn setup() -> (SwapStore, UserId, UserId, u64, u64) {
    let mut store = SwapStore::new();
    let (u1, _) = store.register_user("Alice".to_string()).expect("user");
    let (u2, _) = store.register_user("Bob".to_string()).expect("user");
    let (a, _) = store.create_slot(draft("Mon 9-10", 1_000, u1)).expect("slot a");
    let (b, _) = store.create_slot(draft("Tue 9-10", 2_000, u2)).expect("slot b");
    store.set_slot_status(a, u1, SlotStatus::Swappable).expect("opt in a");
    store.set_slot_status(b, u2, SlotStatus::Swappable).expect("opt in b");
    (store, u1, u2, a, b)
}

#[test]
fn create_slot_rejects_inverted_time_range() {
    let mut store = SwapStore::new();
    let (u1, _) = store.register_user("Alice".to_string()).expect("user");
    let err = store
        .create_slot(SlotDraft {
            title: "bad".to_string(),
            start_ms: 2_000,
            end_ms: 1_000,
            owner: u1,
        })
        .expect_err("must fail");
    assert_eq!(
        err,
        StoreError::InvalidTimeRange {
            start_ms: 2_000,
            end_ms: 1_000
        }
    );
}

#[test]
fn create_slot_requires_registered_owner() {
    let mut store = SwapStore::new();
    let err = store.create_slot(draft("x", 0, 99)).expect_err("must fail");
    assert_eq!(err, StoreError::UserNotFound(99));
}

#[test]
fn owner_opt_in_and_out_round_trips() {
    let mut store = SwapStore::new();
    let (u1, _) = store.register_user("Alice".to_string()).expect("user");
    let (a, _) = store.create_slot(draft("slot", 0, u1)).expect("slot");
    assert_eq!(store.get_slot(a).expect("slot").status, SlotStatus::Free);

    store.set_slot_status(a, u1, SlotStatus::Swappable).expect("opt in");
    assert_eq!(store.get_slot(a).expect("slot").status, SlotStatus::Swappable);

    store.set_slot_status(a, u1, SlotStatus::Free).expect("opt out");
    assert_eq!(store.get_slot(a).expect("slot").status, SlotStatus::Free);
}

#[test]
fn only_the_owner_may_change_slot_status() {
    let (mut store, u1, u2, a, _) = setup();
    let err = store
        .set_slot_status(a, u2, SlotStatus::Free)
        .expect_err("must fail");
    assert_eq!(
        err,
        StoreError::NotOwner {
            slot: a,
            owner: u1,
            acting: u2
        }
    );
}

#[test]
fn owner_cannot_force_swap_pending() {
    let (mut store, u1, _, a, _) = setup();
    let err = store
        .set_slot_status(a, u1, SlotStatus::SwapPending)
        .expect_err("must fail");
    assert!(matches!(err, StoreError::InvalidTransition(_)));
}

#[test]
fn propose_claims_both_slots_and_creates_pending_request() {
    let (mut store, u1, u2, a, b) = setup();

    let (req, _) = store.propose(a, b, u1).expect("propose");
    assert_eq!(req.status, SwapStatus::Pending);
    assert_eq!(req.offered_slot, a);
    assert_eq!(req.requested_slot, b);
    assert_eq!(req.requester, u1);
    assert_eq!(req.recipient, u2);

    assert_eq!(store.get_slot(a).expect("a").status, SlotStatus::SwapPending);
    assert_eq!(store.get_slot(b).expect("b").status, SlotStatus::SwapPending);
    assert_eq!(store.active_request_on(a), Some(req.id));
    assert_eq!(store.active_request_on(b), Some(req.id));
}

#[test]
fn propose_same_slot_fails_without_state_change() {
    let (mut store, u1, _, a, _) = setup();
    let err = store.propose(a, a, u1).expect_err("must fail");
    assert_eq!(err, StoreError::SameSlot(a));
    assert_eq!(store.get_slot(a).expect("a").status, SlotStatus::Swappable);
}

#[test]
fn propose_requires_offered_slot_ownership() {
    let (mut store, u1, u2, a, b) = setup();
    let err = store.propose(a, b, u2).expect_err("must fail");
    assert_eq!(
        err,
        StoreError::NotOwner {
            slot: a,
            owner: u1,
            acting: u2
        }
    );
}

#[test]
fn propose_against_own_slot_fails() {
    let (mut store, u1, _, a, _) = setup();
    let (c, _) = store.create_slot(draft("Wed 9-10", 3_000, u1)).expect("slot c");
    store.set_slot_status(c, u1, SlotStatus::Swappable).expect("opt in");

    let err = store.propose(a, c, u1).expect_err("must fail");
    assert_eq!(
        err,
        StoreError::NotOwner {
            slot: c,
            owner: u1,
            acting: u1
        }
    );
}

#[test]
fn propose_on_free_slot_fails_slot_not_swappable() {
    let (mut store, u1, u2, a, b) = setup();
    store.set_slot_status(b, u2, SlotStatus::Free).expect("opt out");

    let err = store.propose(a, b, u1).expect_err("must fail");
    assert_eq!(
        err,
        StoreError::SlotNotSwappable {
            slot: b,
            status: SlotStatus::Free
        }
    );
    assert_eq!(store.get_slot(a).expect("a").status, SlotStatus::Swappable);
}

#[test]
fn second_proposal_on_claimed_slot_trips_the_guard() {
    let (mut store, u1, u2, a, b) = setup();
    let (u3, _) = store.register_user("Carol".to_string()).expect("user");
    let (c, _) = store.create_slot(draft("Thu 9-10", 4_000, u3)).expect("slot c");
    store.set_slot_status(c, u3, SlotStatus::Swappable).expect("opt in");

    let (req, _) = store.propose(a, b, u1).expect("first propose");

    let err = store.propose(c, b, u3).expect_err("must fail");
    assert_eq!(
        err,
        StoreError::SlotAlreadyPending {
            slot: b,
            request: req.id
        }
    );

    // c remains untouched and b is still claimed exactly once.
    assert_eq!(store.get_slot(c).expect("c").status, SlotStatus::Swappable);
    assert_eq!(store.active_request_on(b), Some(req.id));
    assert_eq!(store.active_request_on(c), None);
    let _ = u2;
}

#[test]
fn opt_out_is_blocked_while_a_swap_is_in_flight() {
    let (mut store, u1, _, a, b) = setup();
    let (req, _) = store.propose(a, b, u1).expect("propose");

    let err = store
        .set_slot_status(a, u1, SlotStatus::Free)
        .expect_err("must fail");
    assert_eq!(
        err,
        StoreError::SlotAlreadyPending {
            slot: a,
            request: req.id
        }
    );
    assert_eq!(store.get_slot(a).expect("a").status, SlotStatus::SwapPending);
}

#[test]
fn accept_exchanges_ownership_and_frees_both_slots() {
    let (mut store, u1, u2, a, b) = setup();
    let (req, _) = store.propose(a, b, u1).expect("propose");

    let (resolved, _) = store.accept(req.id, u2).expect("accept");
    assert_eq!(resolved.status, SwapStatus::Accepted);

    let slot_a = store.get_slot(a).expect("a");
    let slot_b = store.get_slot(b).expect("b");
    assert_eq!(slot_a.owner, u2);
    assert_eq!(slot_b.owner, u1);
    assert_eq!(slot_a.status, SlotStatus::Free);
    assert_eq!(slot_b.status, SlotStatus::Free);
    assert_eq!(store.active_request_on(a), None);
    assert_eq!(store.active_request_on(b), None);

    // Owner index follows the exchange.
    assert!(store.slots_for_user(u1).iter().any(|s| s.id == b));
    assert!(store.slots_for_user(u2).iter().any(|s| s.id == a));
}

#[test]
fn reject_restores_swappable_and_keeps_ownership() {
    let (mut store, u1, u2, a, b) = setup();
    let (req, _) = store.propose(a, b, u1).expect("propose");

    let (resolved, _) = store.reject(req.id, u2).expect("reject");
    assert_eq!(resolved.status, SwapStatus::Rejected);

    let slot_a = store.get_slot(a).expect("a");
    let slot_b = store.get_slot(b).expect("b");
    assert_eq!(slot_a.owner, u1);
    assert_eq!(slot_b.owner, u2);
    assert_eq!(slot_a.status, SlotStatus::Swappable);
    assert_eq!(slot_b.status, SlotStatus::Swappable);
    assert_eq!(store.active_request_on(a), None);
}

#[test]
fn only_the_recipient_may_resolve() {
    let (mut store, u1, u2, a, b) = setup();
    let (req, _) = store.propose(a, b, u1).expect("propose");

    let err = store.accept(req.id, u1).expect_err("must fail");
    assert_eq!(
        err,
        StoreError::NotAuthorized {
            request: req.id,
            recipient: u2,
            acting: u1
        }
    );
    assert_eq!(store.get_slot(a).expect("a").status, SlotStatus::SwapPending);
}

#[test]
fn resolving_a_resolved_request_fails_already_resolved() {
    let (mut store, u1, u2, a, b) = setup();
    let (req, _) = store.propose(a, b, u1).expect("propose");
    let _ = store.accept(req.id, u2).expect("accept");

    let before_a = store.get_slot(a).cloned().expect("a");
    let before_b = store.get_slot(b).cloned().expect("b");

    for result in [store.accept(req.id, u2), store.reject(req.id, u2)] {
        assert_eq!(
            result.expect_err("must fail"),
            StoreError::AlreadyResolved {
                request: req.id,
                status: SwapStatus::Accepted
            }
        );
    }

    assert_eq!(store.get_slot(a).expect("a"), &before_a);
    assert_eq!(store.get_slot(b).expect("b"), &before_b);
}

#[test]
fn resolving_a_missing_request_fails_not_found() {
    let (mut store, _, u2, _, _) = setup();
    let err = store.accept(404, u2).expect_err("must fail");
    assert_eq!(err, StoreError::RequestNotFound(404));
}

#[test]
fn rejected_pair_can_be_proposed_again() {
    let (mut store, u1, u2, a, b) = setup();
    let (first, _) = store.propose(a, b, u1).expect("propose");
    let _ = store.reject(first.id, u2).expect("reject");

    let (second, _) = store.propose(a, b, u1).expect("re-propose");
    assert_ne!(second.id, first.id);
    assert_eq!(store.active_request_on(a), Some(second.id));
    // Terminal requests are retained for history.
    assert_eq!(
        store.get_request(first.id).expect("first").status,
        SwapStatus::Rejected
    );
}

#[test]
fn list_for_user_splits_sides_and_orders_newest_first() {
    let (mut store, u1, u2, a, b) = setup();
    let (u3, _) = store.register_user("Carol".to_string()).expect("user");
    let (c, _) = store.create_slot(draft("Thu 9-10", 4_000, u1)).expect("slot c");
    let (d, _) = store.create_slot(draft("Fri 9-10", 5_000, u3)).expect("slot d");
    store.set_slot_status(c, u1, SlotStatus::Swappable).expect("opt in");
    store.set_slot_status(d, u3, SlotStatus::Swappable).expect("opt in");

    let (r1, _) = store.propose(a, b, u1).expect("propose a->b");
    let (r2, _) = store.propose(c, d, u1).expect("propose c->d");

    let (outgoing, incoming) = store.list_for_user(u1);
    assert!(incoming.is_empty());
    assert_eq!(outgoing.len(), 2);
    // Newest first; equal timestamps fall back to descending request id.
    assert_eq!(outgoing[0].id, r2.id);
    assert_eq!(outgoing[1].id, r1.id);
    assert_eq!(outgoing[1].counterparty_slot_title, "Tue 9-10");
    assert_eq!(outgoing[1].counterparty_name, "Bob");

    let (outgoing_u2, incoming_u2) = store.list_for_user(u2);
    assert!(outgoing_u2.is_empty());
    assert_eq!(incoming_u2.len(), 1);
    assert_eq!(incoming_u2[0].id, r1.id);
    assert_eq!(incoming_u2[0].counterparty_slot_title, "Mon 9-10");
    assert_eq!(incoming_u2[0].counterparty_name, "Alice");

    // Resolved requests drop out of both lists.
    let _ = store.reject(r1.id, u2).expect("reject");
    let (outgoing, _) = store.list_for_user(u1);
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].id, r2.id);
}

#[test]
fn marketplace_excludes_own_and_unswappable_slots() {
    let (mut store, u1, u2, a, b) = setup();
    let (c, _) = store.create_slot(draft("Early", 100, u2)).expect("slot c");
    // c stays Free and must not appear.

    let views = store.swappable_slots(u1);
    assert_eq!(views.iter().map(|v| v.id).collect::<Vec<_>>(), vec![b]);
    assert_eq!(views[0].owner_name, "Bob");

    let views = store.swappable_slots(u2);
    assert_eq!(views.iter().map(|v| v.id).collect::<Vec<_>>(), vec![a]);

    store.set_slot_status(c, u2, SlotStatus::Swappable).expect("opt in");
    // Ascending by start time: c (100) before b (2000).
    let views = store.swappable_slots(u1);
    assert_eq!(views.iter().map(|v| v.id).collect::<Vec<_>>(), vec![c, b]);
}

#[test]
fn slots_for_user_is_ordered_by_start_time() {
    let mut store = SwapStore::new();
    let (u1, _) = store.register_user("Alice".to_string()).expect("user");
    let (late, _) = store.create_slot(draft("late", 9_000, u1)).expect("slot");
    let (early, _) = store.create_slot(draft("early", 1_000, u1)).expect("slot");

    let ids: Vec<_> = store.slots_for_user(u1).iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![early, late]);
}

#[test]
fn default_store_sequences_ops_from_one() {
    // Journal replay treats sequence 0 as "before the first op", so a
    // default-constructed store must number ops exactly like `new()`.
    let mut store = SwapStore::default();
    let (_, stored) = store.register_user("Alice".to_string()).expect("user");
    assert_eq!(stored.seq, 1);

    let mut fresh = SwapStore::new();
    let (_, fresh_stored) = fresh.register_user("Alice".to_string()).expect("user");
    assert_eq!(stored.seq, fresh_stored.seq);
}
