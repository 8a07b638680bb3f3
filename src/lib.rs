//! Calendar-slot swap negotiation with append-only SQLite journaling.
//!
//! Users hold exclusive calendar slots and exchange them through
//! mutual-consent swaps. All mutations are serialized through a
//! single-writer runtime, so a slot is never claimed by two concurrent
//! swaps and ownership transfer on acceptance is atomic.
//!
//! # Examples
//!
//! In-memory usage with [`core::store::SwapStore`]:
//! ```
//! use slotswap::{core::store::SwapStore, slot::SlotDraft, types::SlotStatus};
//!
//! let mut store = SwapStore::new();
//! let (alice, _) = store.register_user("Alice".to_string()).expect("user");
//! let (bob, _) = store.register_user("Bob".to_string()).expect("user");
//!
//! let (a, _) = store.create_slot(SlotDraft {
//!     title: "Mon 9-10".to_string(),
//!     start_ms: 1_000,
//!     end_ms: 2_000,
//!     owner: alice,
//! }).expect("slot");
//! let (b, _) = store.create_slot(SlotDraft {
//!     title: "Tue 9-10".to_string(),
//!     start_ms: 3_000,
//!     end_ms: 4_000,
//!     owner: bob,
//! }).expect("slot");
//!
//! store.set_slot_status(a, alice, SlotStatus::Swappable).expect("opt in");
//! store.set_slot_status(b, bob, SlotStatus::Swappable).expect("opt in");
//!
//! let (request, _) = store.propose(a, b, alice).expect("propose");
//! let (resolved, _) = store.accept(request.id, bob).expect("accept");
//! assert_eq!(store.get_slot(a).expect("slot a").owner, bob);
//! assert_eq!(store.get_slot(b).expect("slot b").owner, alice);
//! # let _ = resolved;
//! ```
//!
//! Runtime usage with SQLite sink:
//! ```no_run
//! use slotswap::{
//!     core::store::SwapStore,
//!     persist::sqlite::SqliteOpSink,
//!     runtime::handle::{RuntimeConfig, spawn_slotswap},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink = SqliteOpSink::open("slotswap.db").expect("open sqlite");
//! let handle = spawn_slotswap(SwapStore::new(), Some(Box::new(sink)), RuntimeConfig::default());
//! let alice = handle.register_user("Alice").await.expect("register");
//! # let _ = alice;
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```

/// In-memory authoritative store and conflict guard.
pub mod core;
/// Journal operation model and persistence wrapper types.
pub mod op;
/// Persistence abstraction and SQLite implementation.
pub mod persist;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Slot domain records, drafts, and views.
pub mod slot;
/// Slot status transition rules.
pub mod state;
/// Swap-request records and views.
pub mod swap;
/// Shared primitive types and enums.
pub mod types;
