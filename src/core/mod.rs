//! In-memory authoritative store and swap-conflict tracking.

/// Active-reference index preventing overlapping in-flight swaps.
pub mod guard;
/// Authoritative slot/request store and swap negotiation operations.
pub mod store;
