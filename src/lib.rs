//! flex-set: an identity-keyed hash set whose buckets switch between
//! hash-sorted chains and hash-keyed trees as they fill and drain.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep worst-case bucket cost bounded under heavy collisions
//!   without paying for tree nodes in the common, sparse case.
//! - Layers:
//!   - Arena<E>: two `slotmap`s holding every chain node (`Link`) and tree
//!     node (`Branch`) of one table. Buckets refer to nodes by key only.
//!   - Chain: singly linked, sorted by hash, closed by one sentinel node.
//!     Inserts shift payloads forward; removals absorb the successor.
//!   - Tree: BST keyed by hash, rebuilt balanced when an insert descends
//!     too deep. Equal-hash elements share one node through its `block`
//!     chain. A `next` thread links all nodes for iteration. Removing a node's element refills it from the block or
//!     clears it in place; cleared nodes are dropped at the next rebuild.
//!   - Bucket: `Chain` or `Tree`, switching at the configured thresholds.
//!   - Table<E, S>: slot array plus sizing policy (grow, shrink, rehash).
//!   - FlexSet<E, S>: public API, bulk operations and exports, and a
//!     debug-only reentrancy guard around every entry point.
//!
//! Identity
//! - Elements implement `Identified`; lookups and equality go through
//!   `id()`. `IdWrapper<K, V>` pairs an arbitrary value with a key.
//!
//! Sizing
//! - Capacity is a power of two in `[16, 2^30]`.
//! - Growth doubles capacity once `len` exceeds it; shrinking quarters it
//!   once `len` falls under a quarter, for tables above 64 slots, and never
//!   goes below 64.
//! - A mutation either resizes the table or converts the touched bucket,
//!   never both. Rehashing re-applies the treeify check per slot.
//!
//! Hashing
//! - The `BuildHasher`'s 64-bit output is folded to 32 bits and cached per
//!   node; rehashing never calls `Hash` again.
//!
//! Notes and non-goals
//! - Not thread-safe; wrap in a lock to share.
//! - Iteration order is unspecified beyond "slot by slot".
//! - Mutating an element's id in place is not supported.

mod arena;
mod bucket;
mod chain;
pub mod config;
mod flex_set;
mod flex_set_proptest;
mod identity;
mod reentrancy;
mod table;
mod testing;
mod tree;

// Public surface
pub use config::{Config, ConfigError};
pub use flex_set::{ExportError, FlexSet};
pub use identity::{IdWrapper, Identified};
pub use table::{Iter, SetStats};
