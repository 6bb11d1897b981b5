//! Concurrent ordered sets.
//!
//! Two topologies (a sorted singly linked list and an unbalanced binary search tree) under three
//! synchronization disciplines:
//!
//! - coarse-grained: one lock serializes every operation ([`CoarseList`], [`CoarseTree`]);
//! - fine-grained: one lock per node, taken hand-over-hand ([`FineList`], [`FineTree`]);
//! - lock-free: compare-and-swap with retry, no blocking ([`LockFreeList`], [`LockFreeTree`]).
//!
//! All six implement [`OrderedSet`] and are interchangeable under the phased driver in
//! [`workload`].

#![warn(missing_docs, missing_debug_implementations)]
#![deny(unsafe_op_in_unsafe_fn)]

#[macro_use]
mod utils;

mod adt;
pub mod coarse_grained;
mod config;
pub mod fine_grained;
pub mod lock;
pub mod lockfree;
pub mod workload;

#[doc(hidden)]
pub mod test;

pub use adt::OrderedSet;
pub use coarse_grained::{CoarseList, CoarseTree};
pub use config::{busy_wait, Config};
pub use fine_grained::{FineList, FineTree};
pub use lockfree::{LockFreeList, LockFreeTree};
