//! Locks guarding the coarse-grained and fine-grained sets.
//!
//! [`Lock`] pairs a [`RawLock`] with the data it protects; access goes through a [`LockGuard`],
//! which releases the lock when dropped. Hand-over-hand traversals rely on this: overwriting the
//! guard of the previous node with the guard of the next one acquires before it releases, on
//! every exit path including unwinding.

mod api;
mod parking;
mod spin;

pub use api::{Lock, LockGuard, RawLock};
pub use parking::McsParkingLock;
pub use spin::{SpinLock, TicketLock};
