//! Lock-free sets.
//!
//! Every mutation is a single compare-and-swap on one link, retried on failure. Unlinked nodes
//! are retired to `crossbeam_epoch`, which frees them once no pinned thread can still hold a
//! reference.

mod list;
mod tree;

pub use list::LockFreeList;
pub use tree::LockFreeTree;
