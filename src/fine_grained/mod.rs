//! Fine-grained sets: one lock per node, traversed hand-over-hand.
//!
//! A traversal acquires the lock of the next node before it releases the lock of the current one,
//! and always moves in one direction (forward in the list, root to leaf in the tree), so no cycle
//! of lock acquisitions can form. A node is freed as soon as it is unlinked: reaching it requires
//! the lock of its predecessor (list) or parent (tree), which the remover holds while unlinking.

mod list;
mod tree;

pub use list::FineList;
pub use tree::FineTree;
