//! Lock-free unbalanced binary search tree.

use core::cmp::Ordering::*;
use core::sync::atomic::AtomicBool;
use core::sync::atomic::Ordering::*;

use crossbeam_epoch::{pin, unprotected, Atomic, Guard, Owned, Shared};

use crate::{Config, OrderedSet};

/// Tag on a child link that forbids any further change to it.
const FROZEN: usize = 1;

#[derive(Debug)]
struct Node<T> {
    key: T,
    /// Set once, by the `remove` that the node's key answers to.
    deleted: AtomicBool,
    left: Atomic<Node<T>>,
    right: Atomic<Node<T>>,
}

/// Lock-free unbalanced binary search tree.
///
/// `remove` first sets the node's `deleted` flag; from then on the key is absent. A deleted node
/// is then physically unlinked, by whichever thread gets there first, as soon as it has at most
/// one child. Until then it stays in place as a routing node that searches pass through.
///
/// Before unlinking, both child links of the node are frozen (tagged) so that no insertion or
/// unlink can land on a node that is about to leave the tree. The first link to be frozen is
/// always a null one, so a frozen node has at most one child, which replaces it in its parent.
///
/// Keys are expected to be unique among live nodes. An equal key is routed to the right, so a key
/// can be added again after its removal even while its old node is still routing.
#[derive(Debug)]
pub struct LockFreeTree<T> {
    /// Left link of a key-less guard node.
    root: Atomic<Node<T>>,
    config: Config,
}

struct Cursor<'g, T> {
    /// The link that pointed to `curr` when it was read.
    slot: &'g Atomic<Node<T>>,
    /// Always untagged.
    curr: Shared<'g, Node<T>>,
}

impl<T> Node<T> {
    fn new(key: T) -> Self {
        Self {
            key,
            deleted: AtomicBool::new(false),
            left: Atomic::null(),
            right: Atomic::null(),
        }
    }

    /// Freezes both child links of a deleted node. Returns `false`, changing nothing, if the node
    /// has two children.
    fn freeze(&self, guard: &Guard) -> bool {
        loop {
            let left = self.left.load(Acquire, guard);
            let right = self.right.load(Acquire, guard);

            if left.tag() == FROZEN || right.tag() == FROZEN {
                // Someone froze a null link; finish their job.
                let _ = self.left.fetch_or(FROZEN, AcqRel, guard);
                let _ = self.right.fetch_or(FROZEN, AcqRel, guard);
                return true;
            }

            let (empty, other) = if left.is_null() {
                (&self.left, &self.right)
            } else if right.is_null() {
                (&self.right, &self.left)
            } else {
                return false;
            };

            if empty
                .compare_exchange(
                    Shared::null(),
                    Shared::null().with_tag(FROZEN),
                    AcqRel,
                    Acquire,
                    guard,
                )
                .is_ok()
            {
                let _ = other.fetch_or(FROZEN, AcqRel, guard);
                return true;
            }
        }
    }

    /// Returns the only child of a frozen node, if any.
    fn replacement<'g>(&self, guard: &'g Guard) -> Shared<'g, Self> {
        let left = self.left.load(Acquire, guard).with_tag(0);
        if left.is_null() {
            self.right.load(Acquire, guard).with_tag(0)
        } else {
            left
        }
    }
}

impl<'g, T: Ord> Cursor<'g, T> {
    /// Replaces the frozen node `curr` with its only child. Fails if `slot` changed since it was
    /// read, including when the node that owns `slot` got frozen itself.
    fn unlink(&mut self, guard: &'g Guard) -> Result<(), ()> {
        // SAFETY: `curr` was reachable while `guard` was pinned, so it is not reclaimed yet.
        let replacement = unsafe { self.curr.deref() }.replacement(guard);
        self.slot
            .compare_exchange(self.curr, replacement, AcqRel, Acquire, guard)
            .map_err(|_| ())?;
        // SAFETY: the CAS above unlinked `curr`, and only one thread can do so.
        unsafe { guard.defer_destroy(self.curr) };
        self.curr = replacement;
        Ok(())
    }

    /// Descends from the cursor until it reaches an empty link or, if `stop_at_match`, a live
    /// node whose key equals `key`. Deleted nodes with at most one child are unlinked on the way.
    /// Returns whether it stopped at a matching node.
    ///
    /// Fails if an unlink loses a race; the search then restarts from the root.
    fn find(&mut self, key: &T, stop_at_match: bool, guard: &'g Guard) -> Result<bool, ()> {
        loop {
            // SAFETY: as in `unlink`.
            let Some(node) = (unsafe { self.curr.as_ref() }) else {
                return Ok(false);
            };

            if node.deleted.load(Acquire) && node.freeze(guard) {
                self.unlink(guard)?;
                continue;
            }

            let next = match key.cmp(&node.key) {
                Less => &node.left,
                Equal if stop_at_match && !node.deleted.load(Acquire) => return Ok(true),
                _ => &node.right,
            };
            self.slot = next;
            // A tagged link means `node` got frozen in the meantime; any CAS on the link will
            // fail and send us back to the root.
            self.curr = next.load(Acquire, guard).with_tag(0);
        }
    }
}

impl<T> LockFreeTree<T> {
    /// Creates an empty tree without inner work.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an empty tree with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            root: Atomic::null(),
            config,
        }
    }

    fn cursor<'g>(&'g self, guard: &'g Guard) -> Cursor<'g, T> {
        Cursor {
            slot: &self.root,
            curr: self.root.load(Acquire, guard),
        }
    }
}

impl<T: Ord> LockFreeTree<T> {
    fn find<'g>(&'g self, key: &T, guard: &'g Guard) -> (bool, Cursor<'g, T>) {
        loop {
            let mut cursor = self.cursor(guard);
            match cursor.find(key, true, guard) {
                Ok(found) => return (found, cursor),
                Err(()) => {
                    trace!("lock-free tree: search restarted");
                }
            }
        }
    }
}

impl<T: Ord> OrderedSet<T> for LockFreeTree<T> {
    fn add(&self, key: T) {
        let guard = &pin();
        let mut work = Some(self.config);
        let mut node = Owned::new(Node::new(key));

        'retry: loop {
            let mut cursor = self.cursor(guard);
            loop {
                if cursor.find(&node.key, false, guard).is_err() {
                    continue 'retry;
                }
                if let Some(config) = work.take() {
                    config.inner_work();
                }

                match cursor
                    .slot
                    .compare_exchange(Shared::null(), node, AcqRel, Acquire, guard)
                {
                    Ok(_) => return,
                    Err(e) => {
                        let current = e.current;
                        node = e.new;
                        if current.tag() == FROZEN {
                            continue 'retry;
                        }
                        // The link was filled concurrently; continue below the new child.
                        cursor.curr = current;
                    }
                }
            }
        }
    }

    fn remove(&self, key: &T) {
        let guard = &pin();
        let mut work = Some(self.config);

        loop {
            let (found, mut cursor) = self.find(key, guard);
            if let Some(config) = work.take() {
                config.inner_work();
            }
            if !found {
                return;
            }

            // SAFETY: `found` means `curr` is non-null; it stays valid while `guard` is pinned.
            let node = unsafe { cursor.curr.deref() };
            if node
                .deleted
                .compare_exchange(false, true, AcqRel, Acquire)
                .is_err()
            {
                continue;
            }

            if !node.freeze(guard) {
                trace!("lock-free tree: deleted node retained for routing");
            } else if cursor.unlink(guard).is_err() {
                trace!("lock-free tree: unlink deferred to a later traversal");
            }
            return;
        }
    }

    fn contains(&self, key: &T) -> bool {
        self.find(key, &pin()).0
    }

    fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        let guard = &pin();
        let mut keys = Vec::new();
        let mut stack: Vec<&Node<T>> = Vec::new();
        let mut curr = self.root.load(Acquire, guard);

        loop {
            // SAFETY: every node read while pinned stays valid until the guard is dropped.
            while let Some(node) = unsafe { curr.with_tag(0).as_ref() } {
                stack.push(node);
                curr = node.left.load(Acquire, guard);
            }
            let Some(node) = stack.pop() else {
                return keys;
            };
            if !node.deleted.load(Acquire) {
                keys.push(node.key.clone());
            }
            curr = node.right.load(Acquire, guard);
        }
    }
}

impl<T> Drop for LockFreeTree<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no operation is in flight, so we own every node still
        // linked, and each is linked exactly once.
        unsafe {
            let guard = unprotected();
            let mut stack = vec![self.root.load(Relaxed, guard)];
            while let Some(curr) = stack.pop() {
                let curr = curr.with_tag(0);
                if curr.is_null() {
                    continue;
                }
                let node = curr.into_owned().into_box();
                stack.push(node.left.load(Relaxed, guard));
                stack.push(node.right.load(Relaxed, guard));
            }
        }
    }
}

impl<T> Default for LockFreeTree<T> {
    fn default() -> Self {
        Self::new()
    }
}
