//! Lock-free sorted singly linked list.

use core::cmp::Ordering::*;
use core::mem;
use core::sync::atomic::Ordering::*;

use crossbeam_epoch::{pin, Atomic, Guard, Owned, Shared};

use crate::{Config, OrderedSet};

#[derive(Debug)]
struct Node<T> {
    key: T,
    /// Tag 1 marks the node itself as logically removed.
    next: Atomic<Node<T>>,
}

/// Lock-free sorted singly linked list.
///
/// A node is removed in two steps: its `next` link is marked, then it is unlinked by a
/// compare-and-swap on its predecessor. Traversals unlink marked nodes they come across. Unlinked
/// nodes are reclaimed through `crossbeam_epoch`.
///
/// Duplicate keys are kept; a new key goes in front of the keys equal to it.
#[derive(Debug)]
pub struct LockFreeList<T> {
    /// The head sentinel's link. The tail sentinel is the null pointer.
    head: Atomic<Node<T>>,
    config: Config,
}

struct Cursor<'g, T> {
    prev: &'g Atomic<Node<T>>,
    // Tag of `curr` is always zero, so storing it in `prev` never stores a mark.
    curr: Shared<'g, Node<T>>,
}

impl<'g, T: Ord> Cursor<'g, T> {
    /// Moves to the first unmarked node whose key is not less than `key`, unlinking marked nodes
    /// on the way. Returns whether that node's key equals `key`.
    ///
    /// Fails if an unlink loses a race; the cursor is then stale and the search restarts from the
    /// head.
    fn find(&mut self, key: &T, guard: &'g Guard) -> Result<bool, ()> {
        loop {
            debug_assert_eq!(self.curr.tag(), 0);

            // SAFETY: `curr` was reachable while `guard` was pinned, so it is not reclaimed yet.
            let Some(curr_node) = (unsafe { self.curr.as_ref() }) else {
                return Ok(false);
            };
            let mut next = curr_node.next.load(Acquire, guard);

            if next.tag() != 0 {
                next = next.with_tag(0);
                self.prev
                    .compare_exchange(self.curr, next, Release, Relaxed, guard)
                    .map_err(|_| ())?;
                // SAFETY: the CAS above unlinked `curr`, and only one thread can do so.
                unsafe { guard.defer_destroy(self.curr) };
                self.curr = next;
                continue;
            }

            match curr_node.key.cmp(key) {
                Less => {
                    self.prev = &curr_node.next;
                    self.curr = next;
                }
                Equal => return Ok(true),
                Greater => return Ok(false),
            }
        }
    }

    /// Inserts `node` between the previous and current node.
    fn insert(
        &mut self,
        mut node: Owned<Node<T>>,
        guard: &'g Guard,
    ) -> Result<(), Owned<Node<T>>> {
        node.next = self.curr.into();
        self.prev
            .compare_exchange(self.curr, node, Release, Relaxed, guard)
            .map(|_| ())
            .map_err(|e| e.new)
    }

    /// Removes the current node, which must be non-null.
    ///
    /// Fails if another thread marked it first.
    fn delete(&mut self, guard: &'g Guard) -> Result<(), ()> {
        // SAFETY: as in `find`; the caller only deletes a node `find` stopped at.
        let curr_node = unsafe { self.curr.deref() };

        // Release: to publish this thread's view along with the mark.
        // Acquire: so that the unlinking CAS below is ordered after the read of `next`.
        let next = curr_node.next.fetch_or(1, AcqRel, guard);
        if next.tag() == 1 {
            return Err(());
        }

        if self
            .prev
            .compare_exchange(self.curr, next, Release, Relaxed, guard)
            .is_ok()
        {
            // SAFETY: we are the unlinker of `curr`.
            unsafe { guard.defer_destroy(self.curr) };
        } else {
            trace!("lock-free list: unlink deferred to a later traversal");
        }
        Ok(())
    }
}

impl<T> LockFreeList<T> {
    /// Creates an empty list without inner work.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an empty list with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            head: Atomic::null(),
            config,
        }
    }
}

impl<T: Ord> LockFreeList<T> {
    fn find<'g>(&'g self, key: &T, guard: &'g Guard) -> (bool, Cursor<'g, T>) {
        loop {
            let mut cursor = Cursor {
                prev: &self.head,
                curr: self.head.load(Acquire, guard),
            };
            match cursor.find(key, guard) {
                Ok(found) => return (found, cursor),
                Err(()) => {
                    trace!("lock-free list: search restarted");
                }
            }
        }
    }
}

impl<T: Ord> OrderedSet<T> for LockFreeList<T> {
    fn add(&self, key: T) {
        let guard = &pin();
        let mut work = Some(self.config);
        let mut node = Owned::new(Node {
            key,
            next: Atomic::null(),
        });

        loop {
            let (_, mut cursor) = self.find(&node.key, guard);
            if let Some(config) = work.take() {
                config.inner_work();
            }
            match cursor.insert(node, guard) {
                Ok(()) => return,
                Err(n) => node = n,
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
            if !found || cursor.delete(guard).is_ok() {
                return;
            }
        }
    }

    /// Traverses without unlinking, skipping marked nodes.
    fn contains(&self, key: &T) -> bool {
        let guard = &pin();
        let mut curr = self.head.load(Acquire, guard);
        // SAFETY: every node read while pinned stays valid until the guard is dropped.
        while let Some(node) = unsafe { curr.with_tag(0).as_ref() } {
            let next = node.next.load(Acquire, guard);
            match node.key.cmp(key) {
                Less => {}
                Equal if next.tag() == 0 => return true,
                Equal => {}
                Greater => return false,
            }
            curr = next;
        }
        false
    }

    fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        let guard = &pin();
        let mut keys = Vec::new();
        let mut curr = self.head.load(Acquire, guard);
        // SAFETY: as in `contains`.
        while let Some(node) = unsafe { curr.with_tag(0).as_ref() } {
            let next = node.next.load(Acquire, guard);
            if next.tag() == 0 {
                keys.push(node.key.clone());
            }
            curr = next;
        }
        keys
    }
}

impl<T> Drop for LockFreeList<T> {
    fn drop(&mut self) {
        let mut o_curr = mem::take(&mut self.head);
        // SAFETY: `&mut self` means no operation is in flight, so we own every remaining node.
        while let Some(curr) = unsafe { o_curr.try_into_owned() }.map(Owned::into_box) {
            o_curr = curr.next;
        }
    }
}

impl<T> Default for LockFreeList<T> {
    fn default() -> Self {
        Self::new()
    }
}
