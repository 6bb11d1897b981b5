use core::cmp::Ordering::*;
use core::ptr;

use crate::lock::{Lock, LockGuard, RawLock, SpinLock};
use crate::{Config, OrderedSet};

#[derive(Debug, Clone, Copy)]
enum Dir {
    Left,
    Right,
}

#[derive(Debug)]
struct Children<T, L: RawLock> {
    left: *mut Node<T, L>,
    right: *mut Node<T, L>,
}

#[derive(Debug)]
struct Node<T, L: RawLock> {
    key: T,
    /// The node's lock; it guards both child links.
    children: Lock<L, Children<T, L>>,
}

/// Concurrent unbalanced binary search tree using fine-grained lock coupling.
///
/// Equal keys are routed to the right, so duplicates are kept.
#[derive(Debug)]
pub struct FineTree<T, L: RawLock = SpinLock> {
    /// Children of a key-less guard node. The root is the left child.
    sentinel: Lock<L, Children<T, L>>,
    config: Config,
}

unsafe impl<T: Send, L: RawLock> Send for FineTree<T, L> {}
unsafe impl<T: Send, L: RawLock> Sync for FineTree<T, L> {}

/// Position in the tree: the locked parent and the direction of the current slot.
struct Cursor<'l, T, L: RawLock> {
    parent: LockGuard<'l, L, Children<T, L>>,
    dir: Dir,
}

struct Frame<'l, T, L: RawLock> {
    node: &'l Node<T, L>,
    children: LockGuard<'l, L, Children<T, L>>,
    emitted: bool,
}

impl<T, L: RawLock> Children<T, L> {
    fn get(&self, dir: Dir) -> *mut Node<T, L> {
        match dir {
            Dir::Left => self.left,
            Dir::Right => self.right,
        }
    }

    fn slot(&mut self, dir: Dir) -> &mut *mut Node<T, L> {
        match dir {
            Dir::Left => &mut self.left,
            Dir::Right => &mut self.right,
        }
    }
}

impl<T, L: RawLock> Default for Children<T, L> {
    fn default() -> Self {
        Self {
            left: ptr::null_mut(),
            right: ptr::null_mut(),
        }
    }
}

impl<T, L: RawLock> Node<T, L> {
    fn new(key: T) -> *mut Self {
        Box::into_raw(Box::new(Self {
            key,
            children: Lock::default(),
        }))
    }
}

impl<T: Ord, L: RawLock> Cursor<'_, T, L> {
    fn curr(&self) -> *mut Node<T, L> {
        self.parent.get(self.dir)
    }

    /// Descends until the current slot is null or holds a node whose key equals `key`. Returns
    /// whether it stopped at such a node.
    fn find(&mut self, key: &T) -> bool {
        loop {
            // SAFETY: a node is freed only after it is unlinked under its parent's lock, which we
            // hold.
            let Some(node) = (unsafe { self.curr().as_ref() }) else {
                return false;
            };

            let dir = match key.cmp(&node.key) {
                Less => Dir::Left,
                Equal => return true,
                Greater => Dir::Right,
            };
            self.parent = node.children.lock();
            self.dir = dir;
        }
    }

    /// Descends to the null slot where `key` belongs. Equal keys go right.
    fn find_slot(&mut self, key: &T) {
        // SAFETY: as in `find`.
        while let Some(node) = unsafe { self.curr().as_ref() } {
            let dir = if *key < node.key { Dir::Left } else { Dir::Right };
            self.parent = node.children.lock();
            self.dir = dir;
        }
    }
}

/// Returns the subtree that replaces a node whose children are `removed`.
///
/// The caller holds the locks of the removed node and of its parent, so no other thread can enter
/// the removed node's subtrees. With two children, the in-order predecessor is found by locking
/// hand-over-hand down the right spine of the left subtree.
fn splice<T, L: RawLock>(removed: &Children<T, L>) -> *mut Node<T, L> {
    if removed.left.is_null() {
        return removed.right;
    }
    if removed.right.is_null() {
        return removed.left;
    }

    // SAFETY: children of a locked node are not freed.
    let left = unsafe { &*removed.left };
    let mut parent = left.children.lock();
    if parent.right.is_null() {
        parent.right = removed.right;
        return removed.left;
    }

    loop {
        let max = parent.right;
        // SAFETY: we hold the lock of its parent.
        let mut children = unsafe { &*max }.children.lock();
        if children.right.is_null() {
            parent.right = children.left;
            children.left = removed.left;
            children.right = removed.right;
            return max;
        }
        parent = children;
    }
}

impl<T> FineTree<T> {
    /// Creates an empty tree without inner work.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }
}

impl<T, L: RawLock> FineTree<T, L> {
    /// Creates an empty tree with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            sentinel: Lock::default(),
            config,
        }
    }

    fn cursor(&self) -> Cursor<'_, T, L> {
        Cursor {
            parent: self.sentinel.lock(),
            dir: Dir::Left,
        }
    }
}

impl<T: Ord, L: RawLock> OrderedSet<T> for FineTree<T, L> {
    fn add(&self, key: T) {
        let mut cursor = self.cursor();
        cursor.find_slot(&key);
        self.config.inner_work();
        *cursor.parent.slot(cursor.dir) = Node::new(key);
    }

    fn remove(&self, key: &T) {
        let mut cursor = self.cursor();
        let found = cursor.find(key);
        self.config.inner_work();
        if !found {
            return;
        }

        let curr = cursor.curr();
        // SAFETY: `found` means `curr` is non-null, and the parent's lock keeps it alive.
        let children = unsafe { &*curr }.children.lock();
        *cursor.parent.slot(cursor.dir) = splice(&children);
        drop(children);

        // SAFETY: `curr` is unreachable and its lock is free. Reaching it required the parent's
        // lock, which is still held.
        drop(unsafe { Box::from_raw(curr) });
        trace!("fine tree: unlinked node");
    }

    fn contains(&self, key: &T) -> bool {
        self.cursor().find(key)
    }

    /// Walks the tree in order, holding the sentinel's lock and the locks of the current path.
    /// Operations that start after the walk wait until it ends.
    fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        let sentinel = self.sentinel.lock();
        let mut keys = Vec::new();
        let mut stack: Vec<Frame<'_, T, L>> = Vec::new();
        let mut curr = sentinel.left;

        loop {
            // SAFETY: `curr` is a child of the locked node on top of the stack, or the root.
            while let Some(node) = unsafe { curr.as_ref() } {
                let children = node.children.lock();
                curr = children.left;
                stack.push(Frame {
                    node,
                    children,
                    emitted: false,
                });
            }

            // A frame whose key is emitted has also had its right subtree walked by now.
            while stack.last().is_some_and(|frame| frame.emitted) {
                let _ = stack.pop();
            }
            let Some(frame) = stack.last_mut() else {
                return keys;
            };
            keys.push(frame.node.key.clone());
            frame.emitted = true;
            curr = frame.children.right;
        }
    }
}

impl<T, L: RawLock> Drop for FineTree<T, L> {
    fn drop(&mut self) {
        let mut stack = vec![self.sentinel.get_mut().left];
        while let Some(curr) = stack.pop() {
            if curr.is_null() {
                continue;
            }
            // SAFETY: `&mut self` gives sole ownership of every node, each reachable exactly once.
            let node = unsafe { Box::from_raw(curr) };
            let Children { left, right } = node.children.into_inner();
            stack.push(left);
            stack.push(right);
        }
    }
}

impl<T, L: RawLock> Default for FineTree<T, L> {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}
