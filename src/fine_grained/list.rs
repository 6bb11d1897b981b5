use core::cmp::Ordering::*;
use core::ptr;

use crate::lock::{Lock, LockGuard, RawLock, SpinLock};
use crate::{Config, OrderedSet};

#[derive(Debug)]
struct Node<T, L: RawLock> {
    key: T,
    /// The node's lock; it guards the link to the successor.
    next: Lock<L, *mut Node<T, L>>,
}

/// Concurrent sorted singly linked list using fine-grained lock coupling.
///
/// Duplicate keys are kept; a new key goes in front of the keys equal to it.
#[derive(Debug)]
pub struct FineList<T, L: RawLock = SpinLock> {
    /// The head sentinel's link. The tail sentinel is the null pointer.
    head: Lock<L, *mut Node<T, L>>,
    config: Config,
}

unsafe impl<T: Send, L: RawLock> Send for FineList<T, L> {}
unsafe impl<T: Send, L: RawLock> Sync for FineList<T, L> {}

// Holds the lock of the link that points to the current node.
struct Cursor<'l, T, L: RawLock>(LockGuard<'l, L, *mut Node<T, L>>);

impl<T, L: RawLock> Node<T, L> {
    fn new(key: T, next: *mut Self) -> *mut Self {
        Box::into_raw(Box::new(Self {
            key,
            next: Lock::new(next),
        }))
    }
}

impl<T: Ord, L: RawLock> Cursor<'_, T, L> {
    /// Moves the cursor to the first node whose key is not less than `key`.
    /// Returns whether that node's key equals `key`.
    fn find(&mut self, key: &T) -> bool {
        loop {
            // SAFETY: the node behind a locked link cannot be unlinked, hence is not freed.
            let Some(node) = (unsafe { (*self.0).as_ref() }) else {
                return false;
            };

            match node.key.cmp(key) {
                // Acquires the successor link before the old guard is dropped.
                Less => self.0 = node.next.lock(),
                Equal => return true,
                Greater => return false,
            }
        }
    }
}

impl<T> FineList<T> {
    /// Creates an empty list without inner work.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }
}

impl<T, L: RawLock> FineList<T, L> {
    /// Creates an empty list with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            head: Lock::new(ptr::null_mut()),
            config,
        }
    }
}

impl<T: Ord, L: RawLock> FineList<T, L> {
    fn find(&self, key: &T) -> (bool, Cursor<'_, T, L>) {
        let mut cursor = Cursor(self.head.lock());
        let found = cursor.find(key);
        (found, cursor)
    }
}

impl<T: Ord, L: RawLock> OrderedSet<T> for FineList<T, L> {
    fn add(&self, key: T) {
        let (_, mut cursor) = self.find(&key);
        self.config.inner_work();
        *cursor.0 = Node::new(key, *cursor.0);
    }

    fn remove(&self, key: &T) {
        let (found, mut cursor) = self.find(key);
        self.config.inner_work();
        if !found {
            return;
        }

        let curr = *cursor.0;
        // SAFETY: `found` means `curr` is non-null, and the held link keeps it alive.
        let node = unsafe { &*curr };

        // Wait for any traversal still holding the victim's own lock to move past it. Nobody can
        // queue behind us, as that requires the link we hold.
        let next = node.next.lock();
        *cursor.0 = *next;
        drop(next);

        // SAFETY: `curr` is unreachable and its lock is free, so no thread can observe it.
        drop(unsafe { Box::from_raw(curr) });
    }

    fn contains(&self, key: &T) -> bool {
        self.find(key).0
    }

    fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut keys = Vec::new();
        let mut link = self.head.lock();
        // SAFETY: as in `Cursor::find`.
        while let Some(node) = unsafe { (*link).as_ref() } {
            keys.push(node.key.clone());
            link = node.next.lock();
        }
        keys
    }
}

impl<T, L: RawLock> Drop for FineList<T, L> {
    fn drop(&mut self) {
        let mut curr = *self.head.get_mut();
        while !curr.is_null() {
            // SAFETY: `&mut self` gives sole ownership of every node, each reachable exactly once.
            let node = unsafe { Box::from_raw(curr) };
            curr = node.next.into_inner();
        }
    }
}

impl<T, L: RawLock> Default for FineList<T, L> {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use std::thread::scope;

    use super::*;
    use crate::lock::TicketLock;

    #[test]
    fn keeps_order_and_duplicates() {
        let list = FineList::new();
        for k in [3, 1, 4, 1, 5, 9, 2, 6] {
            list.add(k);
        }
        assert_eq!(list.snapshot(), [1, 1, 2, 3, 4, 5, 6, 9]);

        list.remove(&1);
        list.remove(&7);
        assert_eq!(list.debug_dump(), "[1, 2, 3, 4, 5, 6, 9]");
        assert!(list.contains(&1));
        assert!(!list.contains(&7));
    }

    #[test]
    fn remove_head_tail_and_last() {
        let list = FineList::<_, TicketLock>::default();
        for k in [10, 20, 30] {
            list.add(k);
        }
        list.remove(&10);
        list.remove(&30);
        assert_eq!(list.snapshot(), [20]);
        list.remove(&20);
        assert_eq!(list.debug_dump(), "[]");
        list.remove(&20);
    }

    #[test]
    fn disjoint_threads() {
        const THREADS: i32 = 8;
        const STEPS: i32 = 256;

        let list = FineList::<i32>::new();
        scope(|s| {
            for t in 0..THREADS {
                let list = &list;
                let _ = s.spawn(move || {
                    for i in 0..STEPS {
                        list.add(i * THREADS + t);
                    }
                    for i in (0..STEPS).step_by(2) {
                        list.remove(&(i * THREADS + t));
                    }
                });
            }
        });

        let expected = (0..STEPS)
            .filter(|i| i % 2 == 1)
            .flat_map(|i| (0..THREADS).map(move |t| i * THREADS + t))
            .collect::<Vec<_>>();
        assert_eq!(list.snapshot(), expected);
    }

    #[test]
    fn drop_long_list() {
        let list = FineList::new();
        for k in (0..100_000).rev() {
            list.add(k);
        }
    }
}
