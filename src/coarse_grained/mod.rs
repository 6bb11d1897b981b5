//! Coarse-grained sets: a sequential structure behind a single lock.
//!
//! Every operation takes the one lock, runs the plain sequential algorithm, and releases it, so
//! operations are linearizable against the whole structure and no thread ever observes a partial
//! mutation.

mod bst;
mod sorted_list;

pub use bst::Bst;
pub use sorted_list::SortedList;

use crate::lock::{Lock, McsParkingLock, RawLock};
use crate::{Config, OrderedSet};

/// Trait for a sequential ordered multiset.
///
/// `config` is passed down so that the inner work happens between the search and the mutation.
pub trait SequentialSet<T> {
    /// Inserts `key` next to any equal keys.
    fn insert(&mut self, key: T, config: &Config);

    /// Removes the first occurrence of `key` in search order, if any.
    fn remove(&mut self, key: &T, config: &Config);

    /// Returns `true` iff `key` is present.
    fn contains(&self, key: &T) -> bool;

    /// Returns the keys in order.
    fn keys(&self) -> Vec<T>
    where
        T: Clone;
}

/// A sequential set made concurrent by one global lock.
#[derive(Debug)]
pub struct CoarseGrained<S, L: RawLock = McsParkingLock> {
    inner: Lock<L, S>,
    config: Config,
}

/// Sorted singly linked list protected by one lock. Duplicate keys are kept.
pub type CoarseList<T, L = McsParkingLock> = CoarseGrained<SortedList<T>, L>;

/// Unbalanced binary search tree protected by one lock. Duplicate keys are kept.
pub type CoarseTree<T, L = McsParkingLock> = CoarseGrained<Bst<T>, L>;

impl<S: Default> CoarseGrained<S> {
    /// Creates an empty set without inner work.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }
}

impl<S: Default, L: RawLock> CoarseGrained<S, L> {
    /// Creates an empty set with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Lock::new(S::default()),
            config,
        }
    }
}

impl<S: Default, L: RawLock> Default for CoarseGrained<S, L> {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl<T, S, L> OrderedSet<T> for CoarseGrained<S, L>
where
    S: SequentialSet<T>,
    L: RawLock,
{
    fn add(&self, key: T) {
        self.inner.lock().insert(key, &self.config);
    }

    fn remove(&self, key: &T) {
        self.inner.lock().remove(key, &self.config);
    }

    fn contains(&self, key: &T) -> bool {
        self.inner.lock().contains(key)
    }

    fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.inner.lock().keys()
    }
}
