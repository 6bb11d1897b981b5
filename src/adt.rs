use core::fmt::Display;

use itertools::Itertools;

/// Trait for a concurrent ordered set of keys.
///
/// Every implementation in this crate accepts calls from any number of threads through `&self`.
/// None of the operations can fail: removing an absent key is a no-op.
pub trait OrderedSet<T> {
    /// Inserts `key`.
    ///
    /// Whether an equal key may be stored twice depends on the implementation; see its docs.
    fn add(&self, key: T);

    /// Removes one occurrence of `key`, if present.
    fn remove(&self, key: &T);

    /// Returns `true` iff the set contains `key`.
    fn contains(&self, key: &T) -> bool;

    /// Collects the keys currently in the set, in order.
    ///
    /// This is best-effort: with concurrent mutation the result need not correspond to any single
    /// instant.
    fn snapshot(&self) -> Vec<T>
    where
        T: Clone;

    /// Renders [`OrderedSet::snapshot`] as `[k1, k2, ...]`; an empty set renders as `[]`.
    fn debug_dump(&self) -> String
    where
        T: Clone + Display,
    {
        format!("[{}]", self.snapshot().iter().join(", "))
    }
}
