use super::SequentialSet;
use crate::Config;

type Link<T> = Option<Box<Node<T>>>;

#[derive(Debug)]
struct Node<T> {
    key: T,
    next: Link<T>,
}

/// Sequential sorted singly linked list.
///
/// `head` plays the head sentinel's `next` and `None` the tail sentinel, so inserting at the front
/// or into an empty list is the general case.
#[derive(Debug)]
pub struct SortedList<T> {
    head: Link<T>,
}

impl<T> Default for SortedList<T> {
    fn default() -> Self {
        Self { head: None }
    }
}

impl<T> SortedList<T> {
    fn iter(&self) -> impl Iterator<Item = &T> {
        let mut curr = self.head.as_deref();
        std::iter::from_fn(move || {
            let node = curr?;
            curr = node.next.as_deref();
            Some(&node.key)
        })
    }
}

impl<T: Ord> SortedList<T> {
    /// Returns the link to the first node whose key is not less than `key`.
    fn search(&mut self, key: &T) -> &mut Link<T> {
        let mut slot = &mut self.head;
        while slot.as_ref().is_some_and(|node| node.key < *key) {
            if let Some(node) = slot {
                slot = &mut node.next;
            }
        }
        slot
    }
}

impl<T: Ord> SequentialSet<T> for SortedList<T> {
    fn insert(&mut self, key: T, config: &Config) {
        let slot = self.search(&key);
        config.inner_work();
        let next = slot.take();
        *slot = Some(Box::new(Node { key, next }));
    }

    fn remove(&mut self, key: &T, config: &Config) {
        let slot = self.search(key);
        config.inner_work();
        match slot.take() {
            Some(mut node) if node.key == *key => *slot = node.next.take(),
            other => *slot = other,
        }
    }

    fn contains(&self, key: &T) -> bool {
        self.iter()
            .find(|k| *k >= key)
            .is_some_and(|k| k == key)
    }

    fn keys(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}

impl<T> Drop for SortedList<T> {
    fn drop(&mut self) {
        // Unlink iteratively; the default recursive drop overflows the stack on long lists.
        let mut curr = self.head.take();
        while let Some(mut node) = curr {
            curr = node.next.take();
        }
    }
}
