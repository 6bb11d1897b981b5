use super::SequentialSet;
use crate::Config;

type Link<T> = Option<Box<Node<T>>>;

#[derive(Debug)]
struct Node<T> {
    key: T,
    left: Link<T>,
    right: Link<T>,
}

/// Sequential unbalanced binary search tree.
///
/// Keys in a left subtree are smaller than the node's key; keys in a right subtree are greater or
/// equal. `root` is the left child of a key-less guard, so replacing the root is an ordinary child
/// update.
#[derive(Debug)]
pub struct Bst<T> {
    root: Link<T>,
}

impl<T> Default for Bst<T> {
    fn default() -> Self {
        Self { root: None }
    }
}

impl<T> Node<T> {
    fn new(key: T) -> Box<Self> {
        Box::new(Self {
            key,
            left: None,
            right: None,
        })
    }
}

/// Returns the subtree that replaces `removed` in its parent.
///
/// A node with at most one child is replaced by that child. A node with two children is replaced
/// by its in-order predecessor, which is first spliced out of the left subtree and then adopts
/// both of the removed node's children.
fn splice<T>(removed: Box<Node<T>>) -> Link<T> {
    let Node { left, right, .. } = *removed;
    match (left, right) {
        (None, child) | (child, None) => child,
        (Some(mut left), right) => match take_max(&mut left.right) {
            // `left` has no right child, so it is the predecessor itself.
            None => {
                left.right = right;
                Some(left)
            }
            Some(mut max) => {
                max.left = Some(left);
                max.right = right;
                Some(max)
            }
        },
    }
}

/// Detaches the rightmost node of the subtree at `slot`, putting its left child in its place.
fn take_max<T>(slot: &mut Link<T>) -> Link<T> {
    let mut slot = slot;
    while slot.as_ref().is_some_and(|node| node.right.is_some()) {
        if let Some(node) = slot {
            slot = &mut node.right;
        }
    }

    let mut max = slot.take()?;
    *slot = max.left.take();
    Some(max)
}

impl<T: Ord> SequentialSet<T> for Bst<T> {
    fn insert(&mut self, key: T, config: &Config) {
        let mut slot = &mut self.root;
        while let Some(node) = slot {
            slot = if key < node.key {
                &mut node.left
            } else {
                &mut node.right
            };
        }

        config.inner_work();
        *slot = Some(Node::new(key));
    }

    fn remove(&mut self, key: &T, config: &Config) {
        let mut slot = &mut self.root;
        while slot.as_ref().is_some_and(|node| node.key != *key) {
            if let Some(node) = slot {
                slot = if *key < node.key {
                    &mut node.left
                } else {
                    &mut node.right
                };
            }
        }

        config.inner_work();
        if let Some(removed) = slot.take() {
            *slot = splice(removed);
        }
    }

    fn contains(&self, key: &T) -> bool {
        let mut curr = self.root.as_deref();
        while let Some(node) = curr {
            if *key == node.key {
                return true;
            }
            curr = if *key < node.key {
                node.left.as_deref()
            } else {
                node.right.as_deref()
            };
        }
        false
    }

    fn keys(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut keys = Vec::new();
        let mut stack = Vec::new();
        let mut curr = self.root.as_deref();
        loop {
            while let Some(node) = curr {
                stack.push(node);
                curr = node.left.as_deref();
            }
            let Some(node) = stack.pop() else {
                return keys;
            };
            keys.push(node.key.clone());
            curr = node.right.as_deref();
        }
    }
}

impl<T> Drop for Bst<T> {
    fn drop(&mut self) {
        // Detach children before dropping each node; a degenerate tree is as deep as a list.
        let mut stack: Vec<Box<Node<T>>> = self.root.take().into_iter().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
        }
    }
}
