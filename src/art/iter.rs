//! Borrowing in-order iterator.

use std::iter::FusedIterator;

use smallvec::SmallVec;

use super::node::{Children, Node};

/// In-order iterator over a [`RadixTree`](super::RadixTree).
///
/// Walks the tree on an explicit stack of child cursors, one per internal
/// node on the current path, so deep keys do not recurse.
pub struct Iter<'a, V> {
    /// Node to visit before resuming the stack.
    pending: Option<&'a Node<V>>,
    stack: SmallVec<[Children<'a, V>; 16]>,
    remaining: usize,
}

impl<'a, V> Iter<'a, V> {
    pub(crate) fn new(root: Option<&'a Node<V>>, len: usize) -> Self {
        Self {
            pending: root,
            stack: SmallVec::new(),
            remaining: len,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a [u8], &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.pending.take() {
                if let Node::Leaf(leaf) = node {
                    self.remaining -= 1;
                    return Some((&leaf.key[..], &leaf.value));
                }
                self.stack.push(node.children());
                if let Some(leaf) = node.terminal() {
                    self.remaining -= 1;
                    return Some((&leaf.key[..], &leaf.value));
                }
            }

            match self.stack.last_mut()?.next() {
                Some((_, child)) => self.pending = Some(child),
                None => {
                    self.stack.pop();
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}
