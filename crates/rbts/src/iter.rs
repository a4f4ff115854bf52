//! In-order iteration over a vector
//!
//! Walks the tree left to right with an explicit stack of child iterators,
//! then yields the tail.

use crate::node::{InnerNode, NodeRef};
use std::slice;

/// Borrowing iterator over the elements of a `Vector`
pub struct Iter<'a, T> {
    stack: Vec<slice::Iter<'a, NodeRef<T>>>,
    current: slice::Iter<'a, T>,
    tail: Option<&'a [T]>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(root: &'a InnerNode<T>, tail: &'a [T], len: usize) -> Self {
        Iter {
            stack: vec![root.children().iter()],
            current: <&[T]>::default().iter(),
            tail: Some(tail),
            remaining: len,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.current.next() {
                self.remaining = self.remaining.saturating_sub(1);
                return Some(item);
            }

            let next_child = match self.stack.last_mut() {
                Some(children) => children.next(),
                None => {
                    let tail = self.tail.take()?;
                    self.current = tail.iter();
                    continue;
                }
            };

            match next_child {
                Some(NodeRef::Inner(inner)) => self.stack.push(inner.children().iter()),
                Some(NodeRef::Leaf(leaf)) => self.current = leaf.items().iter(),
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

impl<T> ExactSizeIterator for Iter<'_, T> {}
