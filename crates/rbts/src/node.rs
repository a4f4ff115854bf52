//! Node model for the relaxed-radix-balanced vector
//!
//! A vector is a shallow tree of two node shapes:
//! - InnerNode: up to `2^B` ordered children, plus a cumulative size table
//!   when the subtree is relaxed (its children are not all maximally full)
//! - LeafNode: up to `2^BL` ordered elements
//!
//! Nodes are immutable once built and shared through `Arc`. The address of the
//! `Arc` allocation is the node's physical identity; two vectors derived from
//! one another hold identity-equal nodes wherever they share a subtree.

use std::fmt;
use std::sync::Arc;

/// Opaque physical identity of a node
///
/// Two `NodeIdentity` values are equal exactly when they were taken from the
/// same allocation. The identity says nothing about content: two leaves with
/// equal elements built independently have different identities.
///
/// An identity is only meaningful while the node it was taken from is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIdentity(usize);

impl NodeIdentity {
    /// Identity of a shared node
    pub fn of<N>(node: &Arc<N>) -> Self {
        NodeIdentity(Arc::as_ptr(node) as *const () as usize)
    }
}

/// Leaf node: a bounded run of elements
pub struct LeafNode<T> {
    items: Vec<T>,
}

impl<T> LeafNode<T> {
    /// Create a leaf holding `items`
    pub fn new(items: Vec<T>) -> Self {
        LeafNode { items }
    }

    /// Elements stored in this leaf
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the leaf holds no elements
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: fmt::Debug> fmt::Debug for LeafNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LeafNode").field(&self.items).finish()
    }
}

/// Inner node: ordered children and an optional size table
///
/// `sizes[i]` is the number of elements under children `0..=i`. It is only
/// present for relaxed nodes; a regular node derives positions from the radix
/// of the index instead.
pub struct InnerNode<T> {
    children: Vec<NodeRef<T>>,
    sizes: Option<Vec<usize>>,
}

impl<T> InnerNode<T> {
    /// Inner node with no children (the root of a vector that lives in its tail)
    pub fn empty() -> Self {
        InnerNode {
            children: Vec::new(),
            sizes: None,
        }
    }

    /// Regular inner node: every child but the last is completely full
    pub fn regular(children: Vec<NodeRef<T>>) -> Self {
        InnerNode {
            children,
            sizes: None,
        }
    }

    /// Relaxed inner node with its cumulative size table
    ///
    /// `sizes` must have one entry per child.
    pub fn relaxed(children: Vec<NodeRef<T>>, sizes: Vec<usize>) -> Self {
        debug_assert_eq!(children.len(), sizes.len());
        InnerNode {
            children,
            sizes: Some(sizes),
        }
    }

    /// Children in order
    pub fn children(&self) -> &[NodeRef<T>] {
        &self.children
    }

    /// True if this node carries a size table
    pub fn is_relaxed(&self) -> bool {
        self.sizes.is_some()
    }

    /// Cumulative sizes of a relaxed node
    pub fn sizes(&self) -> Option<&[usize]> {
        self.sizes.as_deref()
    }

    pub(crate) fn push_child(&mut self, child: NodeRef<T>, child_len: usize) {
        self.children.push(child);
        if let Some(sizes) = &mut self.sizes {
            let before = sizes.last().copied().unwrap_or(0);
            sizes.push(before + child_len);
        }
    }

    pub(crate) fn replace_child(&mut self, slot: usize, child: NodeRef<T>) {
        if let Some(existing) = self.children.get_mut(slot) {
            *existing = child;
        }
    }

    pub(crate) fn replace_last(&mut self, child: NodeRef<T>, added_len: usize) {
        if let Some(last) = self.children.last_mut() {
            *last = child;
        }
        if let Some(last) = self.sizes.as_mut().and_then(|sizes| sizes.last_mut()) {
            *last += added_len;
        }
    }
}

impl<T> Clone for InnerNode<T> {
    fn clone(&self) -> Self {
        InnerNode {
            children: self.children.clone(),
            sizes: self.sizes.clone(),
        }
    }
}

impl<T> fmt::Debug for InnerNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InnerNode")
            .field("children", &self.children.len())
            .field("relaxed", &self.is_relaxed())
            .finish()
    }
}

/// Shared reference to a node of either shape
pub enum NodeRef<T> {
    /// An inner node
    Inner(Arc<InnerNode<T>>),
    /// A leaf node
    Leaf(Arc<LeafNode<T>>),
}

impl<T> NodeRef<T> {
    /// Physical identity of the referenced node
    pub fn identity(&self) -> NodeIdentity {
        match self {
            NodeRef::Inner(node) => NodeIdentity::of(node),
            NodeRef::Leaf(node) => NodeIdentity::of(node),
        }
    }

    /// True for leaf references
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeRef::Leaf(_))
    }
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        match self {
            NodeRef::Inner(node) => NodeRef::Inner(Arc::clone(node)),
            NodeRef::Leaf(node) => NodeRef::Leaf(Arc::clone(node)),
        }
    }
}

impl<T> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Inner(_) => write!(f, "Inner({:?})", self.identity()),
            NodeRef::Leaf(_) => write!(f, "Leaf({:?})", self.identity()),
        }
    }
}
