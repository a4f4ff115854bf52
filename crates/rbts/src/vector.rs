//! Persistent vector
//!
//! `Vector<T, B, BL>` is an immutable sequence stored as a radix tree of
//! inner nodes (fanout `2^B`) over leaves (`2^BL` elements), plus a tail leaf
//! that absorbs appends. Every "modifying" operation returns a new vector that
//! shares all untouched nodes with the original.
//!
//! ## Layout
//!
//! ```text
//!            root (InnerNode, shift = BL + B * (height - 1))
//!           /    \
//!       leaf      leaf ...           tail (LeafNode)
//! ```
//!
//! Elements `0..len - tail.len()` live in the tree, the rest in the tail. When
//! the tail is full, the next push moves the tail leaf itself (the same
//! allocation) into the tree and starts a new tail.

use crate::iter::Iter;
use crate::node::{InnerNode, LeafNode, NodeRef};
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use strata_core::TreeShape;

/// Default branch bits
pub const DEFAULT_BITS: u32 = 5;

/// Default leaf bits
pub const DEFAULT_LEAF_BITS: u32 = 5;

/// Immutable vector with structural sharing
///
/// `B` and `BL` are the branch and leaf bits of the tree. Both must be at
/// least 1; other shapes fail to compile once a vector is constructed:
///
/// ```compile_fail
/// use strata_rbts::Vector;
///
/// let v: Vector<i32, 0, 1> = Vector::new();
/// ```
pub struct Vector<T, const B: u32 = DEFAULT_BITS, const BL: u32 = DEFAULT_LEAF_BITS> {
    len: usize,
    shift: u32,
    root: Arc<InnerNode<T>>,
    tail: Arc<LeafNode<T>>,
}

impl<T, const B: u32, const BL: u32> Vector<T, B, BL> {
    /// Tree shape of this vector type
    pub const SHAPE: TreeShape = TreeShape::new(B, BL);

    const BRANCHES: usize = 1 << B;
    const LEAF_CAPACITY: usize = 1 << BL;

    const VALID_SHAPE: () = assert!(
        B >= 1 && BL >= 1 && B < usize::BITS && BL < usize::BITS,
        "branch and leaf bits must be in 1..usize::BITS"
    );

    /// Create an empty vector
    pub fn new() -> Self {
        let () = Self::VALID_SHAPE;
        Vector {
            len: 0,
            shift: BL,
            root: Arc::new(InnerNode::empty()),
            tail: Arc::new(LeafNode::new(Vec::new())),
        }
    }

    /// Assemble a vector from existing nodes
    ///
    /// The caller guarantees that `root` is a well-formed tree of height
    /// matching `shift` and that `len` counts the elements of the tree plus
    /// the tail. Used by loaders that rebuild vectors from pools.
    pub fn from_raw_parts(
        root: Arc<InnerNode<T>>,
        tail: Arc<LeafNode<T>>,
        shift: u32,
        len: usize,
    ) -> Self {
        let () = Self::VALID_SHAPE;
        Vector {
            len,
            shift,
            root,
            tail,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the vector has no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Root of the tree
    pub fn root(&self) -> &Arc<InnerNode<T>> {
        &self.root
    }

    /// Tail leaf
    pub fn tail(&self) -> &Arc<LeafNode<T>> {
        &self.tail
    }

    /// Shift of the root level
    pub fn shift(&self) -> u32 {
        self.shift
    }

    fn tail_offset(&self) -> usize {
        self.len - self.tail.len()
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        let tail_offset = self.tail_offset();
        if index >= tail_offset {
            return self.tail.items().get(index - tail_offset);
        }

        let mut node: &InnerNode<T> = &self.root;
        let mut shift = self.shift;
        let mut idx = index;
        loop {
            let (slot, sub) = Self::locate(node, shift, idx)?;
            match node.children().get(slot)? {
                NodeRef::Inner(child) => {
                    node = child;
                    shift -= B;
                    idx = sub;
                }
                NodeRef::Leaf(leaf) => return leaf.items().get(sub),
            }
        }
    }

    /// Iterate over elements in order
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.root, self.tail.items(), self.len)
    }

    /// Child slot holding `idx` and the index relative to that child
    fn locate(node: &InnerNode<T>, shift: u32, idx: usize) -> Option<(usize, usize)> {
        match node.sizes() {
            Some(sizes) => {
                let slot = sizes.partition_point(|&size| size <= idx);
                if slot >= sizes.len() {
                    return None;
                }
                let before = if slot == 0 { 0 } else { sizes[slot - 1] };
                Some((slot, idx - before))
            }
            None => {
                let slot = (idx >> shift) & (Self::BRANCHES - 1);
                Some((slot, idx & ((1usize << shift) - 1)))
            }
        }
    }
}

impl<T: Clone, const B: u32, const BL: u32> Vector<T, B, BL> {
    /// New vector with `value` appended
    pub fn push_back(&self, value: T) -> Self {
        if self.tail.len() < Self::LEAF_CAPACITY {
            let mut items = Vec::with_capacity(self.tail.len() + 1);
            items.extend_from_slice(self.tail.items());
            items.push(value);
            return Vector {
                len: self.len + 1,
                shift: self.shift,
                root: Arc::clone(&self.root),
                tail: Arc::new(LeafNode::new(items)),
            };
        }

        // Tail is full: it moves into the tree unchanged.
        let full_tail = &self.tail;
        let (root, shift) = match Self::push_tail(&self.root, self.shift, full_tail) {
            Some(root) => (Arc::new(root), self.shift),
            None => {
                let tree_len = self.tail_offset();
                let children = vec![
                    NodeRef::Inner(Arc::clone(&self.root)),
                    NodeRef::Inner(Self::new_path(self.shift, full_tail)),
                ];
                let dense = 1usize
                    .checked_shl(self.shift + B)
                    .map_or(false, |capacity| capacity == tree_len);
                let root = if self.root.is_relaxed() || !dense {
                    InnerNode::relaxed(children, vec![tree_len, tree_len + full_tail.len()])
                } else {
                    InnerNode::regular(children)
                };
                (Arc::new(root), self.shift + B)
            }
        };

        Vector {
            len: self.len + 1,
            shift,
            root,
            tail: Arc::new(LeafNode::new(vec![value])),
        }
    }

    /// New vector with the element at `index` replaced
    ///
    /// Returns `None` if `index` is out of bounds. Only the path from the root
    /// to the modified leaf is copied.
    pub fn set(&self, index: usize, value: T) -> Option<Self> {
        if index >= self.len {
            return None;
        }
        let tail_offset = self.tail_offset();
        if index >= tail_offset {
            let mut items = self.tail.items().to_vec();
            items[index - tail_offset] = value;
            return Some(Vector {
                len: self.len,
                shift: self.shift,
                root: Arc::clone(&self.root),
                tail: Arc::new(LeafNode::new(items)),
            });
        }

        let root = Self::set_in(&self.root, self.shift, index, value)?;
        Some(Vector {
            len: self.len,
            shift: self.shift,
            root: Arc::new(root),
            tail: Arc::clone(&self.tail),
        })
    }

    fn set_in(node: &InnerNode<T>, shift: u32, idx: usize, value: T) -> Option<InnerNode<T>> {
        let (slot, sub) = Self::locate(node, shift, idx)?;
        let replacement = match node.children().get(slot)? {
            NodeRef::Inner(child) => {
                NodeRef::Inner(Arc::new(Self::set_in(child, shift - B, sub, value)?))
            }
            NodeRef::Leaf(leaf) => {
                let mut items = leaf.items().to_vec();
                *items.get_mut(sub)? = value;
                NodeRef::Leaf(Arc::new(LeafNode::new(items)))
            }
        };
        let mut copy = node.clone();
        copy.replace_child(slot, replacement);
        Some(copy)
    }

    /// Copy of `node` with `leaf` appended at the rightmost position
    ///
    /// Returns `None` when the subtree under `node` has no room left.
    fn push_tail(
        node: &InnerNode<T>,
        shift: u32,
        leaf: &Arc<LeafNode<T>>,
    ) -> Option<InnerNode<T>> {
        let leaf_len = leaf.len();
        if shift == BL {
            if node.children().len() >= Self::BRANCHES {
                return None;
            }
            let mut copy = Self::appendable(node, shift);
            copy.push_child(NodeRef::Leaf(Arc::clone(leaf)), leaf_len);
            return Some(copy);
        }

        if let Some(NodeRef::Inner(last)) = node.children().last() {
            if let Some(child) = Self::push_tail(last, shift - B, leaf) {
                let mut copy = node.clone();
                copy.replace_last(NodeRef::Inner(Arc::new(child)), leaf_len);
                return Some(copy);
            }
        }

        if node.children().len() >= Self::BRANCHES {
            return None;
        }
        let mut copy = Self::appendable(node, shift);
        copy.push_child(NodeRef::Inner(Self::new_path(shift - B, leaf)), leaf_len);
        Some(copy)
    }

    /// Copy of `node` that can take one more child
    ///
    /// A regular node whose last child is not full (possible in loaded trees)
    /// gets a size table first, since radix indexing would skip the gap.
    fn appendable(node: &InnerNode<T>, shift: u32) -> InnerNode<T> {
        let full = match node.children().last() {
            None => true,
            Some(_) if node.is_relaxed() => true,
            Some(last) => Self::child_len(last, shift) == 1usize << shift,
        };
        if full {
            return node.clone();
        }
        let mut total = 0;
        let sizes = node
            .children()
            .iter()
            .map(|child| {
                total += Self::child_len(child, shift);
                total
            })
            .collect();
        InnerNode::relaxed(node.children().to_vec(), sizes)
    }

    /// Element count under `child` of a node at level `shift`
    fn child_len(child: &NodeRef<T>, shift: u32) -> usize {
        match child {
            NodeRef::Leaf(leaf) => leaf.len(),
            NodeRef::Inner(inner) => Self::tree_len(inner, shift - B),
        }
    }

    /// Element count under an inner node at level `shift`
    fn tree_len(node: &InnerNode<T>, shift: u32) -> usize {
        if let Some(sizes) = node.sizes() {
            return sizes.last().copied().unwrap_or(0);
        }
        match node.children().split_last() {
            None => 0,
            Some((last, rest)) => (rest.len() << shift) + Self::child_len(last, shift),
        }
    }

    /// Chain of single-child inner nodes from level `shift` down to `leaf`
    fn new_path(shift: u32, leaf: &Arc<LeafNode<T>>) -> Arc<InnerNode<T>> {
        let mut node = Arc::new(InnerNode::regular(vec![NodeRef::Leaf(Arc::clone(leaf))]));
        let mut level = BL;
        while level < shift {
            node = Arc::new(InnerNode::regular(vec![NodeRef::Inner(node)]));
            level += B;
        }
        node
    }
}

impl<T, const B: u32, const BL: u32> Clone for Vector<T, B, BL> {
    fn clone(&self) -> Self {
        Vector {
            len: self.len,
            shift: self.shift,
            root: Arc::clone(&self.root),
            tail: Arc::clone(&self.tail),
        }
    }
}

impl<T, const B: u32, const BL: u32> Default for Vector<T, B, BL> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq, const B: u32, const BL: u32> PartialEq for Vector<T, B, BL> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq, const B: u32, const BL: u32> Eq for Vector<T, B, BL> {}

impl<T: fmt::Debug, const B: u32, const BL: u32> fmt::Debug for Vector<T, B, BL> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Clone, const B: u32, const BL: u32> FromIterator<T> for Vector<T, B, BL> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Vector::new(), |vector, value| vector.push_back(value))
    }
}

impl<'a, T, const B: u32, const BL: u32> IntoIterator for &'a Vector<T, B, BL> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Plain serde form: a sequence of elements (no sharing preserved)
impl<T: Serialize, const B: u32, const BL: u32> Serialize for Vector<T, B, BL> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T, const B: u32, const BL: u32> Deserialize<'de> for Vector<T, B, BL>
where
    T: Deserialize<'de> + Clone,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}
