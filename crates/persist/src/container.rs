//! Poolable container seam
//!
//! The pool layer does not care how a container is implemented as long as it
//! can expose its root and tail nodes and be reassembled from them.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use strata_core::TreeShape;
use strata_rbts::{InnerNode, LeafNode, Vector};

/// Element types that can be stored in a pool
pub trait Element: Clone + Serialize + DeserializeOwned + 'static {}

impl<T> Element for T where T: Clone + Serialize + DeserializeOwned + 'static {}

/// A container type that gets its own pool
pub trait Poolable: Clone + 'static {
    /// Element type
    type Elem: Element;

    /// B/BL of this container type
    const SHAPE: TreeShape;

    /// Root of the main tree
    fn root(&self) -> &Arc<InnerNode<Self::Elem>>;

    /// Trailing leaf
    fn tail(&self) -> &Arc<LeafNode<Self::Elem>>;

    /// Reassemble a container from validated nodes
    fn assemble(
        root: Arc<InnerNode<Self::Elem>>,
        tail: Arc<LeafNode<Self::Elem>>,
        shift: u32,
        len: usize,
    ) -> Self;
}

impl<T: Element, const B: u32, const BL: u32> Poolable for Vector<T, B, BL> {
    type Elem = T;

    const SHAPE: TreeShape = TreeShape::new(B, BL);

    fn root(&self) -> &Arc<InnerNode<T>> {
        Vector::root(self)
    }

    fn tail(&self) -> &Arc<LeafNode<T>> {
        Vector::tail(self)
    }

    fn assemble(root: Arc<InnerNode<T>>, tail: Arc<LeafNode<T>>, shift: u32, len: usize) -> Self {
        Vector::from_raw_parts(root, tail, shift, len)
    }
}
