//! Pool data model
//!
//! A pool is the per-container-type store of deduplicated nodes plus the list
//! of container instances that reference them:
//! - `inners`: key -> children keys and relaxed flag
//! - `leaves`: key -> elements
//! - `vectors`: (root key, tail key) per container instance
//!
//! Inner and leaf keys share one key space. Both maps are key-ordered so the
//! encoded form is deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strata_core::{Error, NodeKey, Result, TreeShape};

/// Content of an inner node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerEntry {
    /// Child keys in order
    pub children: Vec<NodeKey>,
    /// True if the subtree is not maximally full
    pub relaxed: bool,
}

/// One container instance: the keys of its root and tail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VectorEntry {
    /// Key of the root inner node
    pub root: NodeKey,
    /// Key of the tail leaf
    pub tail: NodeKey,
}

/// Deduplicated nodes and instances of one container type
#[derive(Debug, Clone, PartialEq)]
pub struct Pool<T> {
    /// B/BL of the container type that produced this pool
    pub shape: TreeShape,
    /// Inner nodes by key
    pub inners: BTreeMap<NodeKey, InnerEntry>,
    /// Leaf nodes by key
    pub leaves: BTreeMap<NodeKey, Vec<T>>,
    /// Container instances; a saved container is its index in this list
    pub vectors: Vec<VectorEntry>,
}

impl<T> Pool<T> {
    /// Create an empty pool for a container shape
    pub fn new(shape: TreeShape) -> Self {
        Pool {
            shape,
            inners: BTreeMap::new(),
            leaves: BTreeMap::new(),
            vectors: Vec::new(),
        }
    }

    /// Number of distinct nodes (inner + leaf)
    pub fn node_count(&self) -> usize {
        self.inners.len() + self.leaves.len()
    }

    /// True if `key` names a node of either shape
    pub fn contains(&self, key: NodeKey) -> bool {
        self.inners.contains_key(&key) || self.leaves.contains_key(&key)
    }

    /// True if the pool holds no nodes and no instances
    pub fn is_empty(&self) -> bool {
        self.inners.is_empty() && self.leaves.is_empty() && self.vectors.is_empty()
    }

    /// Check fanout limits and that every reference resolves
    ///
    /// Reports the first problem found: a leaf over `2^BL` elements or an
    /// inner node over `2^B` children is an `InvariantViolation`; a child,
    /// root or tail key missing from both maps is a `DanglingReference`.
    pub fn check_structure(&self, name: &str) -> Result<()> {
        let branches = self.shape.branches();
        let leaf_capacity = self.shape.leaf_capacity();

        for (key, items) in &self.leaves {
            if items.len() > leaf_capacity {
                return Err(Error::invariant(
                    name,
                    format!(
                        "leaf {} holds {} elements, limit is {}",
                        key,
                        items.len(),
                        leaf_capacity
                    ),
                ));
            }
        }

        for (key, inner) in &self.inners {
            if inner.children.len() > branches {
                return Err(Error::invariant(
                    name,
                    format!(
                        "inner node {} has {} children, limit is {}",
                        key,
                        inner.children.len(),
                        branches
                    ),
                ));
            }
            if let Some(missing) = inner.children.iter().find(|child| !self.contains(**child)) {
                return Err(Error::dangling_node(name, *missing));
            }
        }

        for entry in &self.vectors {
            for key in [entry.root, entry.tail] {
                if !self.contains(key) {
                    return Err(Error::dangling_node(name, key));
                }
            }
        }

        Ok(())
    }
}
