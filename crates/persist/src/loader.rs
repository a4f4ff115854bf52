//! Pool loader
//!
//! Turns a pool back into containers. Construction validates the whole pool
//! (height, fullness, acyclicity, root/tail kinds) before any node is built;
//! materialization is then memoized by key so every key yields exactly one
//! node, shared by all containers that reference it.

use crate::container::Poolable;
use crate::pool::{InnerEntry, Pool, VectorEntry};
use rustc_hash::FxHashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use strata_core::{Error, InstanceIndex, NodeKey, Result};
use strata_rbts::{InnerNode, LeafNode, NodeRef};
use tracing::debug;

/// Height and element count of a validated node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeInfo {
    // 0 for leaves
    height: u32,
    size: usize,
}

enum Mark {
    Visiting,
    Done(NodeInfo),
}

/// Validated pool plus the memo of materialized nodes
pub struct PoolLoader<C: Poolable> {
    name: String,
    pool: Pool<C::Elem>,
    plan: FxHashMap<NodeKey, NodeInfo>,
    inners: FxHashMap<NodeKey, Arc<InnerNode<C::Elem>>>,
    leaves: FxHashMap<NodeKey, Arc<LeafNode<C::Elem>>>,
    _container: PhantomData<fn() -> C>,
}

impl<C: Poolable> std::fmt::Debug for PoolLoader<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolLoader")
            .field("name", &self.name)
            .field("nodes", &self.pool.node_count())
            .field("vectors", &self.pool.vectors.len())
            .field("materialized", &(self.inners.len() + self.leaves.len()))
            .finish()
    }
}

impl<C: Poolable> PoolLoader<C> {
    /// Validate `pool` and prepare it for loading
    pub fn new(name: impl Into<String>, pool: Pool<C::Elem>) -> Result<Self> {
        let name = name.into();
        if pool.shape != C::SHAPE {
            return Err(Error::StructuralMismatch {
                pool: name,
                expected: C::SHAPE,
                found: pool.shape.to_string(),
            });
        }
        pool.check_structure(&name)?;

        let mut loader = PoolLoader {
            name,
            pool,
            plan: FxHashMap::default(),
            inners: FxHashMap::default(),
            leaves: FxHashMap::default(),
            _container: PhantomData,
        };
        loader.plan = loader.build_plan()?;
        loader.check_vectors()?;

        debug!(
            target: "strata::persist",
            pool = %loader.name,
            nodes = loader.pool.node_count(),
            vectors = loader.pool.vectors.len(),
            "Validated pool"
        );
        Ok(loader)
    }

    /// Pool name used in errors
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The validated pool
    pub fn pool(&self) -> &Pool<C::Elem> {
        &self.pool
    }

    /// Number of container instances in the pool
    pub fn len(&self) -> usize {
        self.pool.vectors.len()
    }

    /// True if the pool has no container instances
    pub fn is_empty(&self) -> bool {
        self.pool.vectors.is_empty()
    }

    /// Load the container at `index`
    ///
    /// Loading the same index twice, or two instances with common nodes,
    /// returns containers that share those nodes physically.
    pub fn load(&mut self, index: InstanceIndex) -> Result<C> {
        let entry = *self
            .pool
            .vectors
            .get(index)
            .ok_or_else(|| Error::dangling_instance(&self.name, index))?;
        self.assemble(entry)
    }

    /// Build a container from a root key and a tail key
    pub fn assemble(&mut self, entry: VectorEntry) -> Result<C> {
        let root = match self.node(entry.root)? {
            NodeRef::Inner(inner) => inner,
            NodeRef::Leaf(_) => return Err(self.root_is_leaf(entry.root)),
        };
        let tail = match self.node(entry.tail)? {
            NodeRef::Leaf(leaf) => leaf,
            NodeRef::Inner(_) => return Err(self.tail_is_inner(entry.tail)),
        };

        let info = self.info(entry.root)?;
        let len = info.size + tail.len();
        Ok(C::assemble(root, tail, self.shift_for(info.height), len))
    }

    /// Number of nodes materialized so far
    pub fn materialized(&self) -> usize {
        self.inners.len() + self.leaves.len()
    }

    fn node(&mut self, key: NodeKey) -> Result<NodeRef<C::Elem>> {
        if let Some(inner) = self.inners.get(&key) {
            return Ok(NodeRef::Inner(Arc::clone(inner)));
        }
        if let Some(leaf) = self.leaves.get(&key) {
            return Ok(NodeRef::Leaf(Arc::clone(leaf)));
        }

        if let Some(items) = self.pool.leaves.get(&key) {
            let leaf = Arc::new(LeafNode::new(items.clone()));
            self.leaves.insert(key, Arc::clone(&leaf));
            return Ok(NodeRef::Leaf(leaf));
        }

        let entry = self
            .pool
            .inners
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::dangling_node(&self.name, key))?;

        let mut children = Vec::with_capacity(entry.children.len());
        for child in &entry.children {
            children.push(self.node(*child)?);
        }

        let inner = if entry.relaxed {
            let mut sizes = Vec::with_capacity(entry.children.len());
            let mut total = 0usize;
            for child in &entry.children {
                total += self.info(*child)?.size;
                sizes.push(total);
            }
            InnerNode::relaxed(children, sizes)
        } else {
            InnerNode::regular(children)
        };

        let inner = Arc::new(inner);
        self.inners.insert(key, Arc::clone(&inner));
        Ok(NodeRef::Inner(inner))
    }

    fn info(&self, key: NodeKey) -> Result<NodeInfo> {
        self.plan
            .get(&key)
            .copied()
            .ok_or_else(|| Error::dangling_node(&self.name, key))
    }

    fn shift_for(&self, height: u32) -> u32 {
        self.pool.shape.leaf_bits + self.pool.shape.bits * height.saturating_sub(1)
    }

    /// Elements held by a full subtree of `height`, or None if it would not fit
    fn full_size(&self, height: u32) -> Option<usize> {
        let bits = self
            .pool
            .shape
            .bits
            .checked_mul(height)?
            .checked_add(self.pool.shape.leaf_bits)?;
        1usize.checked_shl(bits)
    }

    /// Compute height and size of every node, rejecting cycles, uneven
    /// heights, partial children of regular nodes and over-deep trees
    fn build_plan(&self) -> Result<FxHashMap<NodeKey, NodeInfo>> {
        let mut marks: FxHashMap<NodeKey, Mark> = FxHashMap::default();
        for (key, items) in &self.pool.leaves {
            marks.insert(
                *key,
                Mark::Done(NodeInfo {
                    height: 0,
                    size: items.len(),
                }),
            );
        }

        for start in self.pool.inners.keys() {
            if marks.contains_key(start) {
                continue;
            }
            marks.insert(*start, Mark::Visiting);
            let mut stack: Vec<(NodeKey, usize)> = vec![(*start, 0)];

            while let Some(top) = stack.last_mut() {
                let key = top.0;
                let entry = self
                    .pool
                    .inners
                    .get(&key)
                    .ok_or_else(|| Error::dangling_node(&self.name, key))?;

                if let Some(child) = entry.children.get(top.1).copied() {
                    top.1 += 1;
                    match marks.get(&child) {
                        Some(Mark::Visiting) => {
                            return Err(Error::invariant(
                                &self.name,
                                format!("cycle through inner node {}", child),
                            ))
                        }
                        Some(Mark::Done(_)) => {}
                        None => {
                            if !self.pool.inners.contains_key(&child) {
                                return Err(Error::dangling_node(&self.name, child));
                            }
                            marks.insert(child, Mark::Visiting);
                            stack.push((child, 0));
                        }
                    }
                } else {
                    let info = self.summarize(key, entry, &marks)?;
                    marks.insert(key, Mark::Done(info));
                    stack.pop();
                }
            }
        }

        Ok(marks
            .into_iter()
            .filter_map(|(key, mark)| match mark {
                Mark::Done(info) => Some((key, info)),
                Mark::Visiting => None,
            })
            .collect())
    }

    fn summarize(&self, key: NodeKey, entry: &InnerEntry, marks: &FxHashMap<NodeKey, Mark>) -> Result<NodeInfo> {
        let mut child_height = None;
        let mut size = 0usize;
        let last = entry.children.len().saturating_sub(1);

        for (position, child) in entry.children.iter().enumerate() {
            let info = match marks.get(child) {
                Some(Mark::Done(info)) => *info,
                _ => return Err(Error::dangling_node(&self.name, *child)),
            };

            match child_height {
                None => child_height = Some(info.height),
                Some(height) if height != info.height => {
                    return Err(Error::invariant(
                        &self.name,
                        format!("inner node {} has children of uneven height", key),
                    ))
                }
                Some(_) => {}
            }

            if !entry.relaxed && position < last && Some(info.size) != self.full_size(info.height) {
                return Err(Error::invariant(
                    &self.name,
                    format!(
                        "regular inner node {} has a partial child {} before its last slot",
                        key, child
                    ),
                ));
            }

            size = size.checked_add(info.size).ok_or_else(|| {
                Error::invariant(&self.name, format!("inner node {} size overflows", key))
            })?;
        }

        let height = child_height.map_or(1, |height| height + 1);
        let too_deep = self
            .pool
            .shape
            .bits
            .checked_mul(height - 1)
            .and_then(|bits| bits.checked_add(self.pool.shape.leaf_bits))
            .map_or(true, |shift| shift >= usize::BITS);
        if too_deep {
            return Err(Error::invariant(
                &self.name,
                format!("inner node {} is too deep (height {})", key, height),
            ));
        }

        Ok(NodeInfo { height, size })
    }

    fn check_vectors(&self) -> Result<()> {
        for entry in &self.pool.vectors {
            if !self.pool.inners.contains_key(&entry.root) {
                return Err(self.root_is_leaf(entry.root));
            }
            if !self.pool.leaves.contains_key(&entry.tail) {
                return Err(self.tail_is_inner(entry.tail));
            }
        }
        Ok(())
    }

    fn root_is_leaf(&self, key: NodeKey) -> Error {
        Error::invariant(&self.name, format!("vector root {} is a leaf", key))
    }

    fn tail_is_inner(&self, key: NodeKey) -> Error {
        Error::invariant(&self.name, format!("vector tail {} is an inner node", key))
    }
}
