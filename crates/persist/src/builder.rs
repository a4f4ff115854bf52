//! Pool builder
//!
//! Walks containers and records each physically distinct node exactly once.
//! Node identity is the allocation address, so the builder keeps a clone of
//! every keyed node alive for as long as it exists; otherwise a freed node's
//! address could be reused by an unrelated node and alias its key.
//!
//! Key assignment is deterministic for a given sequence of `add` calls:
//! - a container's root is keyed first, then its tail
//! - an inner node keys all of its children in order before descending
//! - a node keeps the key it was given the first time it was seen

use crate::container::Poolable;
use crate::pool::{InnerEntry, Pool, VectorEntry};
use rustc_hash::FxHashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use strata_core::{InstanceIndex, NodeKey};
use strata_rbts::{InnerNode, NodeIdentity, NodeRef};
use tracing::trace;

/// Pool under construction for one container type
pub struct OutputPool<C: Poolable> {
    pool: Pool<C::Elem>,
    node_keys: FxHashMap<NodeIdentity, NodeKey>,
    instances: FxHashMap<VectorEntry, InstanceIndex>,
    // Keeps keyed nodes alive so their addresses stay unique
    anchors: Vec<NodeRef<C::Elem>>,
    _container: PhantomData<fn() -> C>,
}

impl<C: Poolable> OutputPool<C> {
    /// Create an empty builder
    pub fn new() -> Self {
        OutputPool {
            pool: Pool::new(C::SHAPE),
            node_keys: FxHashMap::default(),
            instances: FxHashMap::default(),
            anchors: Vec::new(),
            _container: PhantomData,
        }
    }

    /// Record a container and return its instance index
    ///
    /// Adding a container whose root and tail are physically identical to an
    /// already recorded instance returns the existing index.
    pub fn add(&mut self, container: &C) -> InstanceIndex {
        let root = container.root();
        let tail = container.tail();
        let entry = VectorEntry {
            root: self.key_for(&NodeRef::Inner(Arc::clone(root))),
            tail: self.key_for(&NodeRef::Leaf(Arc::clone(tail))),
        };

        if let Some(&index) = self.instances.get(&entry) {
            return index;
        }

        if !self.pool.inners.contains_key(&entry.root) {
            self.save_inner(entry.root, root);
        }
        self.pool
            .leaves
            .entry(entry.tail)
            .or_insert_with(|| tail.items().to_vec());

        let index = self.pool.vectors.len();
        self.pool.vectors.push(entry);
        self.instances.insert(entry, index);
        trace!(
            target: "strata::persist",
            index,
            root = %entry.root,
            tail = %entry.tail,
            nodes = self.pool.node_count(),
            "Recorded container instance"
        );
        index
    }

    /// Instance index of a container, if it was recorded
    pub fn instance_of(&self, container: &C) -> Option<InstanceIndex> {
        let entry = self.entry_of(container)?;
        self.instances.get(&entry).copied()
    }

    /// Root and tail keys of a container whose nodes are in this pool
    pub fn entry_of(&self, container: &C) -> Option<VectorEntry> {
        Some(VectorEntry {
            root: self.key_of(NodeIdentity::of(container.root()))?,
            tail: self.key_of(NodeIdentity::of(container.tail()))?,
        })
    }

    /// Key assigned to a node, if it was seen
    pub fn key_of(&self, identity: NodeIdentity) -> Option<NodeKey> {
        self.node_keys.get(&identity).copied()
    }

    /// The pool built so far
    pub fn pool(&self) -> &Pool<C::Elem> {
        &self.pool
    }

    /// Finish building and return the pool
    pub fn into_pool(self) -> Pool<C::Elem> {
        self.pool
    }

    fn key_for(&mut self, node: &NodeRef<C::Elem>) -> NodeKey {
        let identity = node.identity();
        if let Some(&key) = self.node_keys.get(&identity) {
            return key;
        }
        let key = NodeKey(self.node_keys.len() as u64);
        self.node_keys.insert(identity, key);
        self.anchors.push(node.clone());
        key
    }

    fn save_inner(&mut self, key: NodeKey, node: &Arc<InnerNode<C::Elem>>) {
        let children: Vec<NodeKey> = node.children().iter().map(|child| self.key_for(child)).collect();
        self.pool.inners.insert(
            key,
            InnerEntry {
                children: children.clone(),
                relaxed: node.is_relaxed(),
            },
        );

        for (child, child_key) in node.children().iter().zip(children) {
            match child {
                NodeRef::Inner(inner) => {
                    if !self.pool.inners.contains_key(&child_key) {
                        self.save_inner(child_key, inner);
                    }
                }
                NodeRef::Leaf(leaf) => {
                    self.pool
                        .leaves
                        .entry(child_key)
                        .or_insert_with(|| leaf.items().to_vec());
                }
            }
        }
    }
}

impl<C: Poolable> Default for OutputPool<C> {
    fn default() -> Self {
        Self::new()
    }
}
