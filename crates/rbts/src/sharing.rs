//! Structural sharing statistics
//!
//! Counts physically distinct nodes reachable from a set of vectors. Two
//! vectors that share history report fewer nodes together than the sum of
//! their individual counts.

use crate::node::{InnerNode, NodeIdentity, NodeRef};
use crate::vector::Vector;
use rustc_hash::FxHashSet;

/// Count of physically distinct nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    /// Distinct inner nodes
    pub inner_nodes: usize,
    /// Distinct leaf nodes
    pub leaf_nodes: usize,
}

impl NodeStats {
    /// Inner plus leaf nodes
    pub fn total(&self) -> usize {
        self.inner_nodes + self.leaf_nodes
    }
}

/// Distinct nodes reachable from `vectors` (roots, tails and all subtrees)
pub fn node_stats<T, const B: u32, const BL: u32>(vectors: &[&Vector<T, B, BL>]) -> NodeStats {
    let mut seen = FxHashSet::default();
    let mut stats = NodeStats::default();
    for vector in vectors {
        if seen.insert(NodeIdentity::of(vector.root())) {
            stats.inner_nodes += 1;
            visit_children(vector.root(), &mut seen, &mut stats);
        }
        if seen.insert(NodeIdentity::of(vector.tail())) {
            stats.leaf_nodes += 1;
        }
    }
    stats
}

/// Total distinct nodes reachable from `vectors`
pub fn count_distinct_nodes<T, const B: u32, const BL: u32>(vectors: &[&Vector<T, B, BL>]) -> usize {
    node_stats(vectors).total()
}

fn visit_children<T>(node: &InnerNode<T>, seen: &mut FxHashSet<NodeIdentity>, stats: &mut NodeStats) {
    for child in node.children() {
        if !seen.insert(child.identity()) {
            continue;
        }
        match child {
            NodeRef::Inner(inner) => {
                stats.inner_nodes += 1;
                visit_children(inner, seen, stats);
            }
            NodeRef::Leaf(_) => stats.leaf_nodes += 1,
        }
    }
}
