//! Relaxed-radix-balanced persistent vector
//!
//! This crate provides the immutable container whose structure the pool layer
//! serializes:
//! - Vector: Persistent vector with O(1) clone and structural sharing
//! - InnerNode / LeafNode / NodeRef: The two node shapes of the tree
//! - NodeIdentity: Physical identity of a node (allocation, not content)
//! - sharing: Distinct-node statistics for observing sharing

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod iter;
pub mod node;
pub mod sharing;
pub mod vector;

pub use iter::Iter;
pub use node::{InnerNode, LeafNode, NodeIdentity, NodeRef};
pub use sharing::{count_distinct_nodes, node_stats, NodeStats};
pub use vector::{Vector, DEFAULT_BITS, DEFAULT_LEAF_BITS};
