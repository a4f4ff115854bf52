//! Key and shape types for pools
//!
//! This module defines the small value types that appear on the wire:
//! - NodeKey: Sequential key of a node inside one pool
//! - InstanceIndex: Index into a pool's `vectors` list
//! - TreeShape: Branch bits (B) and leaf bits (BL) of a container type

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a container instance inside a pool's `vectors` list
///
/// This integer is what stands in for a container inside a saved value.
pub type InstanceIndex = usize;

/// Key of a node inside a pool
///
/// Keys are handed out sequentially, starting at zero, in the order nodes are
/// first discovered. Inner and leaf nodes share one key space, so a key is
/// unique across both node maps of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// Create a key from a raw integer
    pub const fn new(raw: u64) -> Self {
        NodeKey(raw)
    }

    /// Get the raw integer value
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeKey {
    fn from(raw: u64) -> Self {
        NodeKey(raw)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tree shape of a container type
///
/// `bits` (B) bounds the fanout of inner nodes to `2^B` children and
/// `leaf_bits` (BL) bounds leaves to `2^BL` elements. Both are carried in every
/// pool so a loader can check that the running container type matches the one
/// that produced the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeShape {
    /// Branch bits (B)
    #[serde(rename = "B")]
    pub bits: u32,
    /// Leaf bits (BL)
    #[serde(rename = "BL")]
    pub leaf_bits: u32,
}

impl TreeShape {
    /// Create a new shape
    pub const fn new(bits: u32, leaf_bits: u32) -> Self {
        TreeShape { bits, leaf_bits }
    }

    /// Maximum number of children of an inner node
    pub const fn branches(&self) -> usize {
        1 << self.bits
    }

    /// Maximum number of elements of a leaf node
    pub const fn leaf_capacity(&self) -> usize {
        1 << self.leaf_bits
    }
}

impl fmt::Display for TreeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B={}, BL={}", self.bits, self.leaf_bits)
    }
}
