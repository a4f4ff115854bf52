//! Error types for Strata pools
//!
//! This module defines all error types used when saving, loading and
//! transforming pooled containers. We use `thiserror` for automatic `Display`
//! and `Error` trait implementations.
//!
//! Decode-time errors are detected before any container is materialized, so a
//! failed load never hands back a partially built container.

use crate::types::{InstanceIndex, NodeKey, TreeShape};
use std::fmt;
use thiserror::Error;

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Something a pool refers to by integer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// A node key (child of an inner node, or root/tail of a vector)
    Node(NodeKey),
    /// An index into the pool's `vectors` list
    Instance(InstanceIndex),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Node(key) => write!(f, "node {}", key),
            Reference::Instance(index) => write!(f, "vector instance {}", index),
        }
    }
}

/// Error types for pool save, load and transform
#[derive(Debug, Error)]
pub enum Error {
    /// A node key or instance index is referenced but never defined
    #[error("Dangling reference in pool '{pool}': {reference}")]
    DanglingReference {
        /// Pool name
        pool: String,
        /// The missing reference
        reference: Reference,
    },

    /// B/BL in the data disagree with the running container type
    #[error("Structural mismatch in pool '{pool}': expected {expected}, found {found}")]
    StructuralMismatch {
        /// Pool name
        pool: String,
        /// Shape of the running container type
        expected: TreeShape,
        /// Shape found in the data (fields may be missing)
        found: String,
    },

    /// A node breaks a structural invariant (fanout, height, fullness, cycles)
    #[error("Invariant violation in pool '{pool}': {reason}")]
    InvariantViolation {
        /// Pool name
        pool: String,
        /// What was violated
        reason: String,
    },

    /// The same key is defined more than once
    #[error("Duplicate key {key} in pool '{pool}'")]
    DuplicateKey {
        /// Pool name
        pool: String,
        /// The repeated key
        key: NodeKey,
    },

    /// A transform was requested for a container type with no function
    #[error("No transform registered for container type {0}")]
    MissingTransform(String),

    /// The policy cannot place a container type or pool
    #[error("Policy error: {0}")]
    PolicyError(String),

    /// Wire carrier failure (malformed document, wrong element type)
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A user supplied transform function failed
    #[error("Transform failed in pool '{pool}': {source}")]
    Transform {
        /// Pool name
        pool: String,
        /// Error raised by the transform function
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Build an `InvariantViolation` for a pool
    pub fn invariant(pool: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvariantViolation {
            pool: pool.into(),
            reason: reason.into(),
        }
    }

    /// Build a `DanglingReference` to a node key
    pub fn dangling_node(pool: impl Into<String>, key: NodeKey) -> Self {
        Error::DanglingReference {
            pool: pool.into(),
            reference: Reference::Node(key),
        }
    }

    /// Build a `DanglingReference` to a vector instance
    pub fn dangling_instance(pool: impl Into<String>, index: InstanceIndex) -> Self {
        Error::DanglingReference {
            pool: pool.into(),
            reference: Reference::Instance(index),
        }
    }

    /// True for errors raised while decoding or validating wire data
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Error::DanglingReference { .. }
                | Error::StructuralMismatch { .. }
                | Error::InvariantViolation { .. }
                | Error::DuplicateKey { .. }
                | Error::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
