//! Core types for Strata pools
//!
//! This crate defines the foundational types shared by the container and the
//! persistence layer:
//! - NodeKey: Pool-wide key assigned to a physically distinct node
//! - InstanceIndex: Position of a container instance in a pool's vector list
//! - TreeShape: The B/BL constants describing a container type's tree
//! - Error: Error type hierarchy for save, load and transform

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Reference, Result};
pub use types::{InstanceIndex, NodeKey, TreeShape};
