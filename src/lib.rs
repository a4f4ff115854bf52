//! StrataPool - Sharing-preserving serialization for persistent vectors
//!
//! Persistent vectors share most of their structure with the versions they
//! were derived from. StrataPool writes a whole family of such vectors with
//! every distinct node stored once, and reads it back with the sharing intact.
//!
//! # Quick Start
//!
//! ```ignore
//! use stratapool::{load, save, AutoPolicy, Fields, Record, Vector};
//!
//! #[derive(Default)]
//! struct Document {
//!     ints: Vector<i32, 5, 1>,
//!     ints2: Vector<i32, 5, 1>,
//! }
//!
//! impl Record for Document {
//!     fn describe(fields: &mut Fields<Self>) {
//!         fields
//!             .container("ints", |d| &d.ints, |d| &mut d.ints)
//!             .container("ints2", |d| &d.ints2, |d| &mut d.ints2);
//!     }
//! }
//!
//! let bytes = save(&doc, &AutoPolicy)?;
//! let back: Document = load(&bytes, &AutoPolicy)?;
//! ```
//!
//! # Architecture
//!
//! - strata-core: Keys, tree shapes and the error type
//! - strata-rbts: The persistent vector and its nodes
//! - strata-persist: Pools, policies, archives and transforms

pub use strata_core::{Error, InstanceIndex, NodeKey, Reference, Result, TreeShape};
pub use strata_persist::*;
pub use strata_rbts::{count_distinct_nodes, node_stats, NodeIdentity, NodeStats, Vector};
