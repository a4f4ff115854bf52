//! Sharing-preserving persistence for persistent vectors
//!
//! Containers that share structure in memory are written so that every
//! physically distinct node appears once, and are read back sharing the same
//! nodes again.
//!
//! - pool / codec: Per-type node pools and their wire form
//! - builder: Pool construction from live containers
//! - loader: Validation and memoized reconstruction
//! - record / policy: Which fields hold containers, and how pools are named
//! - archive: `save` / `load` over a choice of carriers
//! - transform: Element rewriting over whole pools, plus `remap`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;
pub mod builder;
pub mod codec;
pub mod container;
pub mod loader;
pub mod policy;
pub mod pool;
pub mod pool_set;
pub mod record;
pub mod transform;

pub use archive::{auto_pool, build_pools, from_document, load, load_with, save, save_with, to_document, Carrier};
pub use builder::OutputPool;
pub use codec::{decode_pool, encode_pool};
pub use container::{Element, Poolable};
pub use loader::PoolLoader;
pub use policy::{AutoPolicy, NamedPolicy, Policy, DEFAULT_ROOT_KEY, POOLS_KEY};
pub use pool::{InnerEntry, Pool, VectorEntry};
pub use pool_set::{ErasedPool, LoaderSet, PoolSet, PoolType};
pub use record::{decode_record, encode_record, Fields, Record};
pub use transform::{remap, transform, transform_pool, ConversionTable, TransformedPoolSet};
