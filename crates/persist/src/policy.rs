//! Persistence policies
//!
//! A policy answers three questions for an archive:
//! - which container types get a pool
//! - what each pool is called
//! - under which key the value sits, and how it is wrapped
//!
//! Two policies are provided:
//! - AutoPolicy: pool types derived from the record's fields, each pool named
//!   after the first field holding that type, value under `value0`
//! - NamedPolicy: explicit root key and an explicit, closed set of named pools

use crate::container::Poolable;
use crate::pool_set::PoolType;
use crate::record::{Fields, Record};
use serde_json::{Map, Value};
use strata_core::{Error, Result};

/// Root key used when a policy does not choose one
pub const DEFAULT_ROOT_KEY: &str = "value0";

/// Key of the pools object in every archive
pub const POOLS_KEY: &str = "pools";

/// Archive layout decisions for records of type `R`
pub trait Policy<R: Record> {
    /// Container types that get a pool, in declaration order
    fn pool_types(&self, value: &R) -> Vec<PoolType>;

    /// Name of the pool for `ty`
    fn pool_name(&self, ty: &PoolType) -> Result<String>;

    /// Key the encoded value is stored under
    fn root_key(&self) -> &str {
        DEFAULT_ROOT_KEY
    }

    /// Place the encoded value into the top-level archive object
    fn wrap_value(&self, encoded: Value) -> Result<Map<String, Value>> {
        let mut archive = Map::new();
        archive.insert(self.root_key().to_string(), encoded);
        Ok(archive)
    }

    /// Take the encoded value back out of the archive object
    ///
    /// `archive` no longer contains the pools.
    fn unwrap_value(&self, mut archive: Map<String, Value>) -> Result<Value> {
        archive
            .remove(self.root_key())
            .ok_or_else(|| Error::Serialization(format!("missing root key '{}'", self.root_key())))
    }
}

// ============================================================================
// AutoPolicy
// ============================================================================

/// Pools derived from the record's fields
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoPolicy;

impl AutoPolicy {
    /// Create the policy
    pub fn new() -> Self {
        AutoPolicy
    }
}

impl<R: Record> Policy<R> for AutoPolicy {
    fn pool_types(&self, _value: &R) -> Vec<PoolType> {
        Fields::<R>::of()
            .pool_types()
            .into_iter()
            .map(|(ty, _)| ty)
            .collect()
    }

    fn pool_name(&self, ty: &PoolType) -> Result<String> {
        Fields::<R>::of()
            .pool_types()
            .into_iter()
            .find(|(candidate, _)| candidate == ty)
            .map(|(_, name)| name.to_string())
            .ok_or_else(|| {
                Error::PolicyError(format!(
                    "container type {} does not appear in {}",
                    ty.type_name(),
                    std::any::type_name::<R>()
                ))
            })
    }
}

// ============================================================================
// NamedPolicy
// ============================================================================

/// Explicit root key and pool names
///
/// ```ignore
/// let policy = NamedPolicy::new("doc2_value")
///     .pool::<Vector<i32, 5, 1>>("vector_of_ints")
///     .pool::<Vector<String, 5, 1>>("vector_of_strings");
/// ```
#[derive(Debug, Clone)]
pub struct NamedPolicy {
    root_key: String,
    pools: Vec<(PoolType, String)>,
}

impl NamedPolicy {
    /// Policy storing the value under `root_key`, with no pools yet
    pub fn new(root_key: impl Into<String>) -> Self {
        NamedPolicy {
            root_key: root_key.into(),
            pools: Vec::new(),
        }
    }

    /// Declare a pool for container type `C`
    pub fn pool<C: Poolable>(mut self, name: impl Into<String>) -> Self {
        self.pools.push((PoolType::of::<C>(), name.into()));
        self
    }
}

impl<R: Record> Policy<R> for NamedPolicy {
    fn pool_types(&self, _value: &R) -> Vec<PoolType> {
        self.pools.iter().map(|(ty, _)| *ty).collect()
    }

    fn pool_name(&self, ty: &PoolType) -> Result<String> {
        self.pools
            .iter()
            .find(|(candidate, _)| candidate == ty)
            .map(|(_, name)| name.clone())
            .ok_or_else(|| {
                Error::PolicyError(format!(
                    "no pool name declared for container type {}",
                    ty.type_name()
                ))
            })
    }

    fn root_key(&self) -> &str {
        &self.root_key
    }
}
