//! Pool sets
//!
//! A value holds containers of several types; each type gets its own pool.
//! This module provides the type-erased plumbing:
//! - PoolType: Descriptor of a poolable container type
//! - PoolSet: Named output pools, one per declared type
//! - LoaderSet: Named loaders keyed by container type
//!
//! Both sets preserve declaration order so the encoded `pools` object and the
//! key assignment are reproducible.

use crate::builder::OutputPool;
use crate::codec::{decode_pool, encode_pool};
use crate::container::Poolable;
use crate::loader::PoolLoader;
use serde_json::{Map, Value};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use strata_core::{Error, Result, TreeShape};
use tracing::debug;

// ============================================================================
// PoolType
// ============================================================================

/// Descriptor of a poolable container type
///
/// Two descriptors are equal when they describe the same Rust type.
#[derive(Clone, Copy)]
pub struct PoolType {
    id: TypeId,
    type_name: &'static str,
    shape: TreeShape,
    new_output: fn() -> Box<dyn ErasedPool>,
    decode: fn(&str, Value) -> Result<Box<dyn Any>>,
}

impl PoolType {
    /// Descriptor for container type `C`
    pub fn of<C: Poolable>() -> Self {
        PoolType {
            id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
            shape: C::SHAPE,
            new_output: new_output::<C>,
            decode: decode_loader::<C>,
        }
    }

    /// Rust type id of the container
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Rust type name of the container, for messages
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// B/BL of the container
    pub fn shape(&self) -> TreeShape {
        self.shape
    }

    /// Fresh empty output pool for this type
    pub(crate) fn new_output(&self) -> Box<dyn ErasedPool> {
        (self.new_output)()
    }

    /// Decode and validate a pool document into a boxed `PoolLoader`
    pub(crate) fn decode(&self, name: &str, value: Value) -> Result<Box<dyn Any>> {
        (self.decode)(name, value)
    }
}

fn new_output<C: Poolable>() -> Box<dyn ErasedPool> {
    Box::new(OutputPool::<C>::new())
}

fn decode_loader<C: Poolable>(name: &str, value: Value) -> Result<Box<dyn Any>> {
    let pool = decode_pool::<C::Elem>(name, value, C::SHAPE)?;
    Ok(Box::new(PoolLoader::<C>::new(name, pool)?))
}

impl PartialEq for PoolType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PoolType {}

impl Hash for PoolType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolType")
            .field("type_name", &self.type_name)
            .field("shape", &self.shape)
            .finish()
    }
}

// ============================================================================
// Output pools
// ============================================================================

/// Object-safe view of an `OutputPool`
pub trait ErasedPool: Any {
    /// Descriptor of the pooled container type
    fn pool_type(&self) -> PoolType;

    /// Encode the pool into its wire document
    fn encode(&self) -> Result<Value>;

    /// Distinct nodes recorded
    fn node_count(&self) -> usize;

    /// Distinct leaves recorded
    fn leaf_count(&self) -> usize;

    /// Container instances recorded
    fn vector_count(&self) -> usize;

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Poolable> ErasedPool for OutputPool<C> {
    fn pool_type(&self) -> PoolType {
        PoolType::of::<C>()
    }

    fn encode(&self) -> Result<Value> {
        encode_pool(self.pool())
    }

    fn node_count(&self) -> usize {
        self.pool().node_count()
    }

    fn leaf_count(&self) -> usize {
        self.pool().leaves.len()
    }

    fn vector_count(&self) -> usize {
        self.pool().vectors.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct NamedPool {
    name: String,
    pool: Box<dyn ErasedPool>,
}

/// Named output pools, one per declared container type
#[derive(Default)]
pub struct PoolSet {
    entries: Vec<NamedPool>,
}

impl PoolSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a pool for `ty` under `name`
    ///
    /// Each type and each name may be declared once.
    pub fn declare(&mut self, ty: PoolType, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if let Some(existing) = self.entries.iter().find(|e| e.pool.pool_type() == ty) {
            return Err(Error::PolicyError(format!(
                "container type {} declared twice (as '{}' and '{}')",
                ty.type_name(),
                existing.name,
                name
            )));
        }
        if self.entries.iter().any(|e| e.name == name) {
            return Err(Error::PolicyError(format!(
                "pool name '{}' used for more than one container type",
                name
            )));
        }
        self.entries.push(NamedPool {
            name,
            pool: ty.new_output(),
        });
        Ok(())
    }

    /// Output pool for container type `C`
    pub fn get<C: Poolable>(&self) -> Option<&OutputPool<C>> {
        self.entry(TypeId::of::<C>())
            .and_then(|e| e.pool.as_any().downcast_ref())
    }

    /// Mutable output pool for container type `C`
    pub fn get_mut<C: Poolable>(&mut self) -> Option<&mut OutputPool<C>> {
        let id = TypeId::of::<C>();
        self.entries
            .iter_mut()
            .find(|e| e.pool.pool_type().id() == id)
            .and_then(|e| e.pool.as_any_mut().downcast_mut())
    }

    /// Pool name declared for container type `C`
    pub fn name_of<C: Poolable>(&self) -> Option<&str> {
        self.entry(TypeId::of::<C>()).map(|e| e.name.as_str())
    }

    /// Record a container in its pool and return the instance index
    pub fn add<C: Poolable>(&mut self, container: &C) -> Result<usize> {
        self.get_mut::<C>()
            .map(|pool| pool.add(container))
            .ok_or_else(|| undeclared(std::any::type_name::<C>()))
    }

    /// Pool names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Pools in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn ErasedPool)> {
        self.entries.iter().map(|e| (e.name.as_str(), e.pool.as_ref()))
    }

    /// Number of pools
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no pool is declared
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode all pools into the `pools` object of an archive
    pub fn encode(&self) -> Result<Map<String, Value>> {
        let mut pools = Map::new();
        for entry in &self.entries {
            debug!(
                target: "strata::persist",
                pool = %entry.name,
                nodes = entry.pool.node_count(),
                vectors = entry.pool.vector_count(),
                "Encoding pool"
            );
            pools.insert(entry.name.clone(), entry.pool.encode()?);
        }
        Ok(pools)
    }

    fn entry(&self, id: TypeId) -> Option<&NamedPool> {
        self.entries.iter().find(|e| e.pool.pool_type().id() == id)
    }
}

impl fmt::Debug for PoolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|e| (&e.name, e.pool.pool_type())))
            .finish()
    }
}

// ============================================================================
// Loaders
// ============================================================================

struct NamedLoader {
    key: TypeId,
    name: String,
    loader: Box<dyn Any>,
}

/// Named pool loaders keyed by container type
#[derive(Default)]
pub struct LoaderSet {
    entries: Vec<NamedLoader>,
}

impl LoaderSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader under the type id `key`
    pub(crate) fn insert(&mut self, key: TypeId, name: String, loader: Box<dyn Any>) -> Result<()> {
        if self.entries.iter().any(|e| e.key == key || e.name == name) {
            return Err(Error::PolicyError(format!(
                "pool '{}' registered more than once",
                name
            )));
        }
        self.entries.push(NamedLoader { key, name, loader });
        Ok(())
    }

    /// Loader registered under `key` that produces containers of type `D`
    pub(crate) fn loader_mut<D: Poolable>(&mut self, key: TypeId) -> Option<&mut PoolLoader<D>> {
        self.entries
            .iter_mut()
            .find(|e| e.key == key)
            .and_then(|e| e.loader.downcast_mut())
    }

    /// Loader registered under `key` that produces containers of type `D`
    pub(crate) fn loader<D: Poolable>(&self, key: TypeId) -> Option<&PoolLoader<D>> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .and_then(|e| e.loader.downcast_ref())
    }

    /// Pool name registered under `key`
    pub(crate) fn name_of(&self, key: TypeId) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.name.as_str())
    }

    /// Load a container of type `C` from its own pool
    pub fn load<C: Poolable>(&mut self, index: usize) -> Result<C> {
        self.loader_mut::<C>(TypeId::of::<C>())
            .ok_or_else(|| undeclared(std::any::type_name::<C>()))?
            .load(index)
    }

    /// Pool names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Number of loaders
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no loader is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for LoaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|e| &e.name)).finish()
    }
}

fn undeclared(type_name: &str) -> Error {
    Error::PolicyError(format!("no pool declared for container type {}", type_name))
}
