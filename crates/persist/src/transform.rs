//! Pool transforms
//!
//! A transform rewrites the elements of every pool while keeping its node
//! structure: keys, children and instances stay identical, only leaf contents
//! change. Each distinct leaf is converted exactly once, so an element shared
//! by many containers is converted once and the result is shared the same way.
//!
//! `remap` then finds the transformed counterpart of any container that was
//! recorded in the source pools.

use crate::builder::OutputPool;
use crate::container::Poolable;
use crate::loader::PoolLoader;
use crate::pool::Pool;
use crate::pool_set::{ErasedPool, LoaderSet, PoolSet};
use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::fmt;
use strata_core::{Error, Result};
use tracing::debug;

type BoxError = Box<dyn StdError + Send + Sync>;

type ConvertPool<'a> = Box<dyn Fn(&str, &dyn ErasedPool) -> Result<Box<dyn Any>> + 'a>;

/// Element conversion functions keyed by source container type
#[derive(Default)]
pub struct ConversionTable<'a> {
    entries: FxHashMap<TypeId, ConvertPool<'a>>,
}

impl<'a> ConversionTable<'a> {
    /// Create an empty table
    pub fn new() -> Self {
        ConversionTable {
            entries: FxHashMap::default(),
        }
    }

    /// Convert elements of `C`, keeping the container type
    pub fn convert<C, F>(self, f: F) -> Self
    where
        C: Poolable,
        F: Fn(&C::Elem) -> C::Elem + 'a,
    {
        self.try_convert_into::<C, C, _, Infallible>(move |x| Ok(f(x)))
    }

    /// Convert elements of `C` into containers of type `D`
    pub fn convert_into<C, D, F>(self, f: F) -> Self
    where
        C: Poolable,
        D: Poolable,
        F: Fn(&C::Elem) -> D::Elem + 'a,
    {
        self.try_convert_into::<C, D, _, Infallible>(move |x| Ok(f(x)))
    }

    /// Convert elements of `C` into containers of type `D` with a fallible
    /// function; the first failure aborts the whole transform
    pub fn try_convert_into<C, D, F, E>(mut self, f: F) -> Self
    where
        C: Poolable,
        D: Poolable,
        F: Fn(&C::Elem) -> std::result::Result<D::Elem, E> + 'a,
        E: Into<BoxError> + 'a,
    {
        let convert: ConvertPool<'a> = Box::new(move |name: &str, erased: &dyn ErasedPool| {
            let source = erased
                .as_any()
                .downcast_ref::<OutputPool<C>>()
                .ok_or_else(|| Error::MissingTransform(std::any::type_name::<C>().to_string()))?;
            if D::SHAPE != C::SHAPE {
                return Err(Error::StructuralMismatch {
                    pool: name.to_string(),
                    expected: C::SHAPE,
                    found: D::SHAPE.to_string(),
                });
            }
            let pool = transform_pool(name, source.pool(), &f)?;
            Ok(Box::new(PoolLoader::<D>::new(name, pool)?) as Box<dyn Any>)
        });
        self.entries.insert(TypeId::of::<C>(), convert);
        self
    }

    /// Number of registered conversions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no conversion is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ConversionTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionTable")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Convert every leaf of `pool` once, keeping keys and structure
pub fn transform_pool<T, U, E, F>(name: &str, pool: &Pool<T>, f: F) -> Result<Pool<U>>
where
    F: Fn(&T) -> std::result::Result<U, E>,
    E: Into<BoxError>,
{
    let mut leaves = BTreeMap::new();
    for (key, items) in &pool.leaves {
        let converted = items
            .iter()
            .map(&f)
            .collect::<std::result::Result<Vec<U>, E>>()
            .map_err(|e| Error::Transform {
                pool: name.to_string(),
                source: e.into(),
            })?;
        leaves.insert(*key, converted);
    }

    Ok(Pool {
        shape: pool.shape,
        inners: pool.inners.clone(),
        leaves,
        vectors: pool.vectors.clone(),
    })
}

/// Transformed pools, materialized lazily and memoized
#[derive(Debug, Default)]
pub struct TransformedPoolSet {
    loaders: LoaderSet,
}

impl TransformedPoolSet {
    /// Loader holding the transformed counterpart of container type `C`
    pub fn loader_mut<C: Poolable, D: Poolable>(&mut self) -> Option<&mut PoolLoader<D>> {
        self.loaders.loader_mut::<D>(TypeId::of::<C>())
    }

    /// Transformed pool of container type `C`
    pub fn pool<C: Poolable, D: Poolable>(&self) -> Option<&Pool<D::Elem>> {
        self.loaders
            .loader::<D>(TypeId::of::<C>())
            .map(|loader| loader.pool())
    }

    /// Load the transformed container at `index` of `C`'s pool
    pub fn load<C: Poolable, D: Poolable>(&mut self, index: usize) -> Result<D> {
        self.loader_mut::<C, D>()
            .ok_or_else(missing::<C, D>)?
            .load(index)
    }

    /// Pool names in source order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.loaders.names()
    }

    /// Number of pools
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    /// True if no pool was transformed
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

/// Apply `table` to every pool of `pools`
///
/// Every pool must have a conversion; otherwise `MissingTransform`.
pub fn transform(pools: &PoolSet, table: &ConversionTable<'_>) -> Result<TransformedPoolSet> {
    let mut loaders = LoaderSet::new();
    for (name, pool) in pools.iter() {
        let ty = pool.pool_type();
        let convert = table
            .entries
            .get(&ty.id())
            .ok_or_else(|| Error::MissingTransform(ty.type_name().to_string()))?;
        let loader = convert(name, pool)?;
        debug!(
            target: "strata::persist",
            pool = name,
            leaves = pool.leaf_count(),
            "Transformed pool"
        );
        loaders.insert(ty.id(), name.to_string(), loader)?;
    }
    Ok(TransformedPoolSet { loaders })
}

/// Transformed counterpart of `container`
///
/// `container` must have been recorded in `pools` (directly, or as a version
/// whose root and tail nodes were recorded). The result shares nodes with
/// every other container loaded from `transformed`.
pub fn remap<C, D>(pools: &PoolSet, transformed: &mut TransformedPoolSet, container: &C) -> Result<D>
where
    C: Poolable,
    D: Poolable,
{
    let source = pools.get::<C>().ok_or_else(|| {
        Error::PolicyError(format!(
            "no pool for container type {}",
            std::any::type_name::<C>()
        ))
    })?;
    let entry = source.entry_of(container).ok_or_else(|| {
        Error::PolicyError(format!(
            "container of type {} is not part of pool '{}'",
            std::any::type_name::<C>(),
            pools.name_of::<C>().unwrap_or_default()
        ))
    })?;

    transformed
        .loader_mut::<C, D>()
        .ok_or_else(missing::<C, D>)?
        .assemble(entry)
}

fn missing<C, D>() -> Error {
    Error::MissingTransform(format!(
        "{} -> {}",
        std::any::type_name::<C>(),
        std::any::type_name::<D>()
    ))
}
