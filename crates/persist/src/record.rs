//! Record registration
//!
//! A record is a user type whose fields are listed once in `describe`. The
//! field list drives everything the archive does with the record:
//! - which container types need a pool (and their default pool names)
//! - how the record is written: containers become instance indices, plain
//!   values go through serde, nested records become nested objects
//! - how it is read back into a `Default` value
//!
//! ```ignore
//! impl Record for Document {
//!     fn describe(fields: &mut Fields<Self>) {
//!         fields
//!             .container("ints", |d| &d.ints, |d| &mut d.ints)
//!             .value("title", |d| &d.title, |d| &mut d.title);
//!     }
//! }
//! ```

use crate::container::Poolable;
use crate::pool_set::{LoaderSet, PoolSet, PoolType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::marker::PhantomData;
use strata_core::{Error, Result};

/// A user type that can be saved with pooled containers
pub trait Record: Default + 'static {
    /// List the fields of the record, in the order they are written
    fn describe(fields: &mut Fields<Self>);
}

type Get<R, F> = fn(&R) -> &F;
type GetMut<R, F> = fn(&mut R) -> &mut F;

trait FieldCodec<R> {
    fn name(&self) -> &'static str;
    fn pool_types(&self, out: &mut Vec<(PoolType, &'static str)>);
    fn save(&self, record: &R, pools: &mut PoolSet) -> Result<Value>;
    fn load(&self, record: &mut R, value: &Value, loaders: &mut LoaderSet) -> Result<()>;
}

/// Ordered field list of a record
pub struct Fields<R> {
    fields: Vec<Box<dyn FieldCodec<R>>>,
}

impl<R: Record> Fields<R> {
    /// Field list of `R`
    pub fn of() -> Self {
        let mut fields = Fields { fields: Vec::new() };
        R::describe(&mut fields);
        fields
    }
}

impl<R: 'static> Fields<R> {
    /// A pooled container field; written as its instance index
    pub fn container<C: Poolable>(&mut self, name: &'static str, get: Get<R, C>, get_mut: GetMut<R, C>) -> &mut Self {
        self.fields.push(Box::new(ContainerField { name, get, get_mut }));
        self
    }

    /// A plain field written through serde
    pub fn value<V>(&mut self, name: &'static str, get: Get<R, V>, get_mut: GetMut<R, V>) -> &mut Self
    where
        V: Serialize + DeserializeOwned + 'static,
    {
        self.fields.push(Box::new(ValueField { name, get, get_mut }));
        self
    }

    /// A nested record; its containers share the pools of the enclosing value
    pub fn record<S: Record>(&mut self, name: &'static str, get: Get<R, S>, get_mut: GetMut<R, S>) -> &mut Self {
        self.fields.push(Box::new(RecordField {
            name,
            get,
            get_mut,
            _record: PhantomData,
        }));
        self
    }

    /// Field names in order
    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name()).collect()
    }

    /// Container types reachable from this record, each with the name of the
    /// first field that holds it, in traversal order
    pub fn pool_types(&self) -> Vec<(PoolType, &'static str)> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect(&self, out: &mut Vec<(PoolType, &'static str)>) {
        for field in &self.fields {
            field.pool_types(out);
        }
    }
}

/// Write a record as an object, adding its containers to `pools`
pub fn encode_record<R: Record>(record: &R, pools: &mut PoolSet) -> Result<Value> {
    let mut object = Map::new();
    for field in Fields::<R>::of().fields {
        let value = field.save(record, pools)?;
        object.insert(field.name().to_string(), value);
    }
    Ok(Value::Object(object))
}

/// Read a record from an object, loading its containers from `loaders`
pub fn decode_record<R: Record>(value: &Value, loaders: &mut LoaderSet) -> Result<R> {
    let object = value.as_object().ok_or_else(|| {
        Error::Serialization(format!(
            "expected an object for {}, found {}",
            std::any::type_name::<R>(),
            kind(value)
        ))
    })?;

    let mut record = R::default();
    for field in Fields::<R>::of().fields {
        let raw = object
            .get(field.name())
            .ok_or_else(|| Error::Serialization(format!("missing field '{}'", field.name())))?;
        field.load(&mut record, raw, loaders)?;
    }
    Ok(record)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn push_unique(out: &mut Vec<(PoolType, &'static str)>, ty: PoolType, name: &'static str) {
    if !out.iter().any(|(seen, _)| *seen == ty) {
        out.push((ty, name));
    }
}

// ============================================================================
// Field codecs
// ============================================================================

struct ContainerField<R, C> {
    name: &'static str,
    get: Get<R, C>,
    get_mut: GetMut<R, C>,
}

impl<R: 'static, C: Poolable> FieldCodec<R> for ContainerField<R, C> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn pool_types(&self, out: &mut Vec<(PoolType, &'static str)>) {
        push_unique(out, PoolType::of::<C>(), self.name);
    }

    fn save(&self, record: &R, pools: &mut PoolSet) -> Result<Value> {
        Ok(Value::from(pools.add((self.get)(record))?))
    }

    fn load(&self, record: &mut R, value: &Value, loaders: &mut LoaderSet) -> Result<()> {
        let index = value
            .as_u64()
            .and_then(|index| usize::try_from(index).ok())
            .ok_or_else(|| {
                Error::Serialization(format!(
                    "field '{}' must be a container instance index, found {}",
                    self.name,
                    kind(value)
                ))
            })?;
        *(self.get_mut)(record) = loaders.load::<C>(index)?;
        Ok(())
    }
}

struct ValueField<R, V> {
    name: &'static str,
    get: Get<R, V>,
    get_mut: GetMut<R, V>,
}

impl<R: 'static, V> FieldCodec<R> for ValueField<R, V>
where
    V: Serialize + DeserializeOwned + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn pool_types(&self, _out: &mut Vec<(PoolType, &'static str)>) {}

    fn save(&self, record: &R, _pools: &mut PoolSet) -> Result<Value> {
        Ok(serde_json::to_value((self.get)(record))?)
    }

    fn load(&self, record: &mut R, value: &Value, _loaders: &mut LoaderSet) -> Result<()> {
        *(self.get_mut)(record) = V::deserialize(value)?;
        Ok(())
    }
}

struct RecordField<R, S> {
    name: &'static str,
    get: Get<R, S>,
    get_mut: GetMut<R, S>,
    _record: PhantomData<fn() -> S>,
}

impl<R: 'static, S: Record> FieldCodec<R> for RecordField<R, S> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn pool_types(&self, out: &mut Vec<(PoolType, &'static str)>) {
        for (ty, name) in Fields::<S>::of().pool_types() {
            push_unique(out, ty, name);
        }
    }

    fn save(&self, record: &R, pools: &mut PoolSet) -> Result<Value> {
        encode_record((self.get)(record), pools)
    }

    fn load(&self, record: &mut R, value: &Value, loaders: &mut LoaderSet) -> Result<()> {
        *(self.get_mut)(record) = decode_record(value, loaders)?;
        Ok(())
    }
}
