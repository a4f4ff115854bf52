//! Pool wire codec
//!
//! A pool is written as a self-describing document:
//!
//! ```text
//! { "B": 5, "BL": 1,
//!   "inners":  [ { "key": 0, "value": { "children": [2], "relaxed": false } } ],
//!   "leaves":  [ { "key": 1, "value": [3] } ],
//!   "vectors": [ { "root": 0, "tail": 1 } ] }
//! ```
//!
//! Decoding validates everything it can see without materializing nodes:
//! shape, duplicate keys, fanout limits and dangling references. Height,
//! fullness and acyclicity are checked by the loader.

use crate::pool::{InnerEntry, Pool, VectorEntry};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use strata_core::{Error, NodeKey, Result, TreeShape};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct Keyed<V> {
    key: NodeKey,
    value: V,
}

#[derive(Serialize)]
struct PoolWireRef<'a, T> {
    #[serde(rename = "B")]
    bits: u32,
    #[serde(rename = "BL")]
    leaf_bits: u32,
    inners: Vec<Keyed<&'a InnerEntry>>,
    leaves: Vec<Keyed<&'a [T]>>,
    vectors: &'a [VectorEntry],
}

/// Pool as read off the wire, before validation
#[derive(Debug, Deserialize)]
pub struct PoolWire<T> {
    #[serde(rename = "B", default)]
    bits: Option<u32>,
    #[serde(rename = "BL", default)]
    leaf_bits: Option<u32>,
    inners: Vec<Keyed<InnerEntry>>,
    leaves: Vec<Keyed<Vec<T>>>,
    vectors: Vec<VectorEntry>,
}

/// Encode a pool into its wire document
pub fn encode_pool<T: Serialize>(pool: &Pool<T>) -> Result<Value> {
    let wire = PoolWireRef {
        bits: pool.shape.bits,
        leaf_bits: pool.shape.leaf_bits,
        inners: pool
            .inners
            .iter()
            .map(|(key, value)| Keyed { key: *key, value })
            .collect(),
        leaves: pool
            .leaves
            .iter()
            .map(|(key, value)| Keyed {
                key: *key,
                value: value.as_slice(),
            })
            .collect(),
        vectors: &pool.vectors,
    };
    Ok(serde_json::to_value(&wire)?)
}

/// Decode and validate a pool document
///
/// `name` is used in error messages, `expected` is the shape of the running
/// container type.
pub fn decode_pool<T: DeserializeOwned>(name: &str, value: Value, expected: TreeShape) -> Result<Pool<T>> {
    let wire: PoolWire<T> = serde_json::from_value(value)?;
    wire.into_pool(name, expected)
}

impl<T> PoolWire<T> {
    /// Validate against `expected` and build the pool
    pub fn into_pool(self, name: &str, expected: TreeShape) -> Result<Pool<T>> {
        let shape = match (self.bits, self.leaf_bits) {
            (Some(bits), Some(leaf_bits)) if TreeShape::new(bits, leaf_bits) == expected => expected,
            (bits, leaf_bits) => {
                return Err(Error::StructuralMismatch {
                    pool: name.to_string(),
                    expected,
                    found: format!("B={}, BL={}", describe(bits), describe(leaf_bits)),
                })
            }
        };

        let mut inners = BTreeMap::new();
        for Keyed { key, value } in self.inners {
            match inners.entry(key) {
                Entry::Occupied(_) => return Err(duplicate(name, key)),
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }

        let mut leaves = BTreeMap::new();
        for Keyed { key, value } in self.leaves {
            if inners.contains_key(&key) {
                return Err(duplicate(name, key));
            }
            match leaves.entry(key) {
                Entry::Occupied(_) => return Err(duplicate(name, key)),
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }

        let pool = Pool {
            shape,
            inners,
            leaves,
            vectors: self.vectors,
        };
        pool.check_structure(name)?;

        debug!(
            target: "strata::persist",
            pool = name,
            inners = pool.inners.len(),
            leaves = pool.leaves.len(),
            vectors = pool.vectors.len(),
            "Decoded pool"
        );
        Ok(pool)
    }
}

fn describe(field: Option<u32>) -> String {
    match field {
        Some(value) => value.to_string(),
        None => "missing".to_string(),
    }
}

fn duplicate(name: &str, key: NodeKey) -> Error {
    Error::DuplicateKey {
        pool: name.to_string(),
        key,
    }
}
