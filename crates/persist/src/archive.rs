//! Archive save and load
//!
//! An archive is one object holding the encoded value under the policy's root
//! key and every pool under `pools`:
//!
//! ```text
//! { "value0": { "ints": 0, "ints2": 1 },
//!   "pools":  { "ints": { "B": 5, "BL": 1, "inners": [...], ... } } }
//! ```
//!
//! The document is produced as a `serde_json::Value` and handed to a carrier
//! for the final byte encoding.

use crate::policy::{AutoPolicy, Policy, POOLS_KEY};
use crate::pool_set::{LoaderSet, PoolSet};
use crate::record::{decode_record, encode_record, Record};
use serde_json::Value;
use strata_core::{Error, Result};
use tracing::{debug, warn};

/// Byte encoding of an archive document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Carrier {
    /// Compact JSON
    #[default]
    Json,
    /// Indented JSON
    JsonPretty,
    /// MessagePack
    MessagePack,
}

impl Carrier {
    /// Encode a document
    pub fn encode(&self, document: &Value) -> Result<Vec<u8>> {
        Ok(match self {
            Carrier::Json => serde_json::to_vec(document)?,
            Carrier::JsonPretty => serde_json::to_vec_pretty(document)?,
            Carrier::MessagePack => rmp_serde::to_vec(document)?,
        })
    }

    /// Decode a document
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        Ok(match self {
            Carrier::Json | Carrier::JsonPretty => serde_json::from_slice(bytes)?,
            Carrier::MessagePack => rmp_serde::from_slice(bytes)?,
        })
    }
}

/// Build the pools for `value` under `policy` and encode the value
///
/// Returns the filled pool set and the encoded value (containers replaced by
/// instance indices).
pub fn build_pools<R, P>(value: &R, policy: &P) -> Result<(PoolSet, Value)>
where
    R: Record,
    P: Policy<R>,
{
    let mut pools = PoolSet::new();
    for ty in policy.pool_types(value) {
        let name = policy.pool_name(&ty)?;
        pools.declare(ty, name)?;
    }
    let encoded = encode_record(value, &mut pools)?;
    Ok((pools, encoded))
}

/// Pools of `value` with automatically derived pool types and names
pub fn auto_pool<R: Record>(value: &R) -> Result<PoolSet> {
    build_pools(value, &AutoPolicy).map(|(pools, _)| pools)
}

/// Build the archive document for `value`
pub fn to_document<R, P>(value: &R, policy: &P) -> Result<Value>
where
    R: Record,
    P: Policy<R>,
{
    let (pools, encoded) = build_pools(value, policy)?;
    let mut archive = policy.wrap_value(encoded)?;
    if archive.contains_key(POOLS_KEY) {
        return Err(Error::PolicyError(format!(
            "wrapped value uses the reserved key '{}'",
            POOLS_KEY
        )));
    }
    archive.insert(POOLS_KEY.to_string(), Value::Object(pools.encode()?));
    Ok(Value::Object(archive))
}

/// Read a value back from an archive document
pub fn from_document<R, P>(document: Value, policy: &P) -> Result<R>
where
    R: Record,
    P: Policy<R>,
{
    let mut archive = match document {
        Value::Object(archive) => archive,
        _ => return Err(Error::Serialization("archive is not an object".to_string())),
    };
    let mut pools = match archive.remove(POOLS_KEY) {
        Some(Value::Object(pools)) => pools,
        Some(_) => {
            return Err(Error::Serialization(format!(
                "'{}' is not an object",
                POOLS_KEY
            )))
        }
        None => return Err(Error::Serialization(format!("missing '{}'", POOLS_KEY))),
    };

    let mut loaders = LoaderSet::new();
    for ty in policy.pool_types(&R::default()) {
        let name = policy.pool_name(&ty)?;
        let raw = pools.remove(&name).ok_or_else(|| {
            Error::PolicyError(format!(
                "pool '{}' for {} is not in the archive",
                name,
                ty.type_name()
            ))
        })?;
        let loader = ty.decode(&name, raw)?;
        loaders.insert(ty.id(), name, loader)?;
    }
    for unused in pools.keys() {
        warn!(target: "strata::persist", pool = %unused, "Ignoring undeclared pool in archive");
    }

    let encoded = policy.unwrap_value(archive)?;
    decode_record(&encoded, &mut loaders)
}

/// Save `value` as compact JSON
pub fn save<R, P>(value: &R, policy: &P) -> Result<Vec<u8>>
where
    R: Record,
    P: Policy<R>,
{
    save_with(value, policy, Carrier::Json)
}

/// Save `value` with an explicit carrier
pub fn save_with<R, P>(value: &R, policy: &P, carrier: Carrier) -> Result<Vec<u8>>
where
    R: Record,
    P: Policy<R>,
{
    let document = to_document(value, policy)?;
    let bytes = carrier.encode(&document)?;
    debug!(
        target: "strata::persist",
        carrier = ?carrier,
        bytes = bytes.len(),
        "Saved archive"
    );
    Ok(bytes)
}

/// Load a value saved as JSON
pub fn load<R, P>(bytes: &[u8], policy: &P) -> Result<R>
where
    R: Record,
    P: Policy<R>,
{
    load_with(bytes, policy, Carrier::Json)
}

/// Load a value with an explicit carrier
pub fn load_with<R, P>(bytes: &[u8], policy: &P, carrier: Carrier) -> Result<R>
where
    R: Record,
    P: Policy<R>,
{
    let document = carrier.decode(bytes)?;
    let value = from_document(document, policy)?;
    debug!(
        target: "strata::persist",
        carrier = ?carrier,
        bytes = bytes.len(),
        "Loaded archive"
    );
    Ok(value)
}
