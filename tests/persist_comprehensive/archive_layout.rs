//! Archive Layout Tests
//!
//! Exact documents produced by `save` under the provided policies.

use crate::common::*;
use serde_json::{json, Map, Value};
use stratapool::{
    load, load_with, save, save_with, AutoPolicy, Carrier, Error, NamedPolicy, Policy, PoolType,
    Result,
};

fn parse(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

fn doc2_policy() -> NamedPolicy {
    NamedPolicy::new("doc2_value")
        .pool::<VectorOne>("vector_of_ints")
        .pool::<VectorStr>("vector_of_strings")
}

// ============================================================================
// Default policy
// ============================================================================

#[test]
fn plain_serde_writes_every_element() {
    let value = document();
    assert_eq!(
        serde_json::to_value(&value.ints2).unwrap(),
        json!([1, 2, 3, 4, 5, 6])
    );
}

#[test]
fn auto_policy_document_is_exact() {
    init_tracing();
    let bytes = save(&document(), &AutoPolicy).unwrap();
    let expected = json!({
        "value0": {"ints": 0, "ints2": 1},
        "pools": {
            "ints": {
                "B": 5,
                "BL": 1,
                "inners": [
                    {"key": 0, "value": {"children": [2], "relaxed": false}},
                    {"key": 3, "value": {"children": [2, 5], "relaxed": false}}
                ],
                "leaves": [
                    {"key": 1, "value": [3]},
                    {"key": 2, "value": [1, 2]},
                    {"key": 4, "value": [5, 6]},
                    {"key": 5, "value": [3, 4]}
                ],
                "vectors": [{"root": 0, "tail": 1}, {"root": 3, "tail": 4}]
            }
        }
    });
    assert_eq!(parse(&bytes), expected);
}

#[test]
fn auto_policy_round_trip() {
    let value = document();
    let bytes = save(&value, &AutoPolicy).unwrap();
    let loaded: Document = load(&bytes, &AutoPolicy).unwrap();
    assert_eq!(loaded, value);
    assert_eq!(
        loaded.ints2.iter().copied().collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5, 6]
    );
}

#[test]
fn pool_has_two_vectors_and_six_nodes() {
    let bytes = save(&document(), &AutoPolicy).unwrap();
    let doc = parse(&bytes);
    let pool = &doc["pools"]["ints"];
    assert_eq!(pool["vectors"].as_array().unwrap().len(), 2);
    let nodes = pool["inners"].as_array().unwrap().len() + pool["leaves"].as_array().unwrap().len();
    assert_eq!(nodes, 6);
}

// ============================================================================
// Named policy
// ============================================================================

#[test]
fn named_policy_with_nested_record_is_exact() {
    let bytes = save(&doc2(), &doc2_policy()).unwrap();
    let expected = json!({
        "doc2_value": {"ints": 0, "ints2": 1, "strings": 0, "extra": {"comments": 1}},
        "pools": {
            "vector_of_ints": {
                "B": 5,
                "BL": 1,
                "leaves": [
                    {"key": 1, "value": [3]},
                    {"key": 2, "value": [1, 2]},
                    {"key": 4, "value": [5, 6]},
                    {"key": 5, "value": [3, 4]}
                ],
                "inners": [
                    {"key": 0, "value": {"children": [2], "relaxed": false}},
                    {"key": 3, "value": {"children": [2, 5], "relaxed": false}}
                ],
                "vectors": [{"root": 0, "tail": 1}, {"root": 3, "tail": 4}]
            },
            "vector_of_strings": {
                "B": 5,
                "BL": 1,
                "leaves": [
                    {"key": 1, "value": ["one", "two"]},
                    {"key": 3, "value": ["five"]},
                    {"key": 4, "value": ["three", "four"]}
                ],
                "inners": [
                    {"key": 0, "value": {"children": [], "relaxed": false}},
                    {"key": 2, "value": {"children": [1, 4], "relaxed": false}}
                ],
                "vectors": [{"root": 0, "tail": 1}, {"root": 2, "tail": 3}]
            }
        }
    });
    assert_eq!(parse(&bytes), expected);

    let loaded: Doc2 = load(&bytes, &doc2_policy()).unwrap();
    assert_eq!(loaded, doc2());
}

#[test]
fn auto_policy_handles_nested_record() {
    let value = doc2();
    let bytes = save(&value, &AutoPolicy).unwrap();
    let doc = parse(&bytes);
    let names: Vec<_> = doc["pools"].as_object().unwrap().keys().cloned().collect();
    assert!(names.contains(&"ints".to_string()));
    assert!(names.contains(&"strings".to_string()));
    assert_eq!(doc["value0"]["extra"], json!({"comments": 1}));

    let loaded: Doc2 = load(&bytes, &AutoPolicy).unwrap();
    assert_eq!(loaded, value);
}

#[test]
fn declared_type_without_instances_gets_empty_pool() {
    let policy = NamedPolicy::new("doc")
        .pool::<VectorOne>("ints")
        .pool::<VectorStr>("unused");
    let bytes = save(&document(), &policy).unwrap();
    let doc = parse(&bytes);
    assert_eq!(
        doc["pools"]["unused"],
        json!({"B": 5, "BL": 1, "inners": [], "leaves": [], "vectors": []})
    );

    let loaded: Document = load(&bytes, &policy).unwrap();
    assert_eq!(loaded, document());
}

#[test]
fn empty_vectors_round_trip() {
    let value = Document::default();
    let bytes = save(&value, &AutoPolicy).unwrap();
    let doc = parse(&bytes);
    assert_eq!(doc["value0"], json!({"ints": 0, "ints2": 1}));
    assert_eq!(
        doc["pools"]["ints"]["inners"],
        json!([
            {"key": 0, "value": {"children": [], "relaxed": false}},
            {"key": 2, "value": {"children": [], "relaxed": false}}
        ])
    );
    assert_eq!(
        doc["pools"]["ints"]["leaves"],
        json!([{"key": 1, "value": []}, {"key": 3, "value": []}])
    );

    let loaded: Document = load(&bytes, &AutoPolicy).unwrap();
    assert!(loaded.ints.is_empty());
    assert!(loaded.ints2.is_empty());
}

#[test]
fn clones_share_one_instance() {
    let ints: VectorOne = [7, 8, 9].into_iter().collect();
    let value = Document {
        ints2: ints.clone(),
        ints,
    };
    let bytes = save(&value, &AutoPolicy).unwrap();
    let doc = parse(&bytes);
    assert_eq!(doc["value0"], json!({"ints": 0, "ints2": 0}));
    assert_eq!(doc["pools"]["ints"]["vectors"].as_array().unwrap().len(), 1);
}

// ============================================================================
// Custom policy
// ============================================================================

/// Auto pools, value stored as `{"doc": {"version": 1, "body": ...}}`
struct VersionedPolicy;

impl Policy<Document> for VersionedPolicy {
    fn pool_types(&self, value: &Document) -> Vec<PoolType> {
        Policy::<Document>::pool_types(&AutoPolicy, value)
    }

    fn pool_name(&self, ty: &PoolType) -> Result<String> {
        Policy::<Document>::pool_name(&AutoPolicy, ty)
    }

    fn root_key(&self) -> &str {
        "doc"
    }

    fn wrap_value(&self, encoded: Value) -> Result<Map<String, Value>> {
        let mut archive = Map::new();
        archive.insert("doc".to_string(), json!({"version": 1, "body": encoded}));
        Ok(archive)
    }

    fn unwrap_value(&self, mut archive: Map<String, Value>) -> Result<Value> {
        let mut doc = archive
            .remove("doc")
            .ok_or_else(|| Error::Serialization("missing 'doc'".to_string()))?;
        if doc["version"] != json!(1) {
            return Err(Error::PolicyError(format!(
                "unsupported version {}",
                doc["version"]
            )));
        }
        doc.as_object_mut()
            .and_then(|doc| doc.remove("body"))
            .ok_or_else(|| Error::Serialization("missing 'body'".to_string()))
    }
}

#[test]
fn custom_policy_wraps_root_value() {
    let value = document();
    let bytes = save(&value, &VersionedPolicy).unwrap();
    let doc = parse(&bytes);

    assert_eq!(
        doc["doc"],
        json!({"version": 1, "body": {"ints": 0, "ints2": 1}})
    );
    let auto = parse(&save(&value, &AutoPolicy).unwrap());
    assert_eq!(doc["pools"], auto["pools"]);
    assert_eq!(doc.as_object().unwrap().len(), 2);

    let loaded: Document = load(&bytes, &VersionedPolicy).unwrap();
    assert_eq!(loaded, value);
}

#[test]
fn custom_policy_rejects_unknown_version() {
    let mut doc = parse(&save(&document(), &VersionedPolicy).unwrap());
    doc["doc"]["version"] = json!(2);
    let bytes = serde_json::to_vec(&doc).unwrap();
    assert!(matches!(
        load::<Document, _>(&bytes, &VersionedPolicy),
        Err(Error::PolicyError(_))
    ));
}

// ============================================================================
// Carriers
// ============================================================================

#[test]
fn every_carrier_round_trips() {
    let value = doc2();
    for carrier in [Carrier::Json, Carrier::JsonPretty, Carrier::MessagePack] {
        let bytes = save_with(&value, &doc2_policy(), carrier).unwrap();
        let loaded: Doc2 = load_with(&bytes, &doc2_policy(), carrier).unwrap();
        assert_eq!(loaded, value, "carrier {:?}", carrier);
    }
}

#[test]
fn message_pack_is_smaller_than_json() {
    let base: VectorOne = (0..500).collect();
    let value = Document {
        ints2: base.push_back(500),
        ints: base,
    };
    let json = save_with(&value, &AutoPolicy, Carrier::Json).unwrap();
    let packed = save_with(&value, &AutoPolicy, Carrier::MessagePack).unwrap();
    assert!(packed.len() < json.len());
}

#[test]
fn pretty_json_parses_to_same_document() {
    let compact = save_with(&document(), &AutoPolicy, Carrier::Json).unwrap();
    let pretty = save_with(&document(), &AutoPolicy, Carrier::JsonPretty).unwrap();
    assert!(pretty.len() > compact.len());
    assert_eq!(parse(&compact), parse(&pretty));
}
