//! Malformed Input Tests
//!
//! Every structural problem in an archive is reported as its own error and no
//! container is handed back.

use crate::common::*;
use serde_json::{json, Value};
use stratapool::{load, load_with, save, AutoPolicy, Carrier, Error, NodeKey, Reference};

fn archive() -> Value {
    serde_json::from_slice(&save(&document(), &AutoPolicy).unwrap()).unwrap()
}

fn load_doc(doc: &Value) -> Result<Document, Error> {
    load::<Document, _>(&serde_json::to_vec(doc).unwrap(), &AutoPolicy)
}

#[test]
fn baseline_archive_loads() {
    assert_eq!(load_doc(&archive()).unwrap(), document());
}

#[test]
fn oversized_leaf_is_invariant_violation() {
    let mut doc = archive();
    doc["pools"]["ints"]["leaves"][1]["value"] = json!([1, 2, 99]);
    let err = load_doc(&doc).unwrap_err();
    assert!(matches!(err, Error::InvariantViolation { ref pool, .. } if pool == "ints"));
    assert!(err.is_decode_error());
}

#[test]
fn dangling_child_key() {
    let mut doc = archive();
    doc["pools"]["ints"]["inners"][1]["value"]["children"] = json!([2, 77]);
    let err = load_doc(&doc).unwrap_err();
    match err {
        Error::DanglingReference { pool, reference } => {
            assert_eq!(pool, "ints");
            assert_eq!(reference, Reference::Node(NodeKey(77)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn instance_index_out_of_range() {
    let mut doc = archive();
    doc["value0"]["ints2"] = json!(5);
    let err = load_doc(&doc).unwrap_err();
    assert!(matches!(
        err,
        Error::DanglingReference {
            reference: Reference::Instance(5),
            ..
        }
    ));
}

#[test]
fn leaf_bits_mismatch() {
    let mut doc = archive();
    doc["pools"]["ints"]["BL"] = json!(5);
    assert!(matches!(
        load_doc(&doc),
        Err(Error::StructuralMismatch { .. })
    ));
}

#[test]
fn missing_branch_bits() {
    let mut doc = archive();
    doc["pools"]["ints"].as_object_mut().unwrap().remove("B");
    let err = load_doc(&doc).unwrap_err();
    assert!(err.to_string().contains("B=missing"));
}

#[test]
fn duplicate_leaf_key() {
    let mut doc = archive();
    doc["pools"]["ints"]["leaves"]
        .as_array_mut()
        .unwrap()
        .push(json!({"key": 2, "value": [1, 2]}));
    assert!(matches!(
        load_doc(&doc),
        Err(Error::DuplicateKey { key: NodeKey(2), .. })
    ));
}

#[test]
fn partial_middle_child_is_invariant_violation() {
    let mut doc = archive();
    // leaf 2 sits before leaf 5 in a regular node; shrinking it breaks indexing
    doc["pools"]["ints"]["leaves"][1]["value"] = json!([1]);
    assert!(matches!(
        load_doc(&doc),
        Err(Error::InvariantViolation { .. })
    ));
}

#[test]
fn same_document_loads_when_marked_relaxed() {
    let mut doc = archive();
    doc["pools"]["ints"]["leaves"][1]["value"] = json!([1]);
    doc["pools"]["ints"]["inners"][0]["value"]["relaxed"] = json!(true);
    doc["pools"]["ints"]["inners"][1]["value"]["relaxed"] = json!(true);
    let loaded = load_doc(&doc).unwrap();
    assert_eq!(loaded.ints.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(
        loaded.ints2.iter().copied().collect::<Vec<_>>(),
        vec![1, 3, 4, 5, 6]
    );
    assert_eq!(loaded.ints2.get(1), Some(&3));
}

#[test]
fn cycle_is_invariant_violation() {
    let mut doc = archive();
    doc["pools"]["ints"]["inners"][1]["value"] = json!({"children": [3], "relaxed": true});
    assert!(matches!(
        load_doc(&doc),
        Err(Error::InvariantViolation { ref reason, .. }) if reason.contains("cycle")
    ));
}

#[test]
fn wrong_element_type() {
    let mut doc = archive();
    doc["pools"]["ints"]["leaves"][0]["value"] = json!(["three"]);
    assert!(matches!(load_doc(&doc), Err(Error::Serialization(_))));
}

#[test]
fn missing_declared_pool() {
    let mut doc = archive();
    doc["pools"].as_object_mut().unwrap().remove("ints");
    assert!(matches!(load_doc(&doc), Err(Error::PolicyError(_))));
}

#[test]
fn missing_root_key() {
    let mut doc = archive();
    doc.as_object_mut().unwrap().remove("value0");
    assert!(matches!(load_doc(&doc), Err(Error::Serialization(_))));
}

#[test]
fn undeclared_pool_is_ignored() {
    let mut doc = archive();
    doc["pools"]["extra"] = json!({"anything": true});
    assert_eq!(load_doc(&doc).unwrap(), document());
}

#[test]
fn truncated_message_pack() {
    let bytes = stratapool::save_with(&document(), &AutoPolicy, Carrier::MessagePack).unwrap();
    let err = load_with::<Document, _>(&bytes[..bytes.len() / 2], &AutoPolicy, Carrier::MessagePack)
        .unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}
