//! Transform Tests
//!
//! Pool-wide element conversion, remapping of original containers, and
//! saving the transformed value.

use crate::common::*;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use stratapool::{
    auto_pool, count_distinct_nodes, remap, save, transform, AutoPolicy, ConversionTable, Error,
    Vector,
};

#[test]
fn transform_times_ten_then_save() {
    let value = document();
    let pools = auto_pool(&value).unwrap();
    let table = ConversionTable::new().convert::<VectorOne, _>(|x| x * 10);
    let mut transformed = transform(&pools, &table).unwrap();

    let new_v1: VectorOne = remap(&pools, &mut transformed, &value.ints).unwrap();
    let new_v2: VectorOne = remap(&pools, &mut transformed, &value.ints2).unwrap();
    assert_eq!(new_v1, [10, 20, 30].into_iter().collect::<VectorOne>());
    assert_eq!(
        new_v2,
        [10, 20, 30, 40, 50, 60].into_iter().collect::<VectorOne>()
    );

    let new_value = Document {
        ints: new_v1,
        ints2: new_v2,
    };
    let bytes = save(&new_value, &AutoPolicy).unwrap();
    let expected = json!({
        "pools": {
            "ints": {
                "B": 5,
                "BL": 1,
                "inners": [
                    {"key": 0, "value": {"children": [2], "relaxed": false}},
                    {"key": 3, "value": {"children": [2, 5], "relaxed": false}}
                ],
                "leaves": [
                    {"key": 1, "value": [30]},
                    {"key": 2, "value": [10, 20]},
                    {"key": 4, "value": [50, 60]},
                    {"key": 5, "value": [30, 40]}
                ],
                "vectors": [{"root": 0, "tail": 1}, {"root": 3, "tail": 4}]
            }
        },
        "value0": {"ints": 0, "ints2": 1}
    });
    assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), expected);
}

#[test]
fn shared_leaf_converted_once() {
    let value = document();
    let pools = auto_pool(&value).unwrap();

    let seen = RefCell::new(HashMap::<i32, usize>::new());
    {
        let table = ConversionTable::new().convert::<VectorOne, _>(|x| {
            *seen.borrow_mut().entry(*x).or_default() += 1;
            -x
        });
        transform(&pools, &table).unwrap();
    }

    let seen = seen.into_inner();
    // [1, 2] is shared by both vectors; 3 is stored twice (v1's tail and the
    // separate leaf [3, 4])
    assert_eq!(seen[&1], 1);
    assert_eq!(seen[&2], 1);
    assert_eq!(seen[&3], 2);
    assert_eq!(seen.values().sum::<usize>(), 7);
}

#[test]
fn transform_to_strings_across_pools() {
    let value = doc2();
    let pools = auto_pool(&value).unwrap();
    let table = ConversionTable::new()
        .convert::<VectorOne, _>(|x| x + 1)
        .convert::<VectorStr, _>(|s| s.to_uppercase());
    let mut transformed = transform(&pools, &table).unwrap();
    assert_eq!(transformed.len(), 2);

    let comments: VectorStr = remap(&pools, &mut transformed, &value.extra.comments).unwrap();
    let strings: VectorStr = remap(&pools, &mut transformed, &value.strings).unwrap();
    assert_eq!(comments, strings_of(&["ONE", "TWO", "THREE", "FOUR", "FIVE"]));
    assert_eq!(strings, strings_of(&["ONE", "TWO"]));
    assert_eq!(
        count_distinct_nodes(&[&comments, &strings]),
        count_distinct_nodes(&[&value.extra.comments, &value.strings])
    );
}

#[test]
fn missing_conversion_for_one_pool() {
    let pools = auto_pool(&doc2()).unwrap();
    let table = ConversionTable::new().convert::<VectorOne, _>(|x| *x);
    let err = transform(&pools, &table).unwrap_err();
    assert!(matches!(err, Error::MissingTransform(ref name) if name.contains("String")));
}

#[test]
fn remap_of_intermediate_version() {
    // v1.push_back(4) shares v1's root; only its tail is new, so it cannot be
    // remapped unless that tail was recorded
    let value = document();
    let pools = auto_pool(&value).unwrap();
    let table = ConversionTable::new().convert::<VectorOne, _>(|x| *x);
    let mut transformed = transform(&pools, &table).unwrap();

    let intermediate = value.ints.push_back(4);
    let err = remap::<VectorOne, VectorOne>(&pools, &mut transformed, &intermediate).unwrap_err();
    assert!(matches!(err, Error::PolicyError(_)));
}

fn strings_of(items: &[&str]) -> VectorStr {
    strings(items)
}

type Wide = Vector<i64, 3, 2>;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn remap_equals_elementwise_map(
        base in proptest::collection::vec(-1000i64..1000, 0..300),
        extra in proptest::collection::vec(-1000i64..1000, 0..20),
        factor in -5i64..5,
    ) {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Pair {
            a: Wide,
            b: Wide,
        }

        impl stratapool::Record for Pair {
            fn describe(fields: &mut stratapool::Fields<Self>) {
                fields
                    .container("a", |p| &p.a, |p| &mut p.a)
                    .container("b", |p| &p.b, |p| &mut p.b);
            }
        }

        let a: Wide = base.iter().copied().collect();
        let b = extra.iter().fold(a.clone(), |v, x| v.push_back(*x));
        let value = Pair { a, b };

        let pools = auto_pool(&value).unwrap();
        let table = ConversionTable::new().convert::<Wide, _>(move |x| x * factor);
        let mut transformed = transform(&pools, &table).unwrap();

        for original in [&value.a, &value.b] {
            let mapped: Wide = remap(&pools, &mut transformed, original).unwrap();
            let expected: Wide = original.iter().map(|x| x * factor).collect();
            prop_assert_eq!(mapped, expected);
        }
    }
}
