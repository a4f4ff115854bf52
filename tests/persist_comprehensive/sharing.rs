//! Sharing Preservation Tests
//!
//! Loaded containers share nodes exactly as the saved ones did, and pools
//! hold every physically distinct node exactly once.

use crate::common::*;
use proptest::prelude::*;
use stratapool::{
    auto_pool, count_distinct_nodes, load, node_stats, save, AutoPolicy, Fields, NodeIdentity,
    Record, Vector,
};

type Small = Vector<u32, 2, 1>;

#[derive(Debug, Default, Clone, PartialEq)]
struct History {
    versions: [Small; 4],
}

impl Record for History {
    fn describe(fields: &mut Fields<Self>) {
        fields
            .container("v0", |h| &h.versions[0], |h| &mut h.versions[0])
            .container("v1", |h| &h.versions[1], |h| &mut h.versions[1])
            .container("v2", |h| &h.versions[2], |h| &mut h.versions[2])
            .container("v3", |h| &h.versions[3], |h| &mut h.versions[3]);
    }
}

fn history(base_len: u32, edits: &[(usize, u32)], pushes: u32) -> History {
    let v0: Small = (0..base_len).collect();
    let mut v1 = v0.clone();
    for &(index, value) in edits {
        if let Some(edited) = v1.set(index, value) {
            v1 = edited;
        }
    }
    let v2 = (0..pushes).fold(v1.clone(), |v, x| v.push_back(1000 + x));
    let v3 = (0..pushes).fold(v0.clone(), |v, x| v.push_back(2000 + x));
    History {
        versions: [v0, v1, v2, v3],
    }
}

fn refs(h: &History) -> Vec<&Small> {
    h.versions.iter().collect()
}

#[test]
fn loaded_pair_shares_leaf() {
    let bytes = save(&document(), &AutoPolicy).unwrap();
    let loaded: Document = load(&bytes, &AutoPolicy).unwrap();

    let first_leaf = |v: &VectorOne| v.root().children()[0].identity();
    assert_eq!(first_leaf(&loaded.ints), first_leaf(&loaded.ints2));
    assert_eq!(count_distinct_nodes(&[&loaded.ints, &loaded.ints2]), 6);
}

#[test]
fn tail_shared_with_tree_leaf_survives_load() {
    let value = doc2();
    let bytes = save(&value, &AutoPolicy).unwrap();
    let loaded: Doc2 = load(&bytes, &AutoPolicy).unwrap();

    let tail = NodeIdentity::of(loaded.strings.tail());
    let absorbed = loaded.extra.comments.root().children()[0].identity();
    assert_eq!(tail, absorbed);
}

#[test]
fn independent_equal_vectors_stay_separate() {
    let value = Document {
        ints: [1, 2, 3].into_iter().collect(),
        ints2: [1, 2, 3].into_iter().collect(),
    };
    let pools = auto_pool(&value).unwrap();
    let pool = pools.get::<VectorOne>().unwrap().pool();
    assert_eq!(pool.vectors.len(), 2);
    assert_eq!(pool.node_count(), 6);
}

#[test]
fn pool_size_tracks_distinct_nodes_not_length() {
    let h = history(5000, &[(17, 1), (4321, 2)], 3);
    let pools = auto_pool(&h).unwrap();
    let pool = pools.get::<Small>().unwrap().pool();

    let total_len: usize = h.versions.iter().map(|v| v.len()).sum();
    let stored: usize = pool.leaves.values().map(Vec::len).sum();
    assert_eq!(pool.node_count(), count_distinct_nodes(&refs(&h)));
    assert!(stored < total_len / 2);
}

#[test]
fn node_stats_split_matches_pool_maps() {
    let h = history(300, &[(5, 9)], 7);
    let pools = auto_pool(&h).unwrap();
    let pool = pools.get::<Small>().unwrap().pool();
    let stats = node_stats(&refs(&h));
    assert_eq!(stats.inner_nodes, pool.inners.len());
    assert_eq!(stats.leaf_nodes, pool.leaves.len());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn round_trip_preserves_values_and_sharing(
        base_len in 0u32..400,
        edits in proptest::collection::vec((0usize..400, any::<u32>()), 0..6),
        pushes in 0u32..40,
    ) {
        let h = history(base_len, &edits, pushes);
        let bytes = save(&h, &AutoPolicy).unwrap();
        let loaded: History = load(&bytes, &AutoPolicy).unwrap();

        prop_assert_eq!(&loaded, &h);
        prop_assert_eq!(
            count_distinct_nodes(&refs(&loaded)),
            count_distinct_nodes(&refs(&h))
        );
    }

    #[test]
    fn pool_holds_exactly_the_distinct_nodes(
        base_len in 0u32..400,
        edits in proptest::collection::vec((0usize..400, any::<u32>()), 0..6),
        pushes in 0u32..40,
    ) {
        let h = history(base_len, &edits, pushes);
        let pools = auto_pool(&h).unwrap();
        let pool = pools.get::<Small>().unwrap().pool();
        prop_assert_eq!(pool.node_count(), count_distinct_nodes(&refs(&h)));
    }
}
