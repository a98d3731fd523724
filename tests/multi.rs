//! Multi-key containers against a stable sorted-vector model: equal keys must
//! be kept, stay adjacent, and preserve insertion order.

use proptest::prelude::*;
use ranked_btree::{RankedMultiMap, RankedMultiSet};

fn key_strategy() -> impl Strategy<Value = i64> {
    // A tight key range makes duplicates the common case.
    -50i64..50
}

#[derive(Debug, Clone)]
enum MultiOp {
    Insert(i64),
    RemoveAll(i64),
    RemoveAt(usize),
    PopFirst,
    PopLast,
    Count(i64),
    Rank(i64),
    GetByRank(usize),
}

fn multi_op_strategy() -> impl Strategy<Value = MultiOp> {
    prop_oneof![
        6 => key_strategy().prop_map(MultiOp::Insert),
        2 => key_strategy().prop_map(MultiOp::RemoveAll),
        1 => (0usize..3_000).prop_map(MultiOp::RemoveAt),
        1 => Just(MultiOp::PopFirst),
        1 => Just(MultiOp::PopLast),
        2 => key_strategy().prop_map(MultiOp::Count),
        1 => key_strategy().prop_map(MultiOp::Rank),
        1 => (0usize..3_000).prop_map(MultiOp::GetByRank),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn multimap_matches_stable_model(ops in proptest::collection::vec(multi_op_strategy(), 2_000)) {
        let mut ranked: RankedMultiMap<i64, u32> = RankedMultiMap::new();
        let mut model: Vec<(i64, u32)> = Vec::new();
        let mut stamp = 0u32;

        for op in ops {
            match op {
                MultiOp::Insert(k) => {
                    stamp += 1;
                    ranked.insert(k, stamp);
                    let at = model.partition_point(|(key, _)| *key <= k);
                    model.insert(at, (k, stamp));
                }
                MultiOp::RemoveAll(k) => {
                    let expected = model.iter().filter(|(key, _)| *key == k).count();
                    model.retain(|(key, _)| *key != k);
                    prop_assert_eq!(ranked.remove_all(&k), expected);
                }
                MultiOp::RemoveAt(rank) => {
                    if rank < model.len() {
                        let expected = model.remove(rank);
                        prop_assert_eq!(ranked.remove_at(rank), Some(expected));
                    } else {
                        prop_assert_eq!(ranked.remove_at(rank), None);
                    }
                }
                MultiOp::PopFirst => {
                    let expected = if model.is_empty() { None } else { Some(model.remove(0)) };
                    prop_assert_eq!(ranked.pop_first(), expected);
                }
                MultiOp::PopLast => {
                    prop_assert_eq!(ranked.pop_last(), model.pop());
                }
                MultiOp::Count(k) => {
                    let expected = model.iter().filter(|(key, _)| *key == k).count();
                    prop_assert_eq!(ranked.count(&k), expected);
                }
                MultiOp::Rank(k) => {
                    let expected = model.iter().filter(|(key, _)| *key < k).count();
                    prop_assert_eq!(ranked.rank(&k), expected);
                }
                MultiOp::GetByRank(rank) => {
                    let expected = model.get(rank).map(|(k, v)| (k, v));
                    prop_assert_eq!(ranked.get_by_rank(rank), expected);
                }
            }

            prop_assert_eq!(ranked.len(), model.len());
        }

        prop_assert!(ranked.iter().eq(model.iter().map(|(k, v)| (k, v))));
    }

    /// `get_all` yields exactly the entries for one key, in insertion order.
    #[test]
    fn get_all_returns_equal_range(inserts in proptest::collection::vec(key_strategy(), 0..300)) {
        let mut ranked: RankedMultiMap<i64, u32> = RankedMultiMap::new();
        let mut model: Vec<(i64, u32)> = Vec::new();

        for (stamp, key) in (0u32..).zip(inserts) {
            ranked.insert(key, stamp);
            let at = model.partition_point(|(k, _)| *k <= key);
            model.insert(at, (key, stamp));
        }

        for probe in -55i64..55 {
            let expected: Vec<u32> =
                model.iter().filter(|(k, _)| *k == probe).map(|(_, v)| *v).collect();
            let found: Vec<u32> = ranked.get_all(&probe).map(|(_, &v)| v).collect();
            prop_assert_eq!(found, expected);
        }
    }
}

#[test]
fn multiset_keeps_and_counts_duplicates() {
    let mut set = RankedMultiSet::new();
    for value in [3, 1, 2, 3, 3, 2] {
        set.insert(value);
    }

    let sorted: Vec<i32> = set.iter().copied().collect();
    assert_eq!(sorted, [1, 2, 2, 3, 3, 3]);
    assert_eq!(set.count(&3), 3);
    assert_eq!(set.count(&2), 2);
    assert_eq!(set.count(&9), 0);

    assert_eq!(set.remove_all(&3), 3);
    let rest: Vec<i32> = set.iter().copied().collect();
    assert_eq!(rest, [1, 2, 2]);
}

#[test]
fn multiset_rank_and_slice() {
    let set: RankedMultiSet<i32> = [10, 20, 20, 30, 30, 30].into_iter().collect();

    assert_eq!(set.rank(&20), 1);
    assert_eq!(set.rank(&25), 3);
    assert_eq!(set.rank_of(&30), Some(3));
    assert_eq!(set.get_by_rank(2), Some(&20));

    let middle: Vec<i32> = set.slice(1, -1).copied().collect();
    assert_eq!(middle, [20, 20, 30, 30]);

    assert_eq!(set.count_range(&15, &25), 2);
    assert_eq!(set.count_range(&25, &15), 0);
}

#[test]
fn multiset_remove_one_takes_a_single_duplicate() {
    let mut set: RankedMultiSet<i32> = [5, 5, 5].into_iter().collect();
    assert!(set.remove_one(&5));
    assert_eq!(set.len(), 2);
    assert!(!set.remove_one(&7));
    assert_eq!(set.remove_all(&5), 2);
    assert!(set.is_empty());
}

#[test]
fn multimap_insert_hint_orders_equal_keys() {
    let mut map: RankedMultiMap<i32, &str> = RankedMultiMap::new();
    map.insert(1, "a");
    map.insert(1, "c");
    map.insert(2, "d");

    // Rank 1 points at the "c" entry; the hinted insert lands just before it.
    map.insert_hint(1, 1, "b");

    let values: Vec<&str> = map.values().copied().collect();
    assert_eq!(values, ["a", "b", "c", "d"]);
}

#[test]
fn multimap_ranges_and_bounds() {
    let map: RankedMultiMap<i32, u32> =
        [(1, 1), (2, 2), (2, 3), (3, 4)].into_iter().collect();

    let in_range: Vec<u32> = map.range(2..=2).map(|(_, &v)| v).collect();
    assert_eq!(in_range, [2, 3]);

    assert_eq!(map.lower_bound(&2).rank(), 1);
    assert_eq!(map.upper_bound(&2).rank(), 3);

    let mut cur = map.cursor_at(0);
    cur.advance(2);
    assert_eq!(cur.key(), Some(&2));
    assert_eq!(cur.rank(), 2);
}
