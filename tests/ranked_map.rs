use std::collections::BTreeMap;

use proptest::prelude::*;
use ranked_btree::{Rank, RankedMap};

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 2_000;

/// Keys are drawn from a range smaller than `TEST_SIZE` so collisions,
/// replacements, and removals of present keys all happen regularly.
fn key_strategy() -> impl Strategy<Value = i64> {
    -3_000i64..3_000
}

fn value_strategy() -> impl Strategy<Value = i64> {
    any::<i64>()
}

#[derive(Debug, Clone)]
enum MapOp {
    Insert(i64, i64),
    InsertHint(usize, i64, i64),
    Remove(i64),
    RemoveAt(usize),
    Get(i64),
    GetKeyValue(i64),
    ContainsKey(i64),
    FirstKeyValue,
    LastKeyValue,
    PopFirst,
    PopLast,
    Rank(i64),
    RankOf(i64),
    GetByRank(usize),
    CountRange(i64, i64),
}

fn map_op_strategy() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        5 => (key_strategy(), value_strategy()).prop_map(|(k, v)| MapOp::Insert(k, v)),
        2 => (0usize..4_000, key_strategy(), value_strategy())
            .prop_map(|(h, k, v)| MapOp::InsertHint(h, k, v)),
        3 => key_strategy().prop_map(MapOp::Remove),
        1 => (0usize..4_000).prop_map(MapOp::RemoveAt),
        2 => key_strategy().prop_map(MapOp::Get),
        1 => key_strategy().prop_map(MapOp::GetKeyValue),
        1 => key_strategy().prop_map(MapOp::ContainsKey),
        1 => Just(MapOp::FirstKeyValue),
        1 => Just(MapOp::LastKeyValue),
        1 => Just(MapOp::PopFirst),
        1 => Just(MapOp::PopLast),
        1 => key_strategy().prop_map(MapOp::Rank),
        1 => key_strategy().prop_map(MapOp::RankOf),
        1 => (0usize..4_000).prop_map(MapOp::GetByRank),
        1 => (key_strategy(), key_strategy()).prop_map(|(a, b)| MapOp::CountRange(a, b)),
    ]
}

// ─── Model-based operation replay ────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Replays a random sequence of operations on both RankedMap and BTreeMap
    /// and asserts identical results at every step.
    #[test]
    fn map_ops_match_btreemap(ops in proptest::collection::vec(map_op_strategy(), TEST_SIZE)) {
        let mut ranked: RankedMap<i64, i64> = RankedMap::new();
        let mut model: BTreeMap<i64, i64> = BTreeMap::new();

        for op in ops {
            match op {
                MapOp::Insert(k, v) => {
                    prop_assert_eq!(ranked.insert(k, v), model.insert(k, v));
                }
                MapOp::InsertHint(h, k, v) => {
                    prop_assert_eq!(ranked.insert_hint(h, k, v), model.insert(k, v));
                }
                MapOp::Remove(k) => {
                    prop_assert_eq!(ranked.remove(&k), model.remove(&k));
                }
                MapOp::RemoveAt(rank) => {
                    let expected = model.keys().nth(rank).copied();
                    match expected {
                        Some(k) => {
                            let v = model.remove(&k).unwrap();
                            prop_assert_eq!(ranked.remove_at(rank), Some((k, v)));
                        }
                        None => prop_assert_eq!(ranked.remove_at(rank), None),
                    }
                }
                MapOp::Get(k) => {
                    prop_assert_eq!(ranked.get(&k), model.get(&k));
                }
                MapOp::GetKeyValue(k) => {
                    prop_assert_eq!(ranked.get_key_value(&k), model.get_key_value(&k));
                }
                MapOp::ContainsKey(k) => {
                    prop_assert_eq!(ranked.contains_key(&k), model.contains_key(&k));
                }
                MapOp::FirstKeyValue => {
                    prop_assert_eq!(ranked.first_key_value(), model.first_key_value());
                }
                MapOp::LastKeyValue => {
                    prop_assert_eq!(ranked.last_key_value(), model.last_key_value());
                }
                MapOp::PopFirst => {
                    prop_assert_eq!(ranked.pop_first(), model.pop_first());
                }
                MapOp::PopLast => {
                    prop_assert_eq!(ranked.pop_last(), model.pop_last());
                }
                MapOp::Rank(k) => {
                    let expected = model.range(..k).count();
                    prop_assert_eq!(ranked.rank(&k), expected);
                }
                MapOp::RankOf(k) => {
                    let expected = model.contains_key(&k).then(|| model.range(..k).count());
                    prop_assert_eq!(ranked.rank_of(&k), expected);
                }
                MapOp::GetByRank(rank) => {
                    let expected = model.iter().nth(rank);
                    prop_assert_eq!(ranked.get_by_rank(rank), expected);
                }
                MapOp::CountRange(a, b) => {
                    let expected = if b < a { 0 } else { model.range(a..=b).count() };
                    prop_assert_eq!(ranked.count_range(&a, &b), expected);
                }
            }

            prop_assert_eq!(ranked.len(), model.len());
            prop_assert_eq!(ranked.is_empty(), model.is_empty());
        }

        // Final full-content comparison in both directions.
        prop_assert!(ranked.iter().eq(model.iter()));
        prop_assert!(ranked.iter().rev().eq(model.iter().rev()));
    }

    /// Ranges and slices agree with the model under random bounds.
    #[test]
    fn ranges_and_slices_match_btreemap(
        entries in proptest::collection::btree_map(key_strategy(), value_strategy(), 0..500),
        lo in key_strategy(),
        hi in key_strategy(),
        begin in -600isize..600,
        end in -600isize..600,
    ) {
        let ranked: RankedMap<i64, i64> = entries.clone().into_iter().collect();
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };

        prop_assert!(ranked.range(lo..hi).eq(entries.range(lo..hi)));
        prop_assert!(ranked.range(lo..=hi).eq(entries.range(lo..=hi)));
        prop_assert!(ranked.range(..).eq(entries.range(..)));
        prop_assert!(ranked.range(lo..).rev().eq(entries.range(lo..).rev()));

        // Slice semantics against index arithmetic on the sorted entries.
        let all: Vec<(i64, i64)> = entries.into_iter().collect();
        let len = all.len() as isize;
        let from = if begin < 0 { (len + begin).max(0) } else { begin };
        let to = if end <= 0 { len + end } else { end.min(len) };
        let expected: Vec<(i64, i64)> = if from > to || from >= len || to < 0 {
            Vec::new()
        } else {
            all[from as usize..to as usize].to_vec()
        };
        let sliced: Vec<(i64, i64)> = ranked.slice(begin, end).map(|(&k, &v)| (k, v)).collect();
        prop_assert_eq!(sliced, expected);
    }

    /// Cursor arithmetic: seek/rank round-trip and offset jumps.
    #[test]
    fn cursor_arithmetic_is_consistent(
        keys in proptest::collection::btree_set(key_strategy(), 1..400),
        offsets in proptest::collection::vec(-500isize..500, 1..20),
    ) {
        let ranked: RankedMap<i64, ()> = keys.iter().map(|&k| (k, ())).collect();
        let sorted: Vec<i64> = keys.into_iter().collect();
        let len = sorted.len();

        // rank(cursor_at(i)) == i and the key matches the model.
        for rank in [0, len / 2, len - 1] {
            let cur = ranked.cursor_at(rank);
            prop_assert_eq!(cur.rank(), rank);
            prop_assert_eq!(cur.key(), Some(&sorted[rank]));
        }
        prop_assert!(ranked.cursor_at(len).is_end());
        prop_assert_eq!(ranked.cursor_at(len).rank(), len);

        // Jumping by an offset matches index arithmetic, clamping to end.
        let mut cur = ranked.cursor_at(0);
        let mut expected_rank = 0isize;
        for offset in offsets {
            let origin = cur.rank();
            cur.advance(offset);
            expected_rank = expected_rank + offset;
            if expected_rank < 0 || expected_rank >= len as isize {
                prop_assert!(cur.is_end());
                expected_rank = len as isize;
            } else {
                prop_assert_eq!(cur.key(), Some(&sorted[expected_rank as usize]));
                // In-range jumps satisfy (cursor + n) - cursor == n.
                let origin_cur = ranked.cursor_at(origin);
                prop_assert_eq!(cur.distance(&origin_cur), expected_rank - origin as isize);
            }
        }
    }
}

// ─── Deterministic unit tests ────────────────────────────────────────────────

#[test]
fn slice_uses_negative_positions() {
    let map = RankedMap::from([(10, ()), (20, ()), (30, ()), (40, ()), (50, ())]);

    let keys: Vec<i32> = map.slice(1, -1).map(|(&k, _)| k).collect();
    assert_eq!(keys, [20, 30, 40]);

    let keys: Vec<i32> = map.slice(-3, 0).map(|(&k, _)| k).collect();
    assert_eq!(keys, [30, 40, 50]);

    assert_eq!(map.slice(3, 2).count(), 0);
    assert_eq!(map.slice(9, 0).count(), 0);
    assert_eq!(map.slice(0, 0).count(), 5);
}

#[test]
fn rank_of_absent_key_is_insertion_rank() {
    let map = RankedMap::from([(10, ()), (20, ()), (30, ()), (40, ()), (50, ())]);
    assert_eq!(map.rank(&25), 2);
    assert_eq!(map.rank(&10), 0);
    assert_eq!(map.rank(&55), 5);
    assert_eq!(map.get_by_rank(2), Some((&30, &())));
}

#[test]
fn lower_and_upper_bound_cursors() {
    let map = RankedMap::from([(1, 'a'), (3, 'b'), (5, 'c')]);

    assert_eq!(map.lower_bound(&2).key_value(), Some((&3, &'b')));
    assert_eq!(map.lower_bound(&3).key_value(), Some((&3, &'b')));
    assert_eq!(map.upper_bound(&3).key_value(), Some((&5, &'c')));
    assert!(map.lower_bound(&6).is_end());

    let mut cur = map.upper_bound(&5);
    assert!(cur.is_end());
    cur.move_prev();
    assert_eq!(cur.key(), Some(&5));
    cur.seek(0);
    assert_eq!(cur.key(), Some(&1));
    cur.move_prev();
    assert!(cur.is_end());
}

#[test]
fn first_and_last_entries_manipulate_in_place() {
    let mut map: RankedMap<i32, &str> = RankedMap::new();
    assert!(map.first_entry().is_none());
    assert!(map.last_entry().is_none());

    map.extend([(1, "a"), (2, "b"), (3, "c")]);

    if let Some(mut entry) = map.first_entry() {
        assert_eq!(entry.key(), &1);
        entry.insert("first");
    }
    if let Some(entry) = map.last_entry() {
        assert_eq!(entry.key(), &3);
        assert_eq!(entry.remove(), "c");
    }

    assert_eq!(map[&1], "first");
    assert_eq!(map.len(), 2);
    assert_eq!(map.last_key_value(), Some((&2, &"b")));
}

#[test]
fn entry_api_inserts_and_updates() {
    let mut map: RankedMap<&str, i32> = RankedMap::new();

    *map.entry("a").or_insert(0) += 10;
    *map.entry("a").or_insert(0) += 10;
    map.entry("b").or_insert_with(|| 7);
    map.entry("c").or_insert_with_key(|k| k.len() as i32);
    map.entry("b").and_modify(|v| *v *= 3).or_insert(0);

    assert_eq!(map["a"], 20);
    assert_eq!(map["b"], 21);
    assert_eq!(map["c"], 1);

    if let ranked_btree::ranked_map::Entry::Occupied(entry) = map.entry("b") {
        assert_eq!(entry.remove(), 21);
    }
    assert!(!map.contains_key("b"));
    assert_eq!(map.len(), 2);
}

#[test]
fn iter_mut_and_values_mut_modify_in_place() {
    let mut map: RankedMap<i32, i32> = (0..200).map(|i| (i, i)).collect();

    for (key, value) in map.iter_mut() {
        *value = key * 3;
    }
    for value in map.values_mut() {
        *value += 1;
    }

    assert!(map.iter().all(|(k, v)| *v == k * 3 + 1));
}

#[test]
fn range_mut_only_touches_the_range() {
    let mut map: RankedMap<i32, i32> = (0..100).map(|i| (i, 0)).collect();
    for (_, value) in map.range_mut(25..75) {
        *value = 1;
    }
    for (key, value) in &map {
        assert_eq!(*value, i32::from((25..75).contains(key)), "key {key}");
    }

    let mut map: RankedMap<i32, i32> = (0..100).map(|i| (i, 0)).collect();
    for (_, value) in map.slice_mut(10, -10) {
        *value = 1;
    }
    for (key, value) in &map {
        assert_eq!(*value, i32::from((10..90).contains(key)), "key {key}");
    }
}

#[test]
fn remove_slice_drops_the_position_range() {
    let mut map: RankedMap<i32, i32> = (0..100).map(|i| (i, i)).collect();
    assert_eq!(map.remove_slice(10, -10), 80);
    let keys: Vec<i32> = map.keys().copied().collect();
    let expected: Vec<i32> = (0..10).chain(90..100).collect();
    assert_eq!(keys, expected);

    // The whole range collapses to the canonical empty state.
    assert_eq!(map.remove_slice(0, 0), 20);
    assert!(map.is_empty());
    assert_eq!(map.iter().count(), 0);
}

#[test]
fn append_moves_everything_and_overwrites() {
    let mut a: RankedMap<i32, &str> = (0..500).map(|i| (i, "a")).collect();
    let mut b: RankedMap<i32, &str> = (250..750).map(|i| (i, "b")).collect();

    a.append(&mut b);

    assert!(b.is_empty());
    assert_eq!(a.len(), 750);
    assert_eq!(a[&100], "a");
    assert_eq!(a[&300], "b");
    assert_eq!(a[&700], "b");
}

#[test]
fn retain_keeps_matching_entries() {
    let mut map: RankedMap<i32, i32> = (0..300).map(|i| (i, i)).collect();
    map.retain(|k, _| k % 3 == 0);
    assert_eq!(map.len(), 100);
    assert!(map.keys().all(|k| k % 3 == 0));
}

#[test]
fn clone_eq_ord_hash_follow_contents() {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let map: RankedMap<i32, i32> = (0..100).map(|i| (i, i)).collect();
    let copy = map.clone();
    assert_eq!(map, copy);

    let mut smaller = copy.clone();
    smaller.remove(&99);
    assert_ne!(map, smaller);
    assert!(smaller < map);

    let hash = |m: &RankedMap<i32, i32>| {
        let mut hasher = DefaultHasher::new();
        m.hash(&mut hasher);
        hasher.finish()
    };
    assert_eq!(hash(&map), hash(&copy));
}

#[test]
fn rank_indexing_panics_out_of_bounds() {
    let map = RankedMap::from([("a", 1)]);
    assert_eq!(map[Rank(0)], 1);

    let result = std::panic::catch_unwind(|| map[Rank(1)]);
    assert!(result.is_err());
}

#[test]
fn into_iterators_are_sorted() {
    let map: RankedMap<i32, i32> = (0..500).rev().map(|i| (i, i * 2)).collect();

    let keys: Vec<i32> = map.clone().into_keys().collect();
    assert!(keys.windows(2).all(|w| w[0] < w[1]));

    let values: Vec<i32> = map.clone().into_values().collect();
    assert_eq!(values, (0..500).map(|i| i * 2).collect::<Vec<_>>());

    let pairs: Vec<(i32, i32)> = map.into_iter().collect();
    assert_eq!(pairs.len(), 500);
    assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
}

#[test]
fn empty_map_queries() {
    let map: RankedMap<i32, i32> = RankedMap::new();
    assert_eq!(map.len(), 0);
    assert!(map.is_empty());
    assert_eq!(map.get(&1), None);
    assert_eq!(map.get_by_rank(0), None);
    assert_eq!(map.first_key_value(), None);
    assert_eq!(map.last_key_value(), None);
    assert_eq!(map.rank(&1), 0);
    assert_eq!(map.iter().count(), 0);
    assert_eq!(map.range(..).count(), 0);
    assert_eq!(map.slice(0, 0).count(), 0);
    assert!(map.cursor_at(0).is_end());
}
