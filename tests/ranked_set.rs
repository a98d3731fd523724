use std::collections::BTreeSet;

use proptest::prelude::*;
use ranked_btree::{Rank, RankedSet};

const TEST_SIZE: usize = 2_000;

fn value_strategy() -> impl Strategy<Value = i64> {
    -3_000i64..3_000
}

#[derive(Debug, Clone)]
enum SetOp {
    Insert(i64),
    InsertHint(usize, i64),
    Remove(i64),
    RemoveAt(usize),
    Take(i64),
    Contains(i64),
    First,
    Last,
    PopFirst,
    PopLast,
    Rank(i64),
    GetByRank(usize),
    CountRange(i64, i64),
}

fn set_op_strategy() -> impl Strategy<Value = SetOp> {
    prop_oneof![
        5 => value_strategy().prop_map(SetOp::Insert),
        2 => ((0usize..4_000), value_strategy()).prop_map(|(h, v)| SetOp::InsertHint(h, v)),
        3 => value_strategy().prop_map(SetOp::Remove),
        1 => (0usize..4_000).prop_map(SetOp::RemoveAt),
        1 => value_strategy().prop_map(SetOp::Take),
        2 => value_strategy().prop_map(SetOp::Contains),
        1 => Just(SetOp::First),
        1 => Just(SetOp::Last),
        1 => Just(SetOp::PopFirst),
        1 => Just(SetOp::PopLast),
        1 => value_strategy().prop_map(SetOp::Rank),
        1 => (0usize..4_000).prop_map(SetOp::GetByRank),
        1 => (value_strategy(), value_strategy()).prop_map(|(a, b)| SetOp::CountRange(a, b)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Replays a random sequence of operations on both RankedSet and BTreeSet
    /// and asserts identical results at every step.
    #[test]
    fn set_ops_match_btreeset(ops in proptest::collection::vec(set_op_strategy(), TEST_SIZE)) {
        let mut ranked: RankedSet<i64> = RankedSet::new();
        let mut model: BTreeSet<i64> = BTreeSet::new();

        for op in ops {
            match op {
                SetOp::Insert(v) => {
                    prop_assert_eq!(ranked.insert(v), model.insert(v));
                }
                SetOp::InsertHint(h, v) => {
                    prop_assert_eq!(ranked.insert_hint(h, v), model.insert(v));
                }
                SetOp::Remove(v) => {
                    prop_assert_eq!(ranked.remove(&v), model.remove(&v));
                }
                SetOp::RemoveAt(rank) => {
                    let expected = model.iter().nth(rank).copied();
                    if let Some(v) = expected {
                        model.remove(&v);
                    }
                    prop_assert_eq!(ranked.remove_at(rank), expected);
                }
                SetOp::Take(v) => {
                    prop_assert_eq!(ranked.take(&v), model.take(&v));
                }
                SetOp::Contains(v) => {
                    prop_assert_eq!(ranked.contains(&v), model.contains(&v));
                }
                SetOp::First => {
                    prop_assert_eq!(ranked.first(), model.first());
                }
                SetOp::Last => {
                    prop_assert_eq!(ranked.last(), model.last());
                }
                SetOp::PopFirst => {
                    prop_assert_eq!(ranked.pop_first(), model.pop_first());
                }
                SetOp::PopLast => {
                    prop_assert_eq!(ranked.pop_last(), model.pop_last());
                }
                SetOp::Rank(v) => {
                    prop_assert_eq!(ranked.rank(&v), model.range(..v).count());
                }
                SetOp::GetByRank(rank) => {
                    prop_assert_eq!(ranked.get_by_rank(rank), model.iter().nth(rank));
                }
                SetOp::CountRange(a, b) => {
                    let expected = if b < a { 0 } else { model.range(a..=b).count() };
                    prop_assert_eq!(ranked.count_range(&a, &b), expected);
                }
            }

            prop_assert_eq!(ranked.len(), model.len());
        }

        prop_assert!(ranked.iter().eq(model.iter()));
        prop_assert!(ranked.iter().rev().eq(model.iter().rev()));
    }

    /// Ranges and rank round-trips agree with the model.
    #[test]
    fn set_ranges_match_btreeset(
        values in proptest::collection::btree_set(value_strategy(), 1..400),
        lo in value_strategy(),
        hi in value_strategy(),
    ) {
        let ranked: RankedSet<i64> = values.iter().copied().collect();
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };

        prop_assert!(ranked.range(lo..hi).eq(values.range(lo..hi)));
        prop_assert!(ranked.range(lo..=hi).rev().eq(values.range(lo..=hi).rev()));

        // rank/get_by_rank are inverse on every element.
        for (rank, value) in values.iter().enumerate() {
            prop_assert_eq!(ranked.rank_of(value), Some(rank));
            prop_assert_eq!(ranked.get_by_rank(rank), Some(value));
        }
        prop_assert!(ranked.get_by_rank(values.len()).is_none());
    }
}

#[test]
fn slice_uses_negative_positions() {
    let set = RankedSet::from([10, 20, 30, 40, 50]);

    let inner: Vec<i32> = set.slice(1, -1).copied().collect();
    assert_eq!(inner, [20, 30, 40]);

    let tail: Vec<i32> = set.slice(-3, 0).copied().collect();
    assert_eq!(tail, [30, 40, 50]);

    assert_eq!(set.slice(4, 1).count(), 0);
    assert_eq!(set[Rank(2)], 30);
}

#[test]
fn subset_and_disjoint_relations() {
    let a = RankedSet::from([1, 2, 3]);
    let b = RankedSet::from([1, 2, 3, 4]);
    let c = RankedSet::from([5, 6]);

    assert!(a.is_subset(&b));
    assert!(b.is_superset(&a));
    assert!(!b.is_subset(&a));
    assert!(a.is_disjoint(&c));
    assert!(!a.is_disjoint(&b));
}

#[test]
fn retain_append_and_remove_slice() {
    let mut set: RankedSet<i32> = (0..300).collect();
    set.retain(|v| v % 2 == 0);
    assert_eq!(set.len(), 150);

    let mut tail: RankedSet<i32> = (300..400).collect();
    set.append(&mut tail);
    assert!(tail.is_empty());
    assert_eq!(set.len(), 250);

    assert_eq!(set.remove_slice(0, 150), 150);
    assert_eq!(set.first(), Some(&300));
    assert_eq!(set.last(), Some(&399));
}

#[test]
fn empty_set_queries() {
    let set: RankedSet<i32> = RankedSet::new();
    assert!(set.is_empty());
    assert_eq!(set.first(), None);
    assert_eq!(set.last(), None);
    assert_eq!(set.rank(&7), 0);
    assert_eq!(set.get_by_rank(0), None);
    assert_eq!(set.iter().count(), 0);
    assert_eq!(set, RankedSet::default());
}
