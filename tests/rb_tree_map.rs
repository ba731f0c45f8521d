use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rb_collections::{CountingAllocator, Error, NaturalOrder, RBTreeMap, Reverse};

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 2_000;

/// Generates keys in a range small enough to cause collisions.
fn key_strategy() -> impl Strategy<Value = i64> {
    -2_000i64..2_000i64
}

fn value_strategy() -> impl Strategy<Value = i64> {
    any::<i64>()
}

// ─── Operations enum for driving randomized tests ────────────────────────────

#[derive(Debug, Clone)]
enum MapOp {
    Insert(i64, i64),
    InsertHint(i64, i64, i64),
    GetOrInsertDefault(i64),
    Remove(i64),
    Erase(i64),
    EraseAt(i64),
    Get(i64),
    LowerBound(i64),
    UpperBound(i64),
    PopFirst,
    PopLast,
}

fn map_op_strategy() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        6 => (key_strategy(), value_strategy()).prop_map(|(k, v)| MapOp::Insert(k, v)),
        2 => (key_strategy(), key_strategy(), value_strategy()).prop_map(|(h, k, v)| MapOp::InsertHint(h, k, v)),
        1 => key_strategy().prop_map(MapOp::GetOrInsertDefault),
        2 => key_strategy().prop_map(MapOp::Remove),
        2 => key_strategy().prop_map(MapOp::Erase),
        1 => key_strategy().prop_map(MapOp::EraseAt),
        2 => key_strategy().prop_map(MapOp::Get),
        1 => key_strategy().prop_map(MapOp::LowerBound),
        1 => key_strategy().prop_map(MapOp::UpperBound),
        1 => Just(MapOp::PopFirst),
        1 => Just(MapOp::PopLast),
    ]
}

// ─── Core operations ─────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Replays a random sequence of operations on both RBTreeMap and BTreeMap,
    /// checking results and the red-black invariants at every step.
    #[test]
    fn map_ops_match_btreemap(ops in proptest::collection::vec(map_op_strategy(), TEST_SIZE)) {
        let mut rb_map: RBTreeMap<i64, i64> = RBTreeMap::new();
        let mut bt_map: BTreeMap<i64, i64> = BTreeMap::new();

        for op in &ops {
            match *op {
                MapOp::Insert(k, v) => {
                    let (pos, inserted) = rb_map.insert(k, v).unwrap();
                    let expected_inserted = !bt_map.contains_key(&k);
                    let expected = *bt_map.entry(k).or_insert(v);
                    prop_assert_eq!(inserted, expected_inserted, "insert({}, {})", k, v);
                    prop_assert_eq!(rb_map.get_at(pos), Some((&k, &expected)), "insert({}, {})", k, v);
                }
                MapOp::InsertHint(hint, k, v) => {
                    let hint = rb_map.lower_bound(&hint);
                    let pos = rb_map.insert_hint(hint, k, v).unwrap();
                    let expected = *bt_map.entry(k).or_insert(v);
                    prop_assert_eq!(rb_map.get_at(pos), Some((&k, &expected)), "insert_hint({}, {})", k, v);
                }
                MapOp::GetOrInsertDefault(k) => {
                    let rb_value = *rb_map.get_or_insert_default(k).unwrap();
                    let bt_value = *bt_map.entry(k).or_default();
                    prop_assert_eq!(rb_value, bt_value, "get_or_insert_default({})", k);
                }
                MapOp::Remove(k) => {
                    prop_assert_eq!(rb_map.remove(&k), bt_map.remove(&k), "remove({})", k);
                }
                MapOp::Erase(k) => {
                    let expected = usize::from(bt_map.remove(&k).is_some());
                    prop_assert_eq!(rb_map.erase(&k), expected, "erase({})", k);
                }
                MapOp::EraseAt(k) => {
                    let pos = rb_map.lower_bound(&k);
                    let expected = bt_map.range(k..).next().map(|(&k, &v)| (k, v));
                    if let Some((key, value)) = expected {
                        bt_map.remove(&key);
                        prop_assert_eq!(rb_map.erase_at(pos), (key, value), "erase_at(lower_bound({}))", k);
                    } else {
                        prop_assert!(pos.is_end());
                    }
                }
                MapOp::Get(k) => {
                    prop_assert_eq!(rb_map.get(&k), bt_map.get(&k), "get({})", k);
                    prop_assert_eq!(rb_map.contains_key(&k), bt_map.contains_key(&k), "contains_key({})", k);
                }
                MapOp::LowerBound(k) => {
                    let rb_result = rb_map.get_at(rb_map.lower_bound(&k));
                    prop_assert_eq!(rb_result, bt_map.range(k..).next(), "lower_bound({})", k);
                }
                MapOp::UpperBound(k) => {
                    let rb_result = rb_map.get_at(rb_map.upper_bound(&k));
                    let bt_result = bt_map.range((std::ops::Bound::Excluded(k), std::ops::Bound::Unbounded)).next();
                    prop_assert_eq!(rb_result, bt_result, "upper_bound({})", k);
                }
                MapOp::PopFirst => {
                    prop_assert_eq!(rb_map.pop_first(), bt_map.pop_first(), "pop_first");
                }
                MapOp::PopLast => {
                    prop_assert_eq!(rb_map.pop_last(), bt_map.pop_last(), "pop_last");
                }
            }
            prop_assert_eq!(rb_map.len(), bt_map.len(), "len mismatch after {:?}", op);
            prop_assert_eq!(rb_map.check_invariants(), Ok(()), "invariants after {:?}", op);
        }

        let rb_items: Vec<_> = rb_map.iter().collect();
        let bt_items: Vec<_> = bt_map.iter().collect();
        prop_assert_eq!(rb_items, bt_items);
    }

    /// Any insertion order iterates sorted, and traversal length equals `len()`.
    #[test]
    fn any_permutation_iterates_sorted(keys in Just((1..=500).collect::<Vec<u32>>()).prop_shuffle()) {
        let mut map = RBTreeMap::new();
        for &k in &keys {
            prop_assert!(map.insert(k, ()).unwrap().1);
        }
        prop_assert_eq!(map.check_invariants(), Ok(()));
        prop_assert_eq!(map.iter().count(), map.len());
        prop_assert!(map.keys().copied().eq(1..=500));
        prop_assert!(map.keys().rev().copied().eq((1..=500).rev()));
    }

    /// Erasing every element in arbitrary order leaves an empty, valid tree.
    #[test]
    fn erase_all_in_any_order(keys in Just((0..300).collect::<Vec<u32>>()).prop_shuffle()) {
        let mut map: RBTreeMap<u32, u32> = (0..300).map(|k| (k, k)).collect();
        for k in &keys {
            prop_assert_eq!(map.erase(k), 1);
            prop_assert_eq!(map.check_invariants(), Ok(()));
        }
        prop_assert!(map.is_empty());
        prop_assert_eq!(map.begin(), map.end());
    }

    /// Clones have equal contents and the original is unaffected by later edits to the clone.
    #[test]
    fn clone_is_deep(entries in proptest::collection::vec((key_strategy(), value_strategy()), 0..TEST_SIZE)) {
        let map: RBTreeMap<i64, i64> = entries.iter().copied().collect();
        let mut copy = map.try_clone().unwrap();
        prop_assert_eq!(&copy, &map);
        prop_assert_eq!(copy.check_invariants(), Ok(()));
        copy.clear();
        prop_assert_eq!(map.len(), map.iter().count());
    }

    /// Owning iteration yields the same pairs as BTreeMap in both directions.
    #[test]
    fn into_iter_matches_btreemap(entries in proptest::collection::vec((key_strategy(), value_strategy()), 0..TEST_SIZE)) {
        let mut rb_map: RBTreeMap<i64, i64> = RBTreeMap::new();
        let mut bt_map: BTreeMap<i64, i64> = BTreeMap::new();
        for &(k, v) in &entries {
            rb_map.insert(k, v).unwrap();
            bt_map.entry(k).or_insert(v);
        }
        prop_assert!(rb_map.clone().into_iter().eq(bt_map.clone()));
        prop_assert!(rb_map.into_iter().rev().eq(bt_map.into_iter().rev()));
    }
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn insert_erase_and_default_insert() {
    let mut map = RBTreeMap::new();
    map.insert(1, 'a').unwrap();
    map.insert(3, 'c').unwrap();
    map.insert(2, 'b').unwrap();
    assert_eq!(map.iter().map(|(&k, &v)| (k, v)).collect::<Vec<_>>(), [(1, 'a'), (2, 'b'), (3, 'c')]);

    map.erase(&2);
    assert_eq!(map.iter().map(|(&k, &v)| (k, v)).collect::<Vec<_>>(), [(1, 'a'), (3, 'c')]);
    assert_eq!(map.len(), 2);

    *map.get_or_insert_default(5).unwrap() = 'e';
    assert_eq!(map.iter().map(|(&k, &v)| (k, v)).collect::<Vec<_>>(), [(1, 'a'), (3, 'c'), (5, 'e')]);
}

#[test]
fn duplicate_insert_keeps_size_and_value() {
    let mut map = RBTreeMap::from([(7, "first")]);
    let existing = map.find(&7);
    assert_eq!(map.insert(7, "second").unwrap(), (existing, false));
    assert_eq!(map.len(), 1);
    assert_eq!(map[&7], "first");
}

#[test]
fn checked_lookup() {
    let map = RBTreeMap::from([(1, 1)]);
    assert_eq!(map.at(&2), Err(Error::KeyNotFound { container: "RBTreeMap" }));
    assert_eq!(map.count(&1), 1);
    assert_eq!(map.count(&2), 0);
}

#[test]
#[should_panic(expected = "no entry found for key")]
fn index_missing_key_panics() {
    let map: RBTreeMap<i32, i32> = RBTreeMap::new();
    let _value: i32 = map[&0];
}

#[test]
fn reverse_comparator() {
    let mut map = RBTreeMap::with_comparator(Reverse(NaturalOrder));
    map.extend([(1, 'a'), (3, 'c'), (2, 'b')]);
    assert_eq!(map.keys().copied().collect::<Vec<_>>(), [3, 2, 1]);
    assert_eq!(map.get_at(map.lower_bound(&2)), Some((&2, &'b')));
    assert_eq!(map.get_at(map.upper_bound(&2)), Some((&1, &'a')));
    map.check_invariants().unwrap();
}

#[test]
fn allocation_failure_leaves_map_unchanged() {
    let alloc = CountingAllocator::new();
    let mut map = RBTreeMap::new_in(&alloc);
    for k in 0..8u32 {
        map.insert(k, k).unwrap();
    }
    // Both arenas are full at capacity 8; the next insertion must grow them.
    alloc.set_budget(Some(0));
    assert!(matches!(map.insert(100, 100), Err(Error::AllocError { .. })));
    assert_eq!(map.len(), 8);
    assert!(map.keys().copied().eq(0..8));
    map.check_invariants().unwrap();

    // Room freed by an erase is reused without allocating.
    map.erase(&3);
    map.insert(100, 100).unwrap();
    assert_eq!(map.last_key_value(), Some((&100, &100)));

    alloc.set_budget(None);
    drop(map);
    assert_eq!(alloc.net_allocations(), 0);
}

#[test]
fn extend_by_reference_and_hash() {
    use std::hash::{BuildHasher, RandomState};

    let source = BTreeMap::from([(1, 10), (2, 20)]);
    let mut map: RBTreeMap<i32, i32> = RBTreeMap::new();
    map.extend(source.iter());
    let same: RBTreeMap<i32, i32> = source.into_iter().collect();
    let state = RandomState::new();
    assert_eq!(state.hash_one(&map), state.hash_one(&same));
}
