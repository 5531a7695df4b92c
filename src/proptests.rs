use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

/// Checks every structural invariant of `t`, panicking on the first violation.
pub(crate) fn validate_tree(t: &TallyTree) {
    fn check(
        t: &TallyTree,
        ptr: Ptr,
        parent: Ptr,
        lower: Option<&str>,
        upper: Option<&str>,
        reachable: &mut usize,
    ) -> i8 {
        if ptr.is_null() {
            return EMPTY_HEIGHT;
        }

        *reachable += 1;
        let node = &t.nodes[ptr];
        let key = &*node.key;

        assert_eq!(node.parent, parent, "parent link of {key:?} is stale");
        assert!(node.count >= 1, "{key:?} is linked with a zero count");
        if let Some(lower) = lower {
            assert!(key > lower, "{key:?} must sort after {lower:?}");
        }
        if let Some(upper) = upper {
            assert!(key < upper, "{key:?} must sort before {upper:?}");
        }

        let left = check(t, node.left, ptr, lower, Some(key), reachable);
        let right = check(t, node.right, ptr, Some(key), upper, reachable);
        assert!(
            (right - left).abs() <= 1,
            "{key:?} is out of balance ({left} vs {right})"
        );
        assert_eq!(
            node.height,
            1 + left.max(right),
            "stored height of {key:?} must match children"
        );
        node.height
    }

    let mut reachable = 0usize;
    check(t, t.root, Ptr::NULL, None, None, &mut reachable);
    assert_eq!(reachable, t.len, "reachable node count must match TallyTree::len");

    for &free in &t.nodes.free {
        assert_eq!(t.nodes[free].count, 0, "free slot still holds a count");
    }
    assert_eq!(
        reachable + t.nodes.free.len(),
        t.nodes.slots.len(),
        "every slot is either linked or free"
    );
}

fn key_strategy() -> impl Strategy<Value = String> {
    // A small alphabet keeps collisions, and therefore counts above one, common.
    "[a-f]{0,3}"
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 50)]
    Insert(#[proptest(strategy = "key_strategy()")] String),
    #[proptest(weight = 30)]
    Remove(#[proptest(strategy = "key_strategy()")] String),
    #[proptest(weight = 19)]
    Get(#[proptest(strategy = "key_strategy()")] String),
    #[proptest(weight = 1)]
    Clear,
}

fn height_bound(len: usize) -> f64 {
    1.4405 * ((len + 2) as f64).log2()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=600)) {
        let mut t = TallyTree::new();
        let mut m: BTreeMap<String, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key) => {
                    let expected = m.entry(key.clone()).or_insert(0);
                    *expected += 1;
                    prop_assert_eq!(t.insert(&key), *expected);
                }
                Op::Remove(key) => {
                    let expected = match m.get_mut(&key) {
                        Some(count) => {
                            *count -= 1;
                            let left = *count;
                            if left == 0 {
                                m.remove(&key);
                            }
                            Some(left)
                        }
                        None => None,
                    };
                    prop_assert_eq!(t.remove(&key).ok(), expected);
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&key), m.get(&key).copied());
                }
                Op::Clear => {
                    t.clear();
                    m.clear();
                }
            }

            validate_tree(&t);
            prop_assert_eq!(t.len(), m.len());
        }

        let got: Vec<(String, u64)> = t.iter().map(|(k, c)| (k.to_owned(), c)).collect();
        let expected: Vec<(String, u64)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_order_independent_counts(
        (keys, shuffled) in prop::collection::vec(key_strategy(), 0..80)
            .prop_flat_map(|keys| (Just(keys.clone()), Just(keys).prop_shuffle()))
    ) {
        let a: TallyTree = keys.iter().collect();
        let b: TallyTree = shuffled.iter().collect();
        validate_tree(&a);
        validate_tree(&b);

        prop_assert_eq!(a.len(), b.len());
        let left: Vec<_> = a.iter().collect();
        let right: Vec<_> = b.iter().collect();
        prop_assert_eq!(left, right);
    }

    #[test]
    fn prop_height_bound(keys in prop::collection::btree_set("[a-z0-9]{1,8}", 1..400)) {
        let t: TallyTree = keys.iter().collect();
        prop_assert_eq!(t.len(), keys.len());
        let height = t.height().unwrap() as f64;
        prop_assert!(height <= height_bound(t.len()));
    }

    #[test]
    fn prop_insert_then_remove_is_inverse(
        keys in prop::collection::vec(key_strategy(), 0..60),
        probe in key_strategy(),
    ) {
        let mut t: TallyTree = keys.iter().collect();
        let len = t.len();
        let before = t.get(&probe);

        t.insert(&probe);
        let left = t.remove(&probe).unwrap();
        prop_assert_eq!(left, before.unwrap_or(0));
        prop_assert_eq!(t.len(), len);
        prop_assert_eq!(t.get(&probe), before);
        validate_tree(&t);
    }

    #[test]
    fn prop_most_frequent_is_a_maximum(keys in prop::collection::vec(key_strategy(), 0..100)) {
        let t: TallyTree = keys.iter().collect();
        match t.most_frequent() {
            None => prop_assert!(keys.is_empty()),
            Some((key, count)) => {
                prop_assert_eq!(t.get(key), Some(count));
                prop_assert!(t.iter().all(|(_, c)| c <= count));
            }
        }
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

const SMALL_SET: [&str; 7] = ["d", "b", "f", "a", "c", "e", "g"];

#[test]
fn exhaustive_insert_order_small_set() {
    for_each_permutation(&SMALL_SET, |perm| {
        let t: TallyTree = perm.iter().collect();
        validate_tree(&t);
        let keys: Vec<&str> = t.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b", "c", "d", "e", "f", "g"]);
        assert!(t.height().unwrap() <= 3);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    // Insert in a fixed order, then remove in all permutations.
    let base: TallyTree = SMALL_SET.iter().collect();

    for_each_permutation(&SMALL_SET, |perm| {
        let mut t = base.clone();
        let mut left = SMALL_SET.len();
        for k in perm {
            assert_eq!(t.remove(k).unwrap(), 0);
            left -= 1;
            assert_eq!(t.len(), left);
            validate_tree(&t);
        }
        assert!(t.is_empty());
        assert!(t.root.is_null());
    });
}

#[test]
fn exhaustive_decrement_order_with_duplicates() {
    let lines = ["a", "b", "a", "c", "b", "a"];
    let base: TallyTree = lines.iter().collect();

    for_each_permutation(&lines, |perm| {
        let mut t = base.clone();
        let mut m: BTreeMap<&str, u64> = BTreeMap::new();
        for k in lines {
            *m.entry(k).or_insert(0) += 1;
        }

        for k in perm {
            let count = m.get_mut(k).unwrap();
            *count -= 1;
            assert_eq!(t.remove(k).unwrap(), *count);
            if *count == 0 {
                m.remove(k);
            }
            assert_eq!(t.len(), m.len());
            validate_tree(&t);
        }
        assert!(t.is_empty());
    });
}
