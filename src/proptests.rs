use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

const LONG_BASES: [&[u8]; 3] = [
    b"internationalization",
    b"internationalize",
    b"interoperability-layer",
];

fn key_strategy() -> BoxedStrategy<Vec<u8>> {
    prop_oneof![
        // Tiny alphabet: lots of shared prefixes, terminals and collapses.
        4 => prop::collection::vec(prop::sample::select(vec![0u8, b'a', b'b', b'c', 0xff]), 0..=6),
        // Wide fan-out near the root drives nodes through every shape.
        3 => prop::collection::vec(any::<u8>(), 0..=3),
        // Truncations of long words split and merge prefixes past the window.
        2 => (prop::sample::select(LONG_BASES.to_vec()), 0usize..=24)
            .prop_map(|(base, n)| base[..n.min(base.len())].to_vec()),
    ]
    .boxed()
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 50)]
    Insert(#[proptest(strategy = "key_strategy()")] Vec<u8>, u64),
    #[proptest(weight = 20)]
    Remove(#[proptest(strategy = "key_strategy()")] Vec<u8>),
    #[proptest(weight = 10)]
    Steal(#[proptest(strategy = "key_strategy()")] Vec<u8>),
    #[proptest(weight = 19)]
    Get(#[proptest(strategy = "key_strategy()")] Vec<u8>),
    #[proptest(weight = 1)]
    Clear,
}

fn validate_tree<V>(t: &RadixTree<V>) {
    if let Err(err) = t.verify_integrity() {
        panic!("integrity check failed: {err}");
    }
    let visited = t.iter().count();
    assert_eq!(visited, t.len(), "iteration must visit every entry");
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=1000)) {
        let mut t: RadixTree<u64> = RadixTree::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let old_t = t.insert(&key, value);
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Remove(key) => {
                    let removed_t = t.remove(&key);
                    let removed_m = m.remove(key.as_slice()).is_some();
                    prop_assert_eq!(removed_t, removed_m);
                }
                Op::Steal(key) => {
                    let old_t = t.steal(&key);
                    let old_m = m.remove(key.as_slice());
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Get(key) => {
                    let got_t = t.get(&key).copied();
                    let got_m = m.get(key.as_slice()).copied();
                    prop_assert_eq!(got_t, got_m);
                    prop_assert_eq!(t.contains(&key), m.contains_key(key.as_slice()));
                }
                Op::Clear => {
                    t.clear();
                    m.clear();
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        let got: Vec<(Vec<u8>, u64)> = t.iter().map(|(k, v)| (k.to_vec(), *v)).collect();
        let expected: Vec<(Vec<u8>, u64)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(got, expected);
        prop_assert_eq!(t.keys(), m.keys().cloned().collect::<Vec<_>>());
    }

    #[test]
    fn prop_integrity_after_every_op(ops in prop::collection::vec(any::<Op>(), 0..=200)) {
        let mut t: RadixTree<u64> = RadixTree::new();
        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    t.insert(&key, value);
                }
                Op::Remove(key) => {
                    t.remove(&key);
                }
                Op::Steal(key) => {
                    t.steal(&key);
                }
                Op::Get(_) => {}
                Op::Clear => t.clear(),
            }
            prop_assert_eq!(t.verify_integrity(), Ok(()));
        }
    }

    #[test]
    fn prop_clone_is_independent(
        keys in prop::collection::vec(key_strategy(), 0..=200),
        drop_count in 0usize..=200,
    ) {
        let original: RadixTree<usize> = keys.iter().enumerate().map(|(i, k)| (k, i)).collect();
        let before = original.keys();
        let mut copy = original.clone();
        for key in keys.iter().take(drop_count) {
            copy.remove(key);
        }
        validate_tree(&copy);
        prop_assert_eq!(original.keys(), before);
        validate_tree(&original);
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

fn small_key_set() -> Vec<Vec<u8>> {
    vec![
        b"".to_vec(),
        b"a".to_vec(),
        b"b".to_vec(),
        b"aa".to_vec(),
        b"ab".to_vec(),
        b"ba".to_vec(),
        b"a\0".to_vec(),
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    for_each_permutation(&small_key_set(), |perm| {
        let mut t: RadixTree<u64> = RadixTree::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            assert_eq!(t.insert(&k, v), m.insert(k, v));
            validate_tree(&t);
        }

        let got: Vec<(Vec<u8>, u64)> = t.iter().map(|(k, v)| (k.to_vec(), *v)).collect();
        let expected: Vec<(Vec<u8>, u64)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_key_set();

    // Insert in a fixed order, then remove in all permutations.
    let mut base_tree: RadixTree<u64> = RadixTree::new();
    let mut base_map: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
    for (i, k) in keys.iter().enumerate() {
        let v = i as u64;
        assert_eq!(base_tree.insert(k, v), base_map.insert(k.clone(), v));
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base_tree.clone();
        let mut m = base_map.clone();

        for k in perm {
            assert_eq!(t.steal(&k), m.remove(k.as_slice()));
            assert_eq!(t.len(), m.len());
            validate_tree(&t);
        }
        assert!(t.is_empty());
        assert_eq!(t.stats(), ArtStats::default());
    });
}
