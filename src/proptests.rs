use crate::node::Node;
use crate::{CowContext, Direction, Lookup, Tree};
use proptest::prelude::*;
use std::collections::BTreeMap;

struct Bounds<'a> {
    lo: Option<&'a [u8]>,
    hi: Option<&'a [u8]>,
}

fn validate_node<'a>(
    node: &'a Node,
    bounds: Bounds<'a>,
    depth: usize,
    leaf_depth: &mut Option<usize>,
    is_root: bool,
) -> usize {
    let items = node.items();
    for pair in items.windows(2) {
        assert!(pair[0].key() < pair[1].key(), "node keys must be strictly ascending");
    }
    for item in items {
        if let Some(lo) = bounds.lo {
            assert!(item.key() >= lo, "key below its separator");
        }
        if let Some(hi) = bounds.hi {
            assert!(item.key() < hi, "key at or above its right separator");
        }
    }

    match node {
        Node::Leaf(leaf) => {
            assert!(leaf.items.len() <= leaf.max, "leaf over capacity");
            assert!(is_root || !leaf.items.is_empty(), "non-root leaf is empty");
            match *leaf_depth {
                Some(d) => assert_eq!(d, depth, "leaves must all sit at the same depth"),
                None => *leaf_depth = Some(depth),
            }
            leaf.items.len()
        }
        Node::Inter(inter) => {
            assert!(inter.items.len() <= inter.max, "internal node over capacity");
            // below the root, a split at node size 2 leaves a one-child node
            assert!(!is_root || !inter.items.is_empty(), "root without separators");
            assert_eq!(inter.children.len(), inter.items.len() + 1);
            let mut count = 0;
            for (i, child) in inter.children.iter().enumerate() {
                let lo = if i == 0 { bounds.lo } else { Some(inter.items[i - 1].key()) };
                let hi = inter.items.get(i).map(|s| s.key()).or(bounds.hi);
                count += validate_node(child, Bounds { lo, hi }, depth + 1, leaf_depth, false);
            }
            count
        }
    }
}

fn validate_tree(t: &Tree) {
    let count = match t.root() {
        Some(root) => validate_node(
            root,
            Bounds { lo: None, hi: None },
            1,
            &mut None,
            true,
        ),
        None => 0,
    };
    assert_eq!(count, t.len(), "reachable item count must match Tree::len");
}

fn contents(t: &Tree) -> Vec<(Vec<u8>, Vec<u8>)> {
    t.iter().map(|(k, v)| (k.to_vec(), v.to_vec())).collect()
}

fn expected(m: &BTreeMap<Vec<u8>, Vec<u8>>) -> Vec<(Vec<u8>, Vec<u8>)> {
    m.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<u8>, Vec<u8>),
    Remove(Vec<u8>),
    RemoveMin,
    RemoveMax,
    Get(Vec<u8>),
    Snapshot,
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A narrow alphabet keeps collisions and shared prefixes frequent.
    prop::collection::vec(b'a'..=b'e', 1..=4)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let val = prop::collection::vec(any::<u8>(), 1..=6);
    let op = prop_oneof![
        45 => (key.clone(), val).prop_map(|(k, v)| Op::Insert(k, v)),
        25 => key.clone().prop_map(Op::Remove),
        8 => Just(Op::RemoveMin),
        8 => Just(Op::RemoveMax),
        12 => key.clone().prop_map(Op::Get),
        2 => Just(Op::Snapshot),
    ];
    prop::collection::vec(op, 0..=400)
}

fn apply(t: &mut Tree, m: &mut BTreeMap<Vec<u8>, Vec<u8>>, op: &Op) -> Result<(), TestCaseError> {
    match op {
        Op::Insert(key, value) => {
            let added = t.insert(key, value).unwrap();
            prop_assert_eq!(added, m.insert(key.clone(), value.clone()).is_none());
        }
        Op::Remove(key) => {
            prop_assert_eq!(t.remove(key).unwrap(), m.remove(key));
        }
        Op::RemoveMin => {
            prop_assert_eq!(t.remove_min().ok(), m.pop_first());
        }
        Op::RemoveMax => {
            prop_assert_eq!(t.remove_max().ok(), m.pop_last());
        }
        Op::Get(key) => {
            let got = t.get(Lookup::Key(key)).ok();
            prop_assert_eq!(got, m.get(key).map(|v| v.as_slice()));
        }
        Op::Snapshot => {}
    }
    Ok(())
}

fn expected_scan(
    m: &BTreeMap<Vec<u8>, Vec<u8>>,
    start: Option<&[u8]>,
    stop: Option<&[u8]>,
    direction: Direction,
    inclusive: bool,
) -> Vec<Vec<u8>> {
    let keys = m.keys().map(|k| k.as_slice());
    match direction {
        Direction::Ascending => keys
            .filter(|k| start.map_or(true, |s| *k >= s))
            .take_while(|k| stop.map_or(true, |s| *k < s || (inclusive && *k == s)))
            .map(<[u8]>::to_vec)
            .collect(),
        Direction::Descending => keys
            .rev()
            .filter(|k| start.map_or(true, |s| *k <= s))
            .take_while(|k| stop.map_or(true, |s| *k > s || (inclusive && *k == s)))
            .map(<[u8]>::to_vec)
            .collect(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(node_size in 2usize..=6, ops in ops_strategy()) {
        let mut t = Tree::with_context(node_size, CowContext::new(4)).unwrap();
        let mut m: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        let mut snapshots = Vec::new();

        for op in &ops {
            if let Op::Snapshot = op {
                snapshots.push((t.clone(), m.clone()));
            }
            apply(&mut t, &mut m, op)?;
            prop_assert_eq!(t.len(), m.len());
            validate_tree(&t);
        }

        prop_assert_eq!(contents(&t), expected(&m));
        for (snap, snap_m) in &snapshots {
            validate_tree(snap);
            prop_assert_eq!(contents(snap), expected(snap_m));
        }
    }

    #[test]
    fn prop_diverging_clones(
        node_size in 2usize..=5,
        seed in prop::collection::vec((key_strategy(), prop::collection::vec(any::<u8>(), 1..=4)), 0..=80),
        left_ops in ops_strategy(),
        right_ops in ops_strategy(),
        shared_context in any::<bool>(),
    ) {
        let cow = CowContext::new(8);
        let mut left = Tree::with_context(node_size, cow.clone()).unwrap();
        let mut m_left = BTreeMap::new();
        for (k, v) in &seed {
            left.insert(k, v).unwrap();
            m_left.insert(k.clone(), v.clone());
        }

        let mut right = if shared_context { left.clone_with(cow) } else { left.clone() };
        let mut m_right = m_left.clone();

        // interleave so both handles fork from the same shared nodes
        let n = left_ops.len().max(right_ops.len());
        for i in 0..n {
            if let Some(op) = left_ops.get(i) {
                apply(&mut left, &mut m_left, op)?;
            }
            if let Some(op) = right_ops.get(i) {
                apply(&mut right, &mut m_right, op)?;
            }
        }

        validate_tree(&left);
        validate_tree(&right);
        prop_assert_eq!(contents(&left), expected(&m_left));
        prop_assert_eq!(contents(&right), expected(&m_right));
    }

    #[test]
    fn prop_scan_matches_btreemap(
        node_size in 2usize..=6,
        keys in prop::collection::btree_set(key_strategy(), 0..=120),
        start in prop::option::of(key_strategy()),
        stop in prop::option::of(key_strategy()),
        direction in any::<Direction>(),
        inclusive in any::<bool>(),
    ) {
        let mut t = Tree::with_context(node_size, CowContext::default()).unwrap();
        let mut m = BTreeMap::new();
        for k in &keys {
            t.insert(k, b"v").unwrap();
            m.insert(k.clone(), b"v".to_vec());
        }

        let got: Vec<Vec<u8>> = t
            .scan(start.as_deref(), stop.as_deref(), direction, inclusive)
            .map(|(k, _)| k.to_vec())
            .collect();
        let want = expected_scan(&m, start.as_deref(), stop.as_deref(), direction, inclusive);
        prop_assert_eq!(got, want);
    }
}

/// Call `f` once per ordering of `items` (Heap's algorithm, swapping in a
/// scratch copy).
fn permutations<T: Clone>(items: &[T], mut f: impl FnMut(&[T])) {
    fn generate<T>(k: usize, buf: &mut [T], f: &mut impl FnMut(&[T])) {
        if k <= 1 {
            f(buf);
            return;
        }
        generate(k - 1, buf, f);
        for i in 0..k - 1 {
            if k % 2 == 0 {
                buf.swap(i, k - 1);
            } else {
                buf.swap(0, k - 1);
            }
            generate(k - 1, buf, f);
        }
    }

    let mut buf = items.to_vec();
    generate(buf.len(), &mut buf, &mut f);
}

fn small_keys() -> Vec<Vec<u8>> {
    vec![
        b"a".to_vec(),
        b"b".to_vec(),
        b"c".to_vec(),
        b"aa".to_vec(),
        b"ab".to_vec(),
        b"ba".to_vec(),
        b"bb".to_vec(),
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = small_keys();

    for node_size in [2, 3] {
        let mut seen = 0;
        permutations(&keys, |perm| {
            let mut t = Tree::with_context(node_size, CowContext::new(2)).unwrap();
            let mut m: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

            for (i, k) in perm.iter().enumerate() {
                let v = vec![i as u8 + 1];
                assert_eq!(t.insert(k, &v).unwrap(), m.insert(k.clone(), v).is_none());
                validate_tree(&t);
            }

            assert_eq!(contents(&t), expected(&m));
            seen += 1;
        });
        assert_eq!(seen, 5040);
    }
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_keys();

    for node_size in [2, 3] {
        // Insert in a fixed order, then remove in all permutations.
        let mut base = Tree::with_context(node_size, CowContext::new(2)).unwrap();
        let mut base_map: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for (i, k) in keys.iter().enumerate() {
            let v = vec![i as u8 + 1];
            assert_eq!(base.insert(k, &v).unwrap(), base_map.insert(k.clone(), v).is_none());
        }
        assert!(base.height() > 1);

        permutations(&keys, |perm| {
            let mut t = base.clone();
            let mut m = base_map.clone();

            for k in perm {
                assert_eq!(t.remove(k).unwrap(), m.remove(k.as_slice()));
                assert_eq!(t.len(), m.len());
                validate_tree(&t);
                for rest in m.keys() {
                    assert!(t.contains_key(rest));
                }
            }
            assert!(t.is_empty());
            assert_eq!(t.height(), 1);
        });

        // every permutation ran against a clone; the base must be untouched
        validate_tree(&base);
        assert_eq!(contents(&base), expected(&base_map));
    }
}
