use super::*;

use crate::container::{Cardinality, Container, ARRAY_MAX_SIZE};
use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeSet;
use std::ops::Range;

const UNIVERSE: u64 = 1 << 32;

fn validate_bitmap(b: &RoaringBitmap) {
    let index = b.index();
    assert_eq!(index.keys().len(), index.containers().len());
    assert!(
        index.keys().windows(2).all(|w| w[0] < w[1]),
        "keys must be strictly increasing"
    );

    let mut total = 0u64;
    for (key, c) in index.iter() {
        assert!(!c.is_empty(), "empty container stored under key {key}");
        total += u64::from(c.len());
        match c {
            Container::Array(a) => {
                assert!(a.len() as usize <= ARRAY_MAX_SIZE, "oversized array");
                assert!(
                    a.as_slice().windows(2).all(|w| w[0] < w[1]),
                    "array values must be strictly increasing"
                );
            }
            Container::Bitmap(bm) => {
                let popcount: u32 = bm.words().iter().map(|w| w.count_ones()).sum();
                assert_eq!(
                    bm.cardinality(),
                    Cardinality::Valid(popcount),
                    "bitmap cardinality must match its words"
                );
                assert!(popcount as usize > ARRAY_MAX_SIZE, "sparse bitmap");
            }
            Container::Run(r) => {
                for w in r.runs().windows(2) {
                    assert!(
                        w[0].stop() < u32::from(w[1].start),
                        "runs must be sorted, disjoint and non-adjacent"
                    );
                }
            }
        }
    }
    assert_eq!(total, b.len(), "cardinality must be the sum of containers");
}

// Values cluster on a few keys, including both ends of the key space, so that
// containers fill up and change encoding.
fn value() -> impl Strategy<Value = u32> {
    prop_oneof![
        4 => (0u32..3, any::<u16>()).prop_map(|(key, low)| (key << 16) | u32::from(low)),
        3 => 0u32..6000,
        2 => 0xFFFF_0000u32..=u32::MAX,
        1 => any::<u32>(),
    ]
}

fn range() -> impl Strategy<Value = Range<u64>> {
    (value(), 0u64..20_000).prop_map(|(start, len)| {
        let start = u64::from(start);
        start..(start + len).min(UNIVERSE)
    })
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 8)]
    Add(#[proptest(strategy = "value()")] u32),
    #[proptest(weight = 4)]
    Remove(#[proptest(strategy = "value()")] u32),
    #[proptest(weight = 2)]
    AddRange(#[proptest(strategy = "range()")] Range<u64>),
    #[proptest(weight = 2)]
    RemoveRange(#[proptest(strategy = "range()")] Range<u64>),
    #[proptest(weight = 2)]
    Flip(#[proptest(strategy = "range()")] Range<u64>),
    #[proptest(weight = 1)]
    RunOptimize,
    #[proptest(weight = 1)]
    RemoveRunCompression,
}

fn apply(b: &mut RoaringBitmap, m: &mut BTreeSet<u32>, op: Op) {
    match op {
        Op::Add(x) => assert_eq!(b.add(x), m.insert(x)),
        Op::Remove(x) => assert_eq!(b.remove(x), m.remove(&x)),
        Op::AddRange(r) => {
            b.add_range(r.clone()).unwrap();
            m.extend(r.map(|x| x as u32));
        }
        Op::RemoveRange(r) => {
            b.remove_range(r.clone()).unwrap();
            for x in r {
                m.remove(&(x as u32));
            }
        }
        Op::Flip(r) => {
            b.flip(r.clone()).unwrap();
            for x in r.map(|x| x as u32) {
                if !m.remove(&x) {
                    m.insert(x);
                }
            }
        }
        Op::RunOptimize => {
            b.run_optimize();
        }
        Op::RemoveRunCompression => {
            b.remove_run_compression();
        }
    }
}

fn build(ops: Vec<Op>) -> (RoaringBitmap, BTreeSet<u32>) {
    let mut b = RoaringBitmap::new();
    let mut m = BTreeSet::new();
    for op in ops {
        apply(&mut b, &mut m, op);
    }
    (b, m)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(any::<Op>(), 0..=48)
}

fn set_strategy() -> impl Strategy<Value = (RoaringBitmap, BTreeSet<u32>)> {
    ops_strategy().prop_map(build)
}

fn to_vec(m: &BTreeSet<u32>) -> Vec<u32> {
    m.iter().copied().collect()
}

fn offset() -> impl Strategy<Value = i64> {
    prop_oneof![
        3 => -200_000i64..200_000,
        1 => any::<i32>().prop_map(i64::from),
        1 => Just(-(UNIVERSE as i64)),
        1 => Just(UNIVERSE as i64 - 1),
    ]
}

fn next_absent(m: &BTreeSet<u32>, mut x: u32) -> Option<u32> {
    while m.contains(&x) {
        x = x.checked_add(1)?;
    }
    Some(x)
}

fn previous_absent(m: &BTreeSet<u32>, mut x: u32) -> Option<u32> {
    while m.contains(&x) {
        x = x.checked_sub(1)?;
    }
    Some(x)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let mut b = RoaringBitmap::new();
        let mut m = BTreeSet::new();
        for op in ops {
            apply(&mut b, &mut m, op);
            prop_assert_eq!(b.len(), m.len() as u64);
        }
        validate_bitmap(&b);
        prop_assert_eq!(b.to_vec(), to_vec(&m));
        prop_assert_eq!(b.first().ok(), m.first().copied());
        prop_assert_eq!(b.last().ok(), m.last().copied());
    }

    #[test]
    fn prop_algebra((a, ma) in set_strategy(), (b, mb) in set_strategy()) {
        let and = a.and(&b);
        let or = a.or(&b);
        let xor = a.xor(&b);
        let and_not = a.and_not(&b);
        for result in [&and, &or, &xor, &and_not] {
            validate_bitmap(result);
        }
        prop_assert_eq!(and.to_vec(), to_vec(&(&ma & &mb)));
        prop_assert_eq!(or.to_vec(), to_vec(&(&ma | &mb)));
        prop_assert_eq!(xor.to_vec(), to_vec(&(&ma ^ &mb)));
        prop_assert_eq!(and_not.to_vec(), to_vec(&(&ma - &mb)));

        prop_assert_eq!(a.and_cardinality(&b), and.len());
        prop_assert_eq!(a.or_cardinality(&b), or.len());
        prop_assert_eq!(a.xor_cardinality(&b), xor.len());
        prop_assert_eq!(a.and_not_cardinality(&b), and_not.len());
        prop_assert_eq!(a.intersects(&b), !and.is_empty());

        let mut x = a.clone();
        x.and_inplace(&b);
        prop_assert_eq!(&x, &and);
        let mut x = a.clone();
        x.or_inplace(&b);
        prop_assert_eq!(&x, &or);
        let mut x = a.clone();
        x.xor_inplace(&b);
        prop_assert_eq!(&x, &xor);
        let mut x = a.clone();
        x.and_not_inplace(&b);
        validate_bitmap(&x);
        prop_assert_eq!(&x, &and_not);

        prop_assert_eq!(RoaringBitmap::or_many([&a, &b]), or);
    }

    #[test]
    fn prop_cardinality_conservation((a, _) in set_strategy(), (b, _) in set_strategy()) {
        let and = a.and_cardinality(&b);
        prop_assert_eq!(a.or_cardinality(&b) + and, a.len() + b.len());
        prop_assert_eq!(a.xor_cardinality(&b) + 2 * and, a.len() + b.len());
        prop_assert_eq!(a.and_not_cardinality(&b) + and, a.len());
    }

    #[test]
    fn prop_idempotence((a, _) in set_strategy()) {
        prop_assert_eq!(a.and(&a), a.clone());
        prop_assert_eq!(a.or(&a), a.clone());
        prop_assert!(a.xor(&a).is_empty());
        prop_assert!(a.and_not(&a).is_empty());
    }

    #[test]
    fn prop_encoding_is_transparent((a, m) in set_strategy()) {
        let mut optimized = a.clone();
        optimized.run_optimize();
        validate_bitmap(&optimized);
        prop_assert_eq!(&optimized, &a);
        prop_assert_eq!(optimized.to_vec(), to_vec(&m));

        let mut plain = optimized.clone();
        plain.remove_run_compression();
        prop_assert!(!plain.has_run_compression());
        validate_bitmap(&plain);
        prop_assert_eq!(&plain, &a);
    }

    #[test]
    fn prop_rank_select((a, m) in set_strategy(), query in value()) {
        for (i, &x) in m.iter().enumerate().step_by(97) {
            prop_assert_eq!(a.select(i as u32).unwrap(), x);
            prop_assert_eq!(a.rank(x), i as u64 + 1);
        }
        prop_assert_eq!(a.rank(query), m.range(..=query).count() as u64);
        prop_assert!(a.select(m.len() as u32).is_err());
    }

    #[test]
    fn prop_range_queries((a, m) in set_strategy(), r in range()) {
        let (lo, hi) = (r.start as u32, r.end);
        let expected = if r.is_empty() {
            0
        } else {
            m.range(lo..=(hi - 1) as u32).count() as u64
        };
        prop_assert_eq!(a.range_cardinality(r.clone()), expected);
        prop_assert_eq!(a.contains_range(r.clone()), expected == r.end - r.start);
    }

    #[test]
    fn prop_serialization_round_trip((mut a, _) in set_strategy(), optimize in any::<bool>()) {
        if optimize {
            a.run_optimize();
        }
        let mut bytes = Vec::new();
        a.serialize_into(&mut bytes).unwrap();
        prop_assert_eq!(bytes.len(), a.serialized_size());
        let back = RoaringBitmap::deserialize_from(&bytes[..]).unwrap();
        validate_bitmap(&back);
        prop_assert_eq!(back, a);
    }

    #[test]
    fn prop_iter_matches_model((a, m) in set_strategy(), batch in 1usize..700) {
        let back: Vec<u32> = a.iter().rev().collect();
        let expected: Vec<u32> = m.iter().rev().copied().collect();
        prop_assert_eq!(back, expected);

        let mut it = a.iter();
        let mut buf = vec![0u32; batch];
        let mut got = Vec::new();
        loop {
            let n = it.next_batch(&mut buf);
            got.extend_from_slice(&buf[..n]);
            if n < batch {
                break;
            }
        }
        prop_assert_eq!(got, to_vec(&m));
    }

    #[test]
    fn prop_navigation((a, m) in set_strategy(), x in value()) {
        prop_assert_eq!(a.next_value(x), m.range(x..).next().copied());
        prop_assert_eq!(a.previous_value(x), m.range(..=x).next_back().copied());
        prop_assert_eq!(a.next_absent_value(x), next_absent(&m, x));
        prop_assert_eq!(a.previous_absent_value(x), previous_absent(&m, x));
        for &v in m.iter().step_by(101) {
            prop_assert_eq!(a.next_value(v), Some(v));
            prop_assert_eq!(a.previous_value(v), Some(v));
            prop_assert_eq!(a.next_absent_value(v), next_absent(&m, v));
            prop_assert_eq!(a.previous_absent_value(v), previous_absent(&m, v));
        }
    }

    #[test]
    fn prop_is_subset((a, ma) in set_strategy(), (b, mb) in set_strategy()) {
        prop_assert_eq!(a.is_subset(&b), ma.is_subset(&mb));
        prop_assert!(a.and(&b).is_subset(&a));
        prop_assert!(a.is_subset(&a.or(&b)));
        prop_assert!(RoaringBitmap::new().is_subset(&a));
    }

    #[test]
    fn prop_add_offset((a, m) in set_strategy(), delta in offset()) {
        let shifted = a.add_offset(delta);
        validate_bitmap(&shifted);
        let expected: Vec<u32> = m
            .iter()
            .filter_map(|&x| u32::try_from(i64::from(x) + delta).ok())
            .collect();
        prop_assert_eq!(shifted.to_vec(), expected);
    }

    #[test]
    fn prop_or_not((a, ma) in set_strategy(), (b, mb) in set_strategy(), end in 0u64..300_000) {
        let mut expected = ma.clone();
        expected.extend((0..end as u32).filter(|x| !mb.contains(x)));
        let got = a.or_not(&b, end).unwrap();
        validate_bitmap(&got);
        prop_assert_eq!(got.to_vec(), to_vec(&expected));

        let mut x = a.clone();
        x.or_not_inplace(&b, end).unwrap();
        prop_assert_eq!(x, got);
    }

    #[test]
    fn prop_advance_to((a, m) in set_strategy(), taken in 0usize..50, min in value()) {
        let mut it = a.iter();
        for _ in it.by_ref().take(taken) {}
        it.advance_to(min);
        let expected: Vec<u32> = m.iter().skip(taken).filter(|&&x| x >= min).copied().collect();
        prop_assert_eq!(it.size_hint(), (expected.len(), Some(expected.len())));
        prop_assert_eq!(it.collect::<Vec<_>>(), expected);
    }

    #[test]
    fn prop_run_optimize_is_idempotent((mut a, _) in set_strategy()) {
        let first = a.run_optimize();
        let stats = a.statistics();
        prop_assert_eq!(a.run_optimize(), first);
        prop_assert_eq!(a.statistics(), stats);
    }
}

#[test]
fn boundary_keys_conserve_cardinality() {
    let mut b = RoaringBitmap::new();
    b.add_range(0..1 << 16).unwrap();
    b.add_range(0xFFFF_0000..UNIVERSE).unwrap();
    assert_eq!(b.len(), 2 << 16);
    b.flip(0..UNIVERSE).unwrap();
    validate_bitmap(&b);
    assert_eq!(b.len(), UNIVERSE - (2 << 16));
    assert!(!b.contains(0));
    assert!(!b.contains(u32::MAX));
    assert!(b.contains(1 << 16));
    assert!(b.contains(0xFFFE_FFFF));
}

#[test]
fn full_range_collapses_to_one_run() {
    let mut b = RoaringBitmap::new();
    for x in 0..1 << 16 {
        b.add(x);
    }
    assert!(b.run_optimize());
    let c = b.index().container_at(0);
    let Container::Run(r) = c else {
        panic!("expected a run container, got {c:?}");
    };
    assert_eq!(r.number_of_runs(), 1);
    assert!(r.is_full());
    assert_eq!(b.serialized_size(), 4 + 1 + 4 + 2 + 4);
}
