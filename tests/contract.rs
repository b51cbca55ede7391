//! Every strategy must behave like `std::collections::HashMap` under any sequence of
//! puts, gets, removes and rehashes, and must survive a rehash it cannot satisfy.

use std::collections::HashMap;

use hashlab::{
    DoubleHashingMap, HashTable, LinearProbingMap, QuadraticProbingMap, SeparateChainingMap,
    TableBuilder, TableError, hashers,
    prime::is_prime,
    probe::{ProbeKind, ProbeSeq},
};
use proptest::{prelude::*, test_runner::TestCaseError};

#[derive(Debug, Clone)]
enum Op {
    Put(u16, u32),
    Get(u16),
    Remove(u16),
    Rehash(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..64u16, any::<u32>()).prop_map(|(k, v)| Op::Put(k, v)),
        2 => (0..64u16).prop_map(Op::Get),
        2 => (0..64u16).prop_map(Op::Remove),
        1 => (0..200usize).prop_map(Op::Rehash),
    ]
}

/// Replays `ops` on `table` and on a std map, comparing after every step
fn check_against_model<T: HashTable<u16, u32>>(
    mut table: T,
    ops: &[Op],
) -> Result<(), TestCaseError> {
    let mut model = HashMap::new();

    for op in ops {
        match *op {
            Op::Put(k, v) => prop_assert_eq!(table.put(k, v), Ok(model.insert(k, v))),
            Op::Get(k) => prop_assert_eq!(table.get(&k), model.get(&k)),
            Op::Remove(k) => prop_assert_eq!(table.remove(&k), model.remove(&k)),
            Op::Rehash(size) => {
                table.rehash(size).unwrap();
                prop_assert!(table.capacity() >= size);
            }
        }
        prop_assert_eq!(table.size(), model.len());
        prop_assert_eq!(table.empty(), model.is_empty());
        prop_assert!(is_prime(table.capacity()), "capacity {} is not prime", table.capacity());
    }

    let capacity = table.capacity();
    let overflowed = matches!(table.rehash(usize::MAX), Err(TableError::CapacityOverflow { .. }));
    prop_assert!(overflowed);
    prop_assert_eq!(table.capacity(), capacity);
    prop_assert_eq!(table.size(), model.len());
    for (k, v) in &model {
        prop_assert_eq!(table.get(k), Some(v));
    }

    let mut keys = table.keys();
    let mut values = table.values();
    prop_assert_eq!(keys.len(), table.size());
    prop_assert_eq!(values.len(), table.size());

    let mut expected_keys: Vec<_> = model.keys().copied().collect();
    let mut expected_values: Vec<_> = model.values().copied().collect();
    keys.sort_unstable();
    values.sort_unstable();
    expected_keys.sort_unstable();
    expected_values.sort_unstable();
    prop_assert_eq!(keys, expected_keys);
    prop_assert_eq!(values, expected_values);

    table.clear();
    prop_assert!(table.empty());
    for k in model.keys() {
        prop_assert!(!table.contains_key(k));
    }
    Ok(())
}

fn identity(k: &u16) -> usize {
    usize::from(*k)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn chaining_matches_std(ops in prop::collection::vec(op(), 0..300)) {
        check_against_model(SeparateChainingMap::new(), &ops)?;
        check_against_model(TableBuilder::new(2).primary(identity).build_chaining().unwrap(), &ops)?;
    }

    #[test]
    fn linear_probing_matches_std(ops in prop::collection::vec(op(), 0..300)) {
        check_against_model(LinearProbingMap::new(), &ops)?;
        check_against_model(TableBuilder::new(2).primary(identity).build_linear().unwrap(), &ops)?;
    }

    #[test]
    fn quadratic_probing_matches_std(ops in prop::collection::vec(op(), 0..300)) {
        check_against_model(QuadraticProbingMap::new(), &ops)?;
        check_against_model(TableBuilder::new(2).primary(identity).build_quadratic().unwrap(), &ops)?;
    }

    #[test]
    fn double_hashing_matches_std(ops in prop::collection::vec(op(), 0..300)) {
        check_against_model(DoubleHashingMap::new(), &ops)?;
        let table = TableBuilder::new(2)
            .primary(identity)
            .step(|k: &u16| hashers::step(hashers::mod_hash(u64::from(*k), 5)))
            .build_double_hashing()
            .unwrap();
        check_against_model(table, &ops)?;
    }

    #[test]
    fn colliding_keys_match_std(ops in prop::collection::vec(op(), 0..120)) {
        let zero = |_: &u16| 0;
        check_against_model(TableBuilder::new(3).primary(zero).build_chaining().unwrap(), &ops)?;
        check_against_model(TableBuilder::new(3).primary(zero).build_linear().unwrap(), &ops)?;
        check_against_model(TableBuilder::new(3).primary(zero).build_quadratic().unwrap(), &ops)?;
        let table = TableBuilder::new(3)
            .primary(zero)
            .step(|_: &u16| hashers::step(1))
            .build_double_hashing()
            .unwrap();
        check_against_model(table, &ops)?;
    }

    #[test]
    fn probe_sequences_are_bounded(hash in any::<usize>(), capacity in 0..500usize, step in any::<usize>()) {
        for kind in [ProbeKind::Linear, ProbeKind::Quadratic, ProbeKind::Double { step }] {
            prop_assert!(ProbeSeq::new(hash, capacity, kind).count() <= capacity + 1);
        }
    }
}

#[test]
fn linear_probing_places_collisions_in_order() {
    let mut map = TableBuilder::new(7)
        .primary(|k: &u64| usize::try_from(*k).unwrap())
        .build_linear()
        .unwrap();
    for key in [1u64, 8, 15] {
        map.put(key, key).unwrap();
    }

    assert_eq!(map.slot_of(&1), Some(1));
    assert_eq!(map.slot_of(&8), Some(2));
    assert_eq!(map.slot_of(&15), Some(3));
    assert_eq!(map.get(&15), Some(&15));

    map.remove(&8);
    assert_eq!(map.get(&15), Some(&15));
}

#[test]
fn chaining_resizes_once_to_next_prime() {
    let mut map = TableBuilder::new(5)
        .primary(|k: &u64| usize::try_from(*k).unwrap())
        .build_chaining()
        .unwrap();
    let mut capacities = vec![map.capacity()];
    for key in 0..6u64 {
        map.put(key, key.to_string()).unwrap();
        if capacities.last() != Some(&map.capacity()) {
            capacities.push(map.capacity());
        }
    }

    assert_eq!(capacities, [5, 11]);
    for key in 0..6u64 {
        assert_eq!(map.get(&key), Some(&key.to_string()));
    }
}

#[test]
fn every_table_reports_its_stats() {
    let mut tables: Vec<Box<dyn HashTable<u64, u64>>> = vec![
        Box::new(SeparateChainingMap::<u64, u64>::new()),
        Box::new(LinearProbingMap::<u64, u64>::new()),
        Box::new(QuadraticProbingMap::<u64, u64>::new()),
        Box::new(DoubleHashingMap::<u64, u64>::new()),
        Box::new(HashMap::<u64, u64>::new()),
    ];

    let mut names = Vec::new();
    for table in &mut tables {
        for key in 0..1_000 {
            table.put(key, key).unwrap();
        }
        let stats = table.stats();
        assert_eq!(stats.len, 1_000);
        assert_eq!(stats.capacity, table.capacity());
        assert!(stats.load_factor > 0.0);
        assert!(stats.memory_bytes > 0);
        assert_eq!(stats.max_bucket_depth.is_some(), stats.name == "sc");
        assert!(stats.to_string().starts_with(&format!("[{}] map info:", stats.name)));
        names.push(stats.name);
    }

    assert_eq!(names, ["sc", "lp", "qp", "dh", "stl"]);
}
