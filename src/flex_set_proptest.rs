#![cfg(test)]

// Property tests for FlexSet kept inside the crate so they can check the
// table's structural invariants after every operation.

use crate::config::Config;
use crate::flex_set::FlexSet;
use crate::identity::IdWrapper;
use crate::testing::NarrowBuildHasher;
use core::hash::BuildHasher;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

type Entry = IdWrapper<Key, i32>;

// Pool-indexed operations so failures shrink toward earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    RemoveById(usize),
    Remove(usize),
    Get(usize),
    Contains(String),
    RetainEven,
    RemoveAllPrefix(usize),
    Clear,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{1,4}", 1..=120).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            3 => idx.clone().prop_map(Op::RemoveById),
            2 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Get),
            1 => prop_oneof![contains_pool.prop_map(|s: String| s), "[a-z]{0,4}".prop_map(|s| s)]
                .prop_map(Op::Contains),
            1 => Just(Op::RetainEven),
            1 => idx.clone().prop_map(Op::RemoveAllPrefix),
            1 => Just(Op::Clear),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..250).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_scenario<S: BuildHasher>(
    mut sut: FlexSet<Entry, S>,
    pool: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = key_from(pool, i);
                let already = model.contains_key(&k);
                let added = sut.insert(IdWrapper::new(k.clone(), v));
                prop_assert_eq!(added, !already, "insert result must reflect prior presence");
                model.entry(k).or_insert(v);
            }
            Op::RemoveById(i) => {
                let k = key_from(pool, i);
                let got = sut.remove_by_id(&k).map(|e| *e.value());
                prop_assert_eq!(got, model.remove(&k));
            }
            Op::Remove(i) => {
                // The value differs from the stored one; removal is by id.
                let k = key_from(pool, i);
                let same_id = IdWrapper::new(k.clone(), i32::MIN);
                prop_assert_eq!(sut.remove(&same_id), model.remove(&k).is_some());
            }
            Op::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get_by_id(&k).map(|e| *e.value()), model.get(&k).copied());
            }
            Op::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_by_id(s.as_str()), has_model);
            }
            Op::RetainEven => {
                let before = model.len();
                model.retain(|_, v| *v % 2 == 0);
                prop_assert_eq!(sut.retain(|e| *e.value() % 2 == 0), model.len() != before);
            }
            Op::RemoveAllPrefix(n) => {
                let ids: Vec<Key> = (0..n).map(|i| key_from(pool, i)).collect();
                let mut changed = false;
                for k in &ids {
                    changed |= model.remove(k).is_some();
                }
                prop_assert_eq!(sut.remove_all_by_id(&ids), changed);
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
            Op::Iterate => {
                let s_keys: BTreeSet<_> = sut.iter().map(|e| e.key().clone()).collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                prop_assert_eq!(sut.iter().len(), model.len());
            }
        }

        sut.check_invariants();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap.
// - Duplicate ids are rejected and the first value is kept.
// - Lookups and removals by id or by element agree with the model.
// - After every op, chains stay under the treeify threshold, trees stay above
//   the untreeify threshold, cached hashes are current, and each element sits
//   in the slot its hash selects.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(FlexSet::new(), &pool, ops)?;
    }

    // Three hash values for every key: buckets live mostly as trees with
    // long blocks.
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(FlexSet::with_hasher(NarrowBuildHasher::<3>), &pool, ops)?;
    }

    // Tight thresholds so chains and trees flip back and forth often.
    #[test]
    fn prop_state_machine_tight_thresholds((pool, ops) in arb_scenario()) {
        let config = Config::new().with_thresholds(2, 1).unwrap();
        run_scenario(FlexSet::with_config_and_hasher(config, NarrowBuildHasher::<17>), &pool, ops)?;
    }
}
