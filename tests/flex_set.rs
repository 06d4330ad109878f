use flex_set::{Config, ConfigError, ExportError, FlexSet, IdWrapper, Identified};
use std::collections::BTreeSet;
use std::hash::{BuildHasher, Hash, Hasher};

#[derive(Clone, Debug, PartialEq)]
struct Widget {
    id: u32,
    name: String,
}

impl Widget {
    fn new(id: u32) -> Self {
        Widget {
            id,
            name: format!("w{id}"),
        }
    }
}

impl Identified for Widget {
    type Id = u32;
    fn id(&self) -> &u32 {
        &self.id
    }
}

// Hashes a u32 to itself so ids can be steered into chosen slots.
#[derive(Clone, Copy, Default)]
struct IdentityBuildHasher;
struct IdentityHasher(u64);
impl BuildHasher for IdentityBuildHasher {
    type Hasher = IdentityHasher;
    fn build_hasher(&self) -> IdentityHasher {
        IdentityHasher(0)
    }
}
impl Hasher for IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | u64::from(b);
        }
    }
    fn write_u32(&mut self, n: u32) {
        self.0 = u64::from(n);
    }
    fn finish(&self) -> u64 {
        self.0
    }
}

// Lands in slot 0 of a 16-slot table while keeping distinct hashes.
fn slot0(i: u32) -> u32 {
    i << 20
}

fn steered() -> FlexSet<Widget, IdentityBuildHasher> {
    FlexSet::with_hasher(IdentityBuildHasher)
}

#[test]
fn seven_collisions_become_a_tree() {
    let mut s = steered();
    for i in 0..7 {
        assert!(s.insert(Widget::new(slot0(i))));
    }
    let stats = s.stats();
    assert_eq!(stats.capacity, 16);
    assert_eq!(stats.tree_buckets, 1);
    assert_eq!(stats.longest_bucket, 7);
    for i in 0..7 {
        let w = s.get_by_id(&slot0(i)).expect("present");
        assert_eq!(w.name, format!("w{}", slot0(i)));
    }
}

#[test]
fn tree_reverts_to_chain_at_five() {
    let mut s = steered();
    for i in 0..7 {
        s.insert(Widget::new(slot0(i)));
    }
    assert_eq!(s.remove_by_id(&slot0(0)).map(|w| w.id), Some(slot0(0)));
    assert_eq!(s.stats().tree_buckets, 1);
    assert!(s.remove(&Widget::new(slot0(6))));
    assert_eq!(s.stats().tree_buckets, 0);
    for i in 1..6 {
        assert!(s.contains_by_id(&slot0(i)));
    }
    assert!(!s.contains_by_id(&slot0(0)));
    assert!(!s.contains_by_id(&slot0(6)));
}

#[test]
fn crossing_capacity_doubles_it() {
    let mut s = FlexSet::new();
    for i in 0..16u32 {
        s.insert(Widget::new(i));
    }
    assert_eq!(s.capacity(), 16);
    s.insert(Widget::new(16));
    assert_eq!(s.capacity(), 32);
    for i in 0..17u32 {
        assert_eq!(s.get_by_id(&i).map(|w| w.id), Some(i));
    }
}

#[test]
fn insert_then_remove_in_order_empties() {
    let mut s = FlexSet::new();
    for i in 0..200u32 {
        assert!(s.insert(Widget::new(i)));
    }
    for i in 0..200u32 {
        assert!(s.remove_by_id(&i).is_some());
    }
    assert_eq!(s.len(), 0);
    assert!(s.is_empty());
    assert!((0..200u32).all(|i| !s.contains_by_id(&i)));
    assert_eq!(s.capacity(), 64);
}

// Different ids, same hash.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Clashing(u32);
impl Hash for Clashing {
    fn hash<H: Hasher>(&self, state: &mut H) {
        0u32.hash(state);
    }
}
impl Identified for Clashing {
    type Id = Clashing;
    fn id(&self) -> &Clashing {
        self
    }
}

#[test]
fn same_hash_different_identity() {
    let mut s = FlexSet::new();
    assert!(s.insert(Clashing(1)));
    assert!(s.insert(Clashing(2)));
    assert_eq!(s.get_by_id(&Clashing(1)), Some(&Clashing(1)));
    assert_eq!(s.get_by_id(&Clashing(2)), Some(&Clashing(2)));
    assert_eq!(s.remove_by_id(&Clashing(1)), Some(Clashing(1)));
    assert!(s.contains(&Clashing(2)));
    assert!(!s.contains(&Clashing(1)));
    assert_eq!(s.remove_by_id(&Clashing(2)), Some(Clashing(2)));
    assert!(s.is_empty());
}

#[test]
fn many_same_hash_elements_stay_reachable() {
    let mut s = FlexSet::new();
    for i in 0..500 {
        assert!(s.insert(Clashing(i)));
    }
    assert_eq!(s.len(), 500);
    assert_eq!(s.stats().tree_buckets, 1);
    for i in (0..500).step_by(2) {
        assert!(s.remove(&Clashing(i)));
    }
    for i in 0..500 {
        assert_eq!(s.contains(&Clashing(i)), i % 2 == 1);
    }
}

#[test]
fn rejected_duplicate_keeps_original() {
    let mut s = FlexSet::new();
    s.insert(IdWrapper::new("k".to_string(), 1));
    assert!(!s.insert(IdWrapper::new("k".to_string(), 2)));
    assert_eq!(s.get_by_id("k").map(|w| *w.value()), Some(1));
    assert_eq!(s.len(), 1);
}

#[test]
fn invalid_thresholds_are_rejected() {
    assert_eq!(
        Config::new().with_thresholds(1, 0).unwrap_err(),
        ConfigError::InvalidThresholds { treeify: 1, untreeify: 0 }
    );
    assert_eq!(
        Config::new().with_thresholds(6, 6).unwrap_err(),
        ConfigError::InvalidThresholds { treeify: 6, untreeify: 6 }
    );
    assert!(Config::new().with_thresholds(8, 2).is_ok());
}

#[test]
fn export_error_reports_sizes() {
    let s: FlexSet<Widget> = (0..4).map(Widget::new).collect();
    let mut dest = vec![Widget::new(99); 3];
    let err = s.clone_into_slice(&mut dest).unwrap_err();
    assert_eq!(err, ExportError::DestinationTooSmall { required: 4, provided: 3 });
    assert_eq!(err.to_string(), "cannot fit 4 set elements into a slice of length 3");
}

#[test]
fn collect_extend_and_iterate() {
    let mut s: FlexSet<Widget> = (0..10).map(Widget::new).collect();
    s.extend((5..15).map(Widget::new));
    assert_eq!(s.len(), 15);
    let ids: BTreeSet<u32> = (&s).into_iter().map(|w| w.id).collect();
    assert_eq!(ids, (0..15).collect());
    let mut count = 0;
    for _ in &s {
        count += 1;
    }
    assert_eq!(count, 15);
}

#[test]
fn map_round_trip() {
    let s = FlexSet::from_map([(1u8, "one"), (2, "two")]);
    let m = s.to_map();
    assert_eq!(m.get(&1u8).map(|w| *w.value()), Some("one"));
    let ids = s.id_set();
    assert_eq!(ids.len(), 2);
    let mut pairs: Vec<(u8, &str)> = s.to_vec().into_iter().map(IdWrapper::into_parts).collect();
    pairs.sort();
    assert_eq!(pairs, vec![(1, "one"), (2, "two")]);
}

#[test]
fn retain_shrinks_once() {
    let mut s: FlexSet<Widget> = (0..1000).map(Widget::new).collect();
    assert_eq!(s.capacity(), 1024);
    assert!(s.retain(|w| w.id < 10));
    assert_eq!(s.len(), 10);
    assert_eq!(s.capacity(), 64);
    assert!((0..10).all(|i| s.contains_by_id(&i)));
}

#[test]
fn panicking_predicate_keeps_the_set_usable() {
    let mut s: FlexSet<Widget> = (0..10).map(Widget::new).collect();
    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        s.retain(|w| if w.id == 5 { panic!("bad predicate") } else { true })
    }));
    assert!(res.is_err());
    assert_eq!(s.len(), 10);
    assert_eq!(s.get_by_id(&1).map(|w| w.id), Some(1));
    assert!(s.insert(Widget::new(10)));
    assert!(s.retain(|w| w.id % 2 == 0));
    assert_eq!(s.len(), 6);
}

#[test]
fn sets_can_be_shared_behind_a_mutex() {
    use std::sync::{Arc, Mutex};
    let shared = Arc::new(Mutex::new(FlexSet::<Widget>::new()));
    let handles: Vec<_> = (0..4u32)
        .map(|t| {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                for i in 0..50 {
                    shared.lock().unwrap().insert(Widget::new(t * 1000 + i));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(shared.lock().unwrap().len(), 200);
}
