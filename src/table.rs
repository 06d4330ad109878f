//! Table: slot array, sizing policy, and bucket shape transitions.
//!
//! Every public set operation funnels through here. A mutation is delegated
//! to the bucket at `spread(hash) & mod_capacity`; the table then adjusts
//! `size` and either resizes the whole table or converts the mutated
//! bucket, never both in the same operation.

use crate::arena::Arena;
use crate::bucket::{Bucket, BucketIter, BucketKind};
use crate::config::{Config, MAX_CAPACITY, SHRINK_FLOOR};
use crate::identity::Identified;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;

/// Mixes the high half of the hash into the low half before masking.
#[inline]
pub(crate) fn spread(hash: u32) -> u32 {
    hash ^ (hash >> 16)
}

pub(crate) struct Table<E, S> {
    hasher: S,
    arena: Arena<E>,
    buckets: Vec<Bucket>,
    size: usize,
    capacity: usize,
    mod_capacity: usize,
    expansion_threshold: usize,
    shrink_threshold: usize,
    treeify: usize,
    untreeify: usize,
}

/// Point-in-time shape of a set, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetStats {
    pub len: usize,
    pub capacity: usize,
    pub chain_buckets: usize,
    pub tree_buckets: usize,
    /// Live elements in the fullest bucket.
    pub longest_bucket: usize,
    /// Allocated arena nodes, sentinels and cleared tree nodes included.
    pub nodes: usize,
}

impl<E, S> Table<E, S>
where
    E: Identified,
    S: BuildHasher,
{
    pub(crate) fn new(config: &Config, hasher: S) -> Self {
        let capacity = config.capacity();
        let mut table = Table {
            hasher,
            arena: Arena::with_capacity(capacity),
            buckets: Vec::new(),
            size: 0,
            capacity: 0,
            mod_capacity: 0,
            expansion_threshold: 0,
            shrink_threshold: 0,
            treeify: config.treeify_threshold(),
            untreeify: config.untreeify_threshold(),
        };
        table.set_capacity(capacity);
        table.reset_buckets();
        table
    }

    pub(crate) fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Folds the 64-bit hash of `q` to 32 bits.
    #[inline]
    pub(crate) fn hash_of<Q>(&self, q: &Q) -> u32
    where
        Q: ?Sized + Hash,
    {
        let h = self.hasher.hash_one(q);
        (h ^ (h >> 32)) as u32
    }

    #[inline]
    fn slot_of(&self, hash: u32) -> usize {
        spread(hash) as usize & self.mod_capacity
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn get<Q>(&self, id: &Q) -> Option<&E>
    where
        E::Id: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_of(id);
        self.buckets[self.slot_of(hash)].get(&self.arena, id, hash)
    }

    /// Returns `false` if an element with the same id is already stored.
    pub(crate) fn insert(&mut self, elem: E) -> bool {
        let hash = self.hash_of(elem.id());
        let slot = self.slot_of(hash);
        if !self.buckets[slot].add(&mut self.arena, elem, hash) {
            return false;
        }
        self.size += 1;
        if self.size > self.expansion_threshold && self.capacity < MAX_CAPACITY {
            self.resize(self.capacity << 1);
        } else {
            self.buckets[slot].treeify_at(&mut self.arena, self.treeify);
        }
        true
    }

    pub(crate) fn remove<Q>(&mut self, id: &Q) -> Option<E>
    where
        E::Id: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_of(id);
        let slot = self.slot_of(hash);
        let removed = self.buckets[slot].remove(&mut self.arena, id, hash)?;
        self.size -= 1;
        if self.size < self.shrink_threshold && self.capacity > SHRINK_FLOOR {
            self.resize(shrunk(self.capacity));
        } else {
            self.buckets[slot].untreeify_at(&mut self.arena, self.untreeify);
        }
        Some(removed)
    }

    /// Drops every element but keeps the current capacity.
    pub(crate) fn clear(&mut self) {
        self.size = 0;
        self.arena.clear();
        self.reset_buckets();
    }

    /// Keeps the elements `keep` accepts; returns how many were dropped.
    ///
    /// `keep` sees every element before anything is moved, so a panicking
    /// predicate leaves the table untouched. Rejected elements are dropped
    /// only after the table is whole again. The table is rebuilt once, at the
    /// capacity repeated single removals would have shrunk it to.
    pub(crate) fn retain(&mut self, keep: impl FnMut(&E) -> bool) -> usize {
        let (links, branches) = self.arena.rejected_by(keep);
        let mut dropped = Vec::with_capacity(links.len() + branches.len());
        for k in links {
            dropped.extend(self.arena.links[k].elem.take());
        }
        for k in branches {
            dropped.extend(self.arena.branches[k].elem.take());
        }
        let kept: Vec<(u32, E)> = self.arena.drain_elements().collect();
        let mut capacity = self.capacity;
        while kept.len() < capacity >> 2 && capacity > SHRINK_FLOOR {
            capacity = shrunk(capacity);
        }
        self.rebuild(capacity, kept);
        let count = dropped.len();
        drop(dropped);
        count
    }

    fn resize(&mut self, capacity: usize) {
        let items: Vec<(u32, E)> = self.arena.drain_elements().collect();
        debug_assert_eq!(items.len(), self.size);
        self.rebuild(capacity, items);
    }

    /// Replaces the slot array with `capacity` fresh buckets and places
    /// `items` into them.
    fn rebuild(&mut self, capacity: usize, items: Vec<(u32, E)>) {
        self.arena = Arena::with_capacity(capacity + items.len());
        self.set_capacity(capacity);
        self.reset_buckets();
        self.size = items.len();
        for (hash, elem) in items {
            let slot = self.slot_of(hash);
            let bucket = &mut self.buckets[slot];
            let added = bucket.add(&mut self.arena, elem, hash);
            debug_assert!(added, "rehash met a duplicate id");
            // Unlike a chain-only rehash, long slots come out as trees.
            bucket.treeify_at(&mut self.arena, self.treeify);
        }
    }

    fn set_capacity(&mut self, capacity: usize) {
        debug_assert!(capacity.is_power_of_two());
        self.capacity = capacity;
        self.mod_capacity = capacity - 1;
        self.expansion_threshold = capacity;
        self.shrink_threshold = capacity >> 2;
    }

    fn reset_buckets(&mut self) {
        let arena = &mut self.arena;
        self.buckets = (0..self.capacity).map(|_| Bucket::empty(arena)).collect();
    }

    pub(crate) fn iter(&self) -> Iter<'_, E> {
        Iter {
            arena: &self.arena,
            buckets: self.buckets.iter(),
            current: None,
            remaining: self.size,
        }
    }

    pub(crate) fn stats(&self) -> SetStats {
        let mut stats = SetStats {
            len: self.size,
            capacity: self.capacity,
            chain_buckets: 0,
            tree_buckets: 0,
            longest_bucket: 0,
            nodes: self.arena.node_count(),
        };
        for b in &self.buckets {
            match b.kind() {
                BucketKind::Chain => stats.chain_buckets += 1,
                BucketKind::Tree => stats.tree_buckets += 1,
            }
            stats.longest_bucket = stats.longest_bucket.max(b.len());
        }
        stats
    }

    #[cfg(test)]
    pub(crate) fn bucket_kind_of<Q>(&self, id: &Q) -> BucketKind
    where
        Q: ?Sized + Hash,
    {
        self.buckets[self.slot_of(self.hash_of(id))].kind()
    }

    /// Panics if any structural invariant is broken.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        assert!(self.capacity.is_power_of_two());
        assert!(self.capacity >= crate::config::MIN_CAPACITY);
        assert_eq!(self.mod_capacity, self.capacity - 1);
        assert_eq!(self.buckets.len(), self.capacity);
        assert_eq!(self.expansion_threshold, self.capacity);
        assert_eq!(self.shrink_threshold, self.capacity >> 2);

        let mut total = 0;
        for (slot, b) in self.buckets.iter().enumerate() {
            b.assert_valid(&self.arena);
            match b.kind() {
                BucketKind::Chain => assert!(b.len() < self.treeify, "chain at or past treeify"),
                BucketKind::Tree => assert!(b.len() > self.untreeify, "tree at or below untreeify"),
            }
            for (hash, e) in b.iter(&self.arena) {
                assert_eq!(hash, self.hash_of(e.id()), "cached hash is stale");
                assert_eq!(self.slot_of(hash), slot, "element in wrong slot");
                total += 1;
            }
        }
        assert_eq!(total, self.size);
    }
}

fn shrunk(capacity: usize) -> usize {
    (capacity >> 2).max(SHRINK_FLOOR)
}

/// Iterator over a set's elements in slot order.
///
/// Within a slot, chain buckets yield in hash order and tree buckets in
/// thread order. The order is otherwise unspecified.
pub struct Iter<'a, E> {
    arena: &'a Arena<E>,
    buckets: core::slice::Iter<'a, Bucket>,
    current: Option<BucketIter<'a, E>>,
    remaining: usize,
}

impl<'a, E> Iterator for Iter<'a, E> {
    type Item = &'a E;

    fn next(&mut self) -> Option<&'a E> {
        loop {
            if let Some(it) = &mut self.current {
                if let Some((_, e)) = it.next() {
                    self.remaining -= 1;
                    return Some(e);
                }
            }
            let b = self.buckets.next()?;
            self.current = Some(b.iter(self.arena));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, E> ExactSizeIterator for Iter<'a, E> {}
impl<'a, E> FusedIterator for Iter<'a, E> {}
