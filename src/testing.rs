#![cfg(test)]

// Fixtures shared by the in-crate unit and property tests.

use crate::identity::Identified;
use core::hash::{BuildHasher, Hasher};

/// Element whose identity is a plain integer; `tag` lets tests tell apart
/// two elements with the same id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Item {
    pub(crate) id: u32,
    pub(crate) tag: u32,
}

impl Item {
    pub(crate) fn new(id: u32) -> Self {
        Item { id, tag: 0 }
    }

    pub(crate) fn tagged(id: u32, tag: u32) -> Self {
        Item { id, tag }
    }
}

impl Identified for Item {
    type Id = u32;

    fn id(&self) -> &u32 {
        &self.id
    }
}

/// Hashes an integer to itself so tests can place ids in chosen slots.
#[derive(Clone, Copy, Default, Debug)]
pub(crate) struct RawBuildHasher;

pub(crate) struct RawHasher(u64);

impl BuildHasher for RawBuildHasher {
    type Hasher = RawHasher;
    fn build_hasher(&self) -> RawHasher {
        RawHasher(0)
    }
}

impl Hasher for RawHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | u64::from(b);
        }
    }
    fn write_u32(&mut self, n: u32) {
        self.0 = u64::from(n);
    }
    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
    fn finish(&self) -> u64 {
        self.0
    }
}

/// Hashes every id into one of `N` values, forcing heavy collisions.
#[derive(Clone, Copy, Default, Debug)]
pub(crate) struct NarrowBuildHasher<const N: u64>;

pub(crate) struct NarrowHasher<const N: u64>(u64);

impl<const N: u64> BuildHasher for NarrowBuildHasher<N> {
    type Hasher = NarrowHasher<N>;
    fn build_hasher(&self) -> NarrowHasher<N> {
        NarrowHasher(0)
    }
}

impl<const N: u64> Hasher for NarrowHasher<N> {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_mul(31).wrapping_add(u64::from(b));
        }
    }
    fn finish(&self) -> u64 {
        // Spread the few distinct values over high bits so they still share
        // slot 0 after `spread` in small tables.
        (self.0 % N) << 20
    }
}

/// Id whose raw hash lands in slot 0 of any table with capacity <= 16,
/// while staying distinct per id.
pub(crate) fn slot0_id(i: u32) -> u32 {
    i << 20
}
