//! Per-slot bucket: either a sorted chain or a hash-keyed tree.

use crate::arena::Arena;
use crate::chain::{Chain, ChainIter};
use crate::identity::Identified;
use crate::tree::{Tree, TreeIter};
use core::borrow::Borrow;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Bucket {
    Chain(Chain),
    Tree(Tree),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BucketKind {
    Chain,
    Tree,
}

impl Bucket {
    pub(crate) fn empty<E>(arena: &mut Arena<E>) -> Self {
        Bucket::Chain(Chain::new(arena))
    }

    pub(crate) fn kind(&self) -> BucketKind {
        match self {
            Bucket::Chain(_) => BucketKind::Chain,
            Bucket::Tree(_) => BucketKind::Tree,
        }
    }

    /// Live elements in the bucket.
    pub(crate) fn len(&self) -> usize {
        match self {
            Bucket::Chain(c) => c.len(),
            Bucket::Tree(t) => t.len(),
        }
    }

    pub(crate) fn add<E: Identified>(&mut self, arena: &mut Arena<E>, elem: E, hash: u32) -> bool {
        match self {
            Bucket::Chain(c) => c.add(arena, elem, hash),
            Bucket::Tree(t) => t.add(arena, elem, hash),
        }
    }

    pub(crate) fn get<'a, E, Q>(&self, arena: &'a Arena<E>, id: &Q, hash: u32) -> Option<&'a E>
    where
        E: Identified,
        E::Id: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        match self {
            Bucket::Chain(c) => c.get(arena, id, hash),
            Bucket::Tree(t) => t.get(arena, id, hash),
        }
    }

    pub(crate) fn remove<E, Q>(&mut self, arena: &mut Arena<E>, id: &Q, hash: u32) -> Option<E>
    where
        E: Identified,
        E::Id: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        match self {
            Bucket::Chain(c) => c.remove(arena, id, hash),
            Bucket::Tree(t) => t.remove(arena, id, hash),
        }
    }

    /// Converts a chain that just reached `threshold` elements into a tree.
    pub(crate) fn treeify_at<E: Identified>(&mut self, arena: &mut Arena<E>, threshold: usize) -> bool {
        match *self {
            Bucket::Chain(c) if c.len() == threshold => {
                *self = Bucket::Tree(Tree::from_chain(c, arena));
                true
            }
            _ => false,
        }
    }

    /// Converts a tree whose live count just dropped to `threshold` back
    /// into a chain.
    pub(crate) fn untreeify_at<E: Identified>(&mut self, arena: &mut Arena<E>, threshold: usize) -> bool {
        match *self {
            Bucket::Tree(t) if t.len() == threshold => {
                *self = Bucket::Chain(t.into_chain(arena));
                true
            }
            _ => false,
        }
    }

    pub(crate) fn iter<'a, E>(&self, arena: &'a Arena<E>) -> BucketIter<'a, E> {
        match self {
            Bucket::Chain(c) => BucketIter::Chain(c.iter(arena)),
            Bucket::Tree(t) => BucketIter::Tree(t.iter(arena)),
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_valid<E>(&self, arena: &Arena<E>) {
        match self {
            Bucket::Chain(c) => c.assert_valid(arena),
            Bucket::Tree(t) => t.assert_valid(arena),
        }
    }
}

/// Linear walk of one bucket: link order for chains, thread order for trees.
pub(crate) enum BucketIter<'a, E> {
    Chain(ChainIter<'a, E>),
    Tree(TreeIter<'a, E>),
}

impl<'a, E> Iterator for BucketIter<'a, E> {
    type Item = (u32, &'a E);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        match self {
            BucketIter::Chain(it) => it.next(),
            BucketIter::Tree(it) => it.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Item;

    /// Invariant: a bucket flips to a tree only at exactly the threshold and
    /// back to a chain only at exactly the untreeify count.
    #[test]
    fn transitions_fire_at_exact_counts() {
        let mut arena = Arena::with_capacity(16);
        let mut b = Bucket::empty(&mut arena);
        for i in 0..6 {
            assert!(b.add(&mut arena, Item::new(i), i));
            assert!(!b.treeify_at(&mut arena, 7));
        }
        assert!(b.add(&mut arena, Item::new(6), 6));
        assert!(b.treeify_at(&mut arena, 7));
        assert_eq!(b.kind(), BucketKind::Tree);
        b.assert_valid(&arena);

        assert!(b.remove(&mut arena, &0, 0).is_some());
        assert!(!b.untreeify_at(&mut arena, 5));
        assert!(b.remove(&mut arena, &1, 1).is_some());
        assert!(b.untreeify_at(&mut arena, 5));
        assert_eq!(b.kind(), BucketKind::Chain);
        assert_eq!(b.len(), 5);
        b.assert_valid(&arena);
        for i in 2..7 {
            assert_eq!(b.get(&arena, &i, i).map(|e| e.id), Some(i));
        }
    }

    #[test]
    fn iter_covers_both_shapes() {
        let mut arena = Arena::with_capacity(16);
        let mut b = Bucket::empty(&mut arena);
        for i in 0..7 {
            b.add(&mut arena, Item::new(i), i % 3);
        }
        let mut before: Vec<u32> = b.iter(&arena).map(|(_, e)| e.id).collect();
        b.treeify_at(&mut arena, 7);
        let mut after: Vec<u32> = b.iter(&arena).map(|(_, e)| e.id).collect();
        before.sort();
        after.sort();
        assert_eq!(before, (0..7).collect::<Vec<_>>());
        assert_eq!(before, after);
    }
}
