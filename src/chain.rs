//! Chain bucket: a singly linked list of arena nodes kept sorted by hash.
//!
//! Every chain ends in exactly one sentinel link (no element). Removal never
//! unlinks the matched node; it absorbs its successor's payload and link, so
//! no back pointers are needed and the sentinel stays at the tail.

use crate::arena::{Arena, Link, LinkKey};
use crate::identity::Identified;
use core::borrow::Borrow;
use slotmap::SlotMap;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Chain {
    head: LinkKey,
    len: usize,
}

impl Chain {
    pub(crate) fn new<E>(arena: &mut Arena<E>) -> Self {
        Chain {
            head: arena.links.insert(Link::sentinel()),
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts `elem` before the first link with a greater hash.
    ///
    /// Returns `false` without touching the chain if an element with the
    /// same id (and therefore the same hash) is already present.
    pub(crate) fn add<E: Identified>(&mut self, arena: &mut Arena<E>, elem: E, hash: u32) -> bool {
        let links = &mut arena.links;
        let mut cur = self.head;
        loop {
            let link = &links[cur];
            match &link.elem {
                Some(_) if link.hash < hash => {}
                Some(present) if link.hash == hash => {
                    if present.id() == elem.id() {
                        return false;
                    }
                }
                _ => break,
            }
            cur = link.next.expect("occupied link has a successor");
        }
        insert_before(links, cur, elem, hash);
        self.len += 1;
        true
    }

    fn find<E, Q>(&self, arena: &Arena<E>, id: &Q, hash: u32) -> Option<LinkKey>
    where
        E: Identified,
        E::Id: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut cur = self.head;
        loop {
            let link = &arena.links[cur];
            let present = link.elem.as_ref()?;
            if link.hash > hash {
                return None;
            }
            if link.hash == hash && present.id().borrow() == id {
                return Some(cur);
            }
            cur = link.next?;
        }
    }

    pub(crate) fn get<'a, E, Q>(&self, arena: &'a Arena<E>, id: &Q, hash: u32) -> Option<&'a E>
    where
        E: Identified,
        E::Id: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let k = self.find(arena, id, hash)?;
        arena.links[k].elem.as_ref()
    }

    pub(crate) fn remove<E, Q>(&mut self, arena: &mut Arena<E>, id: &Q, hash: u32) -> Option<E>
    where
        E: Identified,
        E::Id: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let k = self.find(arena, id, hash)?;
        let removed = shift_out(&mut arena.links, k)?;
        self.len -= 1;
        Some(removed)
    }

    /// Removes and returns the first element.
    pub(crate) fn pop_front<E>(&mut self, arena: &mut Arena<E>) -> Option<E> {
        if self.len == 0 {
            return None;
        }
        let e = shift_out(&mut arena.links, self.head)?;
        self.len -= 1;
        Some(e)
    }

    /// Frees every link, sentinel included, handing each element to `f` in
    /// chain order.
    pub(crate) fn drain<E>(self, arena: &mut Arena<E>, mut f: impl FnMut(u32, E)) {
        let mut cur = Some(self.head);
        while let Some(k) = cur {
            let Some(link) = arena.links.remove(k) else { break };
            if let Some(e) = link.elem {
                f(link.hash, e);
            }
            cur = link.next;
        }
    }

    pub(crate) fn iter<'a, E>(&self, arena: &'a Arena<E>) -> ChainIter<'a, E> {
        ChainIter {
            links: &arena.links,
            cur: Some(self.head),
        }
    }

    /// Panics if ordering, the sentinel, or the cached length are off.
    #[cfg(test)]
    pub(crate) fn assert_valid<E>(&self, arena: &Arena<E>) {
        let mut count = 0;
        let mut last: Option<u32> = None;
        let mut cur = self.head;
        loop {
            let link = &arena.links[cur];
            match link.elem {
                None => {
                    assert!(link.next.is_none(), "sentinel must be the tail");
                    break;
                }
                Some(_) => {
                    if let Some(prev) = last {
                        assert!(prev <= link.hash, "chain hashes must ascend");
                    }
                    last = Some(link.hash);
                    count += 1;
                    cur = link.next.expect("occupied link has a successor");
                }
            }
        }
        assert_eq!(count, self.len, "cached chain length");
    }
}

/// Moves the payload at `at` into a fresh link right after it and stores
/// `elem` in its place. Works on the sentinel too: the fresh link becomes
/// the new sentinel.
fn insert_before<E>(links: &mut SlotMap<LinkKey, Link<E>>, at: LinkKey, elem: E, hash: u32) {
    let moved = {
        let link = &mut links[at];
        Link {
            elem: link.elem.take(),
            hash: link.hash,
            next: link.next.take(),
        }
    };
    let moved = links.insert(moved);
    let link = &mut links[at];
    link.elem = Some(elem);
    link.hash = hash;
    link.next = Some(moved);
}

/// Takes the element at `at`, then pulls the successor's payload and link
/// into `at` and frees the successor.
fn shift_out<E>(links: &mut SlotMap<LinkKey, Link<E>>, at: LinkKey) -> Option<E> {
    let next = links[at].next?;
    let succ = links.remove(next)?;
    let link = &mut links[at];
    let removed = link.elem.take();
    link.elem = succ.elem;
    link.hash = succ.hash;
    link.next = succ.next;
    removed
}

/// Walks a chain in link order, yielding `(hash, element)`.
pub(crate) struct ChainIter<'a, E> {
    links: &'a SlotMap<LinkKey, Link<E>>,
    cur: Option<LinkKey>,
}

impl<'a, E> Iterator for ChainIter<'a, E> {
    type Item = (u32, &'a E);

    fn next(&mut self) -> Option<Self::Item> {
        let links = self.links;
        let link = links.get(self.cur?)?;
        match &link.elem {
            Some(e) => {
                self.cur = link.next;
                Some((link.hash, e))
            }
            None => {
                self.cur = None;
                None
            }
        }
    }
}
