//! Tree bucket: a binary search tree of arena nodes keyed by hash.
//!
//! Hashes are not unique, so each node owns a `block` chain holding the
//! other elements with exactly its hash. Nodes are also threaded through
//! `next` so the bucket can be walked linearly without a stack.
//!
//! Removal only clears a node's payload (refilling it from the block when
//! possible); cleared nodes are dropped the next time the tree is rebuilt.
//! A rebuild happens when an insertion had to descend more than
//! `log2(nodes) + REBALANCE_SLACK` levels.

use crate::arena::{Arena, Branch, BranchKey};
use crate::chain::{Chain, ChainIter};
use crate::config::REBALANCE_SLACK;
use crate::identity::Identified;
use core::borrow::Borrow;
use core::cmp::Ordering;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Tree {
    root: Option<BranchKey>,
    /// Head of the `next` thread.
    first: Option<BranchKey>,
    /// Topological node count, cleared nodes included.
    nodes: usize,
    /// Live elements, blocks included.
    len: usize,
}

impl Tree {
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn node_count(&self) -> usize {
        self.nodes
    }

    /// Converts a sorted chain into a balanced tree: one node per distinct
    /// hash, later elements of an equal-hash run go to that node's block.
    pub(crate) fn from_chain<E: Identified>(chain: Chain, arena: &mut Arena<E>) -> Tree {
        let len = chain.len();
        let mut items = Vec::with_capacity(len);
        chain.drain(arena, |hash, e| items.push((hash, e)));

        let mut keys: Vec<BranchKey> = Vec::with_capacity(len);
        for (hash, e) in items {
            if let Some(&last) = keys.last() {
                if arena.branches[last].hash == hash {
                    let mut block = arena.branches[last].block;
                    let added = block.add(arena, e, hash);
                    debug_assert!(added, "chain held a duplicate id");
                    arena.branches[last].block = block;
                    continue;
                }
            }
            keys.push(new_branch(arena, e, hash));
        }

        let root = build(arena, &keys);
        thread(arena, &keys);
        Tree {
            root,
            first: keys.first().copied(),
            nodes: keys.len(),
            len,
        }
    }

    /// Frees every node and re-adds the live elements to a fresh chain.
    pub(crate) fn into_chain<E: Identified>(self, arena: &mut Arena<E>) -> Chain {
        let mut items = Vec::with_capacity(self.len);
        self.drain(arena, |hash, e| items.push((hash, e)));
        let mut chain = Chain::new(arena);
        for (hash, e) in items {
            let added = chain.add(arena, e, hash);
            debug_assert!(added, "tree held a duplicate id");
        }
        chain
    }

    /// Frees every node in thread order, handing live elements to `f`.
    pub(crate) fn drain<E>(self, arena: &mut Arena<E>, mut f: impl FnMut(u32, E)) {
        let mut cur = self.first;
        while let Some(k) = cur {
            let Some(node) = arena.branches.remove(k) else { break };
            cur = node.next;
            if let Some(e) = node.elem {
                f(node.hash, e);
            }
            node.block.drain(arena, &mut f);
        }
    }

    pub(crate) fn add<E: Identified>(&mut self, arena: &mut Arena<E>, elem: E, hash: u32) -> bool {
        let mut depth = 0;
        let mut parent: Option<(BranchKey, Ordering)> = None;
        let mut cur = self.root;
        while let Some(k) = cur {
            depth += 1;
            let node = &arena.branches[k];
            match hash.cmp(&node.hash) {
                Ordering::Less => cur = node.left,
                Ordering::Greater => cur = node.right,
                Ordering::Equal => {
                    if !add_at(arena, k, elem, hash) {
                        return false;
                    }
                    self.len += 1;
                    self.rebalance_if_deep(arena, depth);
                    return true;
                }
            }
            parent = Some((k, hash.cmp(&node.hash)));
        }

        depth += 1;
        let k = new_branch(arena, elem, hash);
        match parent {
            Some((p, side)) => {
                // Thread the new node right after its parent.
                let after = {
                    let pn = &mut arena.branches[p];
                    if side == Ordering::Less {
                        pn.left = Some(k);
                    } else {
                        pn.right = Some(k);
                    }
                    pn.next.replace(k)
                };
                arena.branches[k].next = after;
            }
            None => {
                arena.branches[k].next = self.first;
                self.root = Some(k);
                self.first = Some(k);
            }
        }
        self.nodes += 1;
        self.len += 1;
        self.rebalance_if_deep(arena, depth);
        true
    }

    fn find_node<E>(&self, arena: &Arena<E>, hash: u32) -> Option<BranchKey> {
        let mut cur = self.root;
        while let Some(k) = cur {
            let node = &arena.branches[k];
            cur = match hash.cmp(&node.hash) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(k),
            };
        }
        None
    }

    pub(crate) fn get<'a, E, Q>(&self, arena: &'a Arena<E>, id: &Q, hash: u32) -> Option<&'a E>
    where
        E: Identified,
        E::Id: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let node = &arena.branches[self.find_node(arena, hash)?];
        match &node.elem {
            Some(e) if e.id().borrow() == id => Some(e),
            _ => node.block.get(arena, id, hash),
        }
    }

    pub(crate) fn remove<E, Q>(&mut self, arena: &mut Arena<E>, id: &Q, hash: u32) -> Option<E>
    where
        E: Identified,
        E::Id: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let k = self.find_node(arena, hash)?;
        let own = matches!(&arena.branches[k].elem, Some(e) if e.id().borrow() == id);
        let mut block = arena.branches[k].block;
        let removed = if own {
            // Keep the hash key occupied while same-hash elements remain.
            let refill = block.pop_front(arena);
            core::mem::replace(&mut arena.branches[k].elem, refill)
        } else {
            block.remove(arena, id, hash)
        };
        arena.branches[k].block = block;
        let removed = removed?;
        self.len -= 1;
        Some(removed)
    }

    fn rebalance_if_deep<E>(&mut self, arena: &mut Arena<E>, depth: usize) {
        let bits = (usize::BITS - self.node_count().leading_zeros()) as usize;
        if bits + REBALANCE_SLACK < depth {
            self.rebuild(arena);
        }
    }

    /// Rebuilds the tree balanced over its occupied nodes, freeing cleared
    /// ones. Blocks move with their nodes untouched.
    pub(crate) fn rebuild<E>(&mut self, arena: &mut Arena<E>) {
        let mut keep = Vec::with_capacity(self.nodes);
        let mut cleared = Vec::new();
        let mut stack = Vec::new();
        let mut cur = self.root;
        loop {
            while let Some(k) = cur {
                stack.push(k);
                cur = arena.branches[k].left;
            }
            let Some(k) = stack.pop() else { break };
            let node = &arena.branches[k];
            cur = node.right;
            if node.elem.is_some() {
                keep.push(k);
            } else {
                cleared.push(k);
            }
        }

        for k in cleared {
            if let Some(node) = arena.branches.remove(k) {
                debug_assert!(node.block.is_empty(), "cleared node kept a block");
                node.block.drain(arena, |_, _| {});
            }
        }

        self.root = build(arena, &keep);
        thread(arena, &keep);
        self.first = keep.first().copied();
        self.nodes = keep.len();
    }

    pub(crate) fn iter<'a, E>(&self, arena: &'a Arena<E>) -> TreeIter<'a, E> {
        TreeIter {
            arena,
            node: self.first,
            block: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn height<E>(&self, arena: &Arena<E>) -> usize {
        fn go<E>(arena: &Arena<E>, k: Option<BranchKey>) -> usize {
            match k {
                None => 0,
                Some(k) => {
                    let n = &arena.branches[k];
                    1 + go(arena, n.left).max(go(arena, n.right))
                }
            }
        }
        go(arena, self.root)
    }

    /// Panics if ordering, blocks, the thread, or cached counts are off.
    #[cfg(test)]
    pub(crate) fn assert_valid<E>(&self, arena: &Arena<E>) {
        fn walk<E>(arena: &Arena<E>, k: Option<BranchKey>, out: &mut Vec<BranchKey>) {
            if let Some(k) = k {
                let n = &arena.branches[k];
                walk(arena, n.left, out);
                out.push(k);
                walk(arena, n.right, out);
            }
        }
        let mut in_order = Vec::new();
        walk(arena, self.root, &mut in_order);
        assert_eq!(in_order.len(), self.nodes, "cached node count");

        let mut live = 0;
        for w in in_order.windows(2) {
            assert!(
                arena.branches[w[0]].hash < arena.branches[w[1]].hash,
                "tree hashes must strictly ascend in order"
            );
        }
        for &k in &in_order {
            let n = &arena.branches[k];
            n.block.assert_valid(arena);
            assert!(n.block.iter(arena).all(|(h, _)| h == n.hash), "block hash mismatch");
            if n.elem.is_none() {
                assert!(n.block.is_empty(), "cleared node kept a block");
            } else {
                live += 1;
            }
            live += n.block.len();
        }
        assert_eq!(live, self.len, "cached tree length");

        let mut threaded = Vec::new();
        let mut cur = self.first;
        while let Some(k) = cur {
            threaded.push(k);
            cur = arena.branches[k].next;
        }
        let mut a = threaded.clone();
        let mut b = in_order.clone();
        a.sort();
        b.sort();
        assert_eq!(a, b, "thread must visit every node once");
        assert_eq!(threaded.len(), self.nodes);
    }
}

fn new_branch<E>(arena: &mut Arena<E>, elem: E, hash: u32) -> BranchKey {
    let block = Chain::new(arena);
    arena.branches.insert(Branch {
        elem: Some(elem),
        hash,
        left: None,
        right: None,
        next: None,
        block,
    })
}

/// Stores `elem` at node `k`, whose hash equals `hash`.
fn add_at<E: Identified>(arena: &mut Arena<E>, k: BranchKey, elem: E, hash: u32) -> bool {
    let same = arena.branches[k]
        .elem
        .as_ref()
        .map(|present| present.id() == elem.id());
    match same {
        None => {
            arena.branches[k].elem = Some(elem);
            true
        }
        Some(true) => false,
        Some(false) => {
            let mut block = arena.branches[k].block;
            let added = block.add(arena, elem, hash);
            arena.branches[k].block = block;
            added
        }
    }
}

/// Links `keys` (sorted by hash) into a balanced subtree by taking the
/// midpoint as root at every level.
fn build<E>(arena: &mut Arena<E>, keys: &[BranchKey]) -> Option<BranchKey> {
    if keys.is_empty() {
        return None;
    }
    let mid = keys.len() / 2;
    let left = build(arena, &keys[..mid]);
    let right = build(arena, &keys[mid + 1..]);
    let node = &mut arena.branches[keys[mid]];
    node.left = left;
    node.right = right;
    Some(keys[mid])
}

fn thread<E>(arena: &mut Arena<E>, keys: &[BranchKey]) {
    for w in keys.windows(2) {
        arena.branches[w[0]].next = Some(w[1]);
    }
    if let Some(&last) = keys.last() {
        arena.branches[last].next = None;
    }
}

/// Walks a tree along its thread: each node's own element, then its block.
pub(crate) struct TreeIter<'a, E> {
    arena: &'a Arena<E>,
    node: Option<BranchKey>,
    block: Option<ChainIter<'a, E>>,
}

impl<'a, E> Iterator for TreeIter<'a, E> {
    type Item = (u32, &'a E);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(block) = &mut self.block {
                if let Some(item) = block.next() {
                    return Some(item);
                }
                self.block = None;
            }
            let arena = self.arena;
            let node = &arena.branches[self.node?];
            self.node = node.next;
            self.block = Some(node.block.iter(arena));
            if let Some(e) = &node.elem {
                return Some((node.hash, e));
            }
        }
    }
}
