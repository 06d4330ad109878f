//! Node storage shared by every bucket of a table.
//!
//! Chains and trees never hold references to one another; they link through
//! generational `slotmap` keys. A table resize or `clear` drops the whole
//! arena at once instead of unlinking nodes one by one.

use crate::chain::Chain;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Key of a chain node.
    pub(crate) struct LinkKey;
    /// Key of a tree node.
    pub(crate) struct BranchKey;
}

/// Chain node. `elem == None` marks the single sentinel closing a chain.
#[derive(Debug)]
pub(crate) struct Link<E> {
    pub(crate) elem: Option<E>,
    pub(crate) hash: u32,
    pub(crate) next: Option<LinkKey>,
}

impl<E> Link<E> {
    pub(crate) fn sentinel() -> Self {
        Link {
            elem: None,
            hash: 0,
            next: None,
        }
    }
}

/// Tree node keyed by `hash`.
///
/// `elem` may be cleared by a removal while the node stays in place; a
/// cleared node always has an empty `block`. `next` threads all nodes of a
/// bucket into one linear sequence for iteration.
#[derive(Debug)]
pub(crate) struct Branch<E> {
    pub(crate) elem: Option<E>,
    pub(crate) hash: u32,
    pub(crate) left: Option<BranchKey>,
    pub(crate) right: Option<BranchKey>,
    pub(crate) next: Option<BranchKey>,
    pub(crate) block: Chain,
}

#[derive(Debug)]
pub(crate) struct Arena<E> {
    pub(crate) links: SlotMap<LinkKey, Link<E>>,
    pub(crate) branches: SlotMap<BranchKey, Branch<E>>,
}

impl<E> Arena<E> {
    pub(crate) fn with_capacity(links: usize) -> Self {
        Self {
            links: SlotMap::with_capacity_and_key(links),
            branches: SlotMap::with_key(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.links.clear();
        self.branches.clear();
    }

    /// Number of allocated nodes of either kind, sentinels included.
    pub(crate) fn node_count(&self) -> usize {
        self.links.len() + self.branches.len()
    }

    /// Runs `keep` over every stored element without changing anything;
    /// returns the nodes whose element it rejected.
    pub(crate) fn rejected_by(&self, mut keep: impl FnMut(&E) -> bool) -> (Vec<LinkKey>, Vec<BranchKey>) {
        let links = self
            .links
            .iter()
            .filter(|(_, l)| l.elem.as_ref().is_some_and(|e| !keep(e)))
            .map(|(k, _)| k)
            .collect();
        let branches = self
            .branches
            .iter()
            .filter(|(_, b)| b.elem.as_ref().is_some_and(|e| !keep(e)))
            .map(|(k, _)| k)
            .collect();
        (links, branches)
    }

    /// Empties the arena, yielding every stored element with its hash in
    /// no particular order.
    pub(crate) fn drain_elements(&mut self) -> impl Iterator<Item = (u32, E)> + '_ {
        let links = self.links.drain().filter_map(|(_, l)| Some((l.hash, l.elem?)));
        let branches = self.branches.drain().filter_map(|(_, b)| Some((b.hash, b.elem?)));
        links.chain(branches)
    }
}
