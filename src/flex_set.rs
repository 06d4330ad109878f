//! FlexSet: public identity-keyed set over `Table`, with a debug reentrancy guard.

use crate::config::Config;
use crate::identity::{IdWrapper, Identified};
use crate::reentrancy::DebugReentrancy;
use crate::table::{Iter, SetStats, Table};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;

/// A set of elements keyed by their identity.
///
/// Membership, lookup and removal go through `E::id()`; two elements with
/// equal ids are the same entry even if they differ otherwise.
///
/// ```
/// use flex_set::{FlexSet, IdWrapper};
///
/// let mut set = FlexSet::new();
/// assert!(set.insert(IdWrapper::new("a", 1)));
/// assert!(!set.insert(IdWrapper::new("a", 2)));
/// assert_eq!(set.get_by_id("a").map(|w| *w.value()), Some(1));
/// assert_eq!(set.remove_by_id("a").map(|w| *w.value()), Some(1));
/// assert!(set.is_empty());
/// ```
pub struct FlexSet<E, S = RandomState> {
    table: Table<E, S>,
    config: Config,
    guard: DebugReentrancy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    DestinationTooSmall { required: usize, provided: usize },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::DestinationTooSmall { required, provided } => write!(
                f,
                "cannot fit {required} set elements into a slice of length {provided}"
            ),
        }
    }
}

impl std::error::Error for ExportError {}

impl<E: Identified> FlexSet<E> {
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    /// Starts with at least `hint` slots (rounded up to a power of two, at
    /// least 16).
    pub fn with_capacity(hint: usize) -> Self {
        Self::with_config(Config::new().with_initial_capacity(hint))
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_config_and_hasher(config, RandomState::new())
    }

    /// Builds a set sized for `elements`; later duplicates are dropped.
    pub fn from_elements<I: IntoIterator<Item = E>>(elements: I) -> Self {
        let iter = elements.into_iter();
        let mut set = Self::with_capacity(iter.size_hint().0);
        set.insert_all(iter);
        set
    }
}

impl<K: Eq + Hash, V> FlexSet<IdWrapper<K, V>> {
    /// Lifts key/value pairs into a set of `IdWrapper`s keyed by `K`.
    pub fn from_map<I: IntoIterator<Item = (K, V)>>(map: I) -> Self {
        Self::from_elements(map.into_iter().map(IdWrapper::from))
    }
}

impl<E: Identified> Default for FlexSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, S> FlexSet<E, S>
where
    E: Identified,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_config_and_hasher(Config::new(), hasher)
    }

    pub fn with_config_and_hasher(config: Config, hasher: S) -> Self {
        Self {
            table: Table::new(&config, hasher),
            config,
            guard: DebugReentrancy::new(),
        }
    }

    pub fn hasher(&self) -> &S {
        self.table.hasher()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Current slot count; always a power of two.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn stats(&self) -> SetStats {
        self.table.stats()
    }

    /// Adds `elem` unless its id is already present; returns whether it was
    /// added. A rejected `elem` is dropped.
    pub fn insert(&mut self, elem: E) -> bool {
        let _g = self.guard.enter("insert");
        self.table.insert(elem)
    }

    pub fn contains(&self, elem: &E) -> bool {
        let _g = self.guard.enter("contains");
        self.table.get(elem.id()).is_some()
    }

    pub fn contains_by_id<Q>(&self, id: &Q) -> bool
    where
        E::Id: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter("contains_by_id");
        self.table.get(id).is_some()
    }

    /// Returns the stored element sharing `elem`'s id.
    pub fn get(&self, elem: &E) -> Option<&E> {
        let _g = self.guard.enter("get");
        self.table.get(elem.id())
    }

    pub fn get_by_id<Q>(&self, id: &Q) -> Option<&E>
    where
        E::Id: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter("get_by_id");
        self.table.get(id)
    }

    /// Removes the stored element sharing `elem`'s id.
    pub fn remove(&mut self, elem: &E) -> bool {
        let _g = self.guard.enter("remove");
        self.table.remove(elem.id()).is_some()
    }

    pub fn remove_by_id<Q>(&mut self, id: &Q) -> Option<E>
    where
        E::Id: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter("remove_by_id");
        self.table.remove(id)
    }

    /// Removes everything; capacity is kept so refilling does not regrow.
    pub fn clear(&mut self) {
        let _g = self.guard.enter("clear");
        self.table.clear();
    }

    /// Returns whether any element was added.
    pub fn insert_all<I: IntoIterator<Item = E>>(&mut self, elements: I) -> bool {
        let _g = self.guard.enter("insert_all");
        let mut changed = false;
        for e in elements {
            changed |= self.table.insert(e);
        }
        changed
    }

    /// True if every element's id is present.
    pub fn contains_all<'q, I>(&self, elements: I) -> bool
    where
        I: IntoIterator<Item = &'q E>,
        E: 'q,
    {
        let _g = self.guard.enter("contains_all");
        elements.into_iter().all(|e| self.table.get(e.id()).is_some())
    }

    pub fn contains_all_by_id<'q, Q, I>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = &'q Q>,
        E::Id: Borrow<Q>,
        Q: ?Sized + Hash + Eq + 'q,
    {
        let _g = self.guard.enter("contains_all_by_id");
        ids.into_iter().all(|id| self.table.get(id).is_some())
    }

    /// Removes the entries sharing an id with any of `elements`; returns
    /// whether anything was removed.
    pub fn remove_all<'q, I>(&mut self, elements: I) -> bool
    where
        I: IntoIterator<Item = &'q E>,
        E: 'q,
    {
        let _g = self.guard.enter("remove_all");
        let mut changed = false;
        for e in elements {
            changed |= self.table.remove(e.id()).is_some();
        }
        changed
    }

    pub fn remove_all_by_id<'q, Q, I>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = &'q Q>,
        E::Id: Borrow<Q>,
        Q: ?Sized + Hash + Eq + 'q,
    {
        let _g = self.guard.enter("remove_all_by_id");
        let mut changed = false;
        for id in ids {
            changed |= self.table.remove(id).is_some();
        }
        changed
    }

    /// Keeps only the elements `keep` accepts; returns whether anything was
    /// removed.
    pub fn retain<F: FnMut(&E) -> bool>(&mut self, keep: F) -> bool {
        let _g = self.guard.enter("retain");
        self.table.retain(keep) > 0
    }

    /// Keeps only the elements equal (`PartialEq`, not just by id) to one
    /// of `elements`.
    pub fn retain_all<'q, I>(&mut self, elements: I) -> bool
    where
        I: IntoIterator<Item = &'q E>,
        E: PartialEq + 'q,
    {
        let _g = self.guard.enter("retain_all");
        let mut wanted: hashbrown::HashMap<&E::Id, Vec<&E>> = hashbrown::HashMap::new();
        for e in elements {
            wanted.entry(e.id()).or_default().push(e);
        }
        let dropped = self.table.retain(|e| {
            wanted
                .get(e.id())
                .is_some_and(|candidates| candidates.iter().any(|c| *c == e))
        });
        dropped > 0
    }

    /// Keeps only the elements whose id is among `ids`.
    pub fn retain_all_by_id<'q, Q, I>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = &'q Q>,
        E::Id: Borrow<Q>,
        Q: ?Sized + Hash + Eq + 'q,
    {
        let _g = self.guard.enter("retain_all_by_id");
        let wanted: hashbrown::HashSet<&Q> = ids.into_iter().collect();
        self.table
            .retain(|e| {
                let id: &Q = e.id().borrow();
                wanted.contains(id)
            })
            > 0
    }

    /// Iterates in slot order; see `Iter`.
    pub fn iter(&self) -> Iter<'_, E> {
        self.table.iter()
    }

    pub fn to_vec(&self) -> Vec<E>
    where
        E: Clone,
    {
        self.iter().cloned().collect()
    }

    /// Clones the elements, in iteration order, into the front of `dest`.
    /// Returns the number written.
    pub fn clone_into_slice(&self, dest: &mut [E]) -> Result<usize, ExportError>
    where
        E: Clone,
    {
        if dest.len() < self.len() {
            return Err(ExportError::DestinationTooSmall {
                required: self.len(),
                provided: dest.len(),
            });
        }
        for (slot, e) in dest.iter_mut().zip(self.iter()) {
            slot.clone_from(e);
        }
        Ok(self.len())
    }

    /// Projects the set into an id -> element map.
    pub fn to_map(&self) -> hashbrown::HashMap<&E::Id, &E> {
        self.iter().map(|e| (e.id(), e)).collect()
    }

    pub fn id_set(&self) -> hashbrown::HashSet<&E::Id> {
        self.iter().map(|e| e.id()).collect()
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        self.table.check_invariants();
    }
}

impl<E, S> Clone for FlexSet<E, S>
where
    E: Identified + Clone,
    S: BuildHasher + Clone,
{
    /// Clones into a set with the same capacity and thresholds.
    fn clone(&self) -> Self {
        let config = self.config.with_initial_capacity(self.capacity());
        let mut set = Self::with_config_and_hasher(config, self.hasher().clone());
        for e in self.iter() {
            set.table.insert(e.clone());
        }
        set
    }
}

/// Sets are equal when they hold the same ids.
impl<E, S> PartialEq for FlexSet<E, S>
where
    E: Identified,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|e| other.table.get(e.id()).is_some())
    }
}

impl<E, S> Eq for FlexSet<E, S>
where
    E: Identified,
    S: BuildHasher,
{
}

impl<E, S> fmt::Debug for FlexSet<E, S>
where
    E: Identified + fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<E, S> Extend<E> for FlexSet<E, S>
where
    E: Identified,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        self.insert_all(iter);
    }
}

impl<E, S> FromIterator<E> for FlexSet<E, S>
where
    E: Identified,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let config = Config::new().with_initial_capacity(iter.size_hint().0);
        let mut set = Self::with_config_and_hasher(config, S::default());
        set.insert_all(iter);
        set
    }
}

impl<'a, E, S> IntoIterator for &'a FlexSet<E, S>
where
    E: Identified,
    S: BuildHasher,
{
    type Item = &'a E;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Iter<'a, E> {
        self.iter()
    }
}
