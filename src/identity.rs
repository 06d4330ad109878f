//! Identity capability shared by every element stored in a `FlexSet`.

use core::hash::Hash;

/// An element that carries a stable identity.
///
/// Two elements are the same set entry iff their ids compare equal. The
/// element's own `PartialEq` (if any) is only consulted by the bulk
/// operations that say so (`retain_all`).
///
/// The id must not change while the element is stored in a set; its hash is
/// computed once on insert and cached in the bucket node.
pub trait Identified {
    type Id: Eq + Hash;

    fn id(&self) -> &Self::Id;
}

impl<T: Identified + ?Sized> Identified for &T {
    type Id = T::Id;

    #[inline]
    fn id(&self) -> &Self::Id {
        (**self).id()
    }
}

impl<T: Identified + ?Sized> Identified for Box<T> {
    type Id = T::Id;

    #[inline]
    fn id(&self) -> &Self::Id {
        (**self).id()
    }
}

impl<T: Identified + ?Sized> Identified for std::rc::Rc<T> {
    type Id = T::Id;

    #[inline]
    fn id(&self) -> &Self::Id {
        (**self).id()
    }
}

/// A key/value pair whose identity is the key.
///
/// Used by `FlexSet::from_map` to lift an ordinary mapping into a set.
/// Equality compares both key and value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdWrapper<K, V> {
    key: K,
    value: V,
}

impl<K, V> IdWrapper<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K: Eq + Hash, V> Identified for IdWrapper<K, V> {
    type Id = K;

    #[inline]
    fn id(&self) -> &K {
        &self.key
    }
}

impl<K, V> From<(K, V)> for IdWrapper<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}
