//! One independently locked partition of a [`super::ShardedMap`].

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;

/// A shard is a `HashMap` behind its own reader-writer lock, padded to a cache
/// line so neighbouring shards don't false-share their lock words.
#[repr(align(64))]
pub(super) struct Shard<K, V> {
    items: RwLock<HashMap<K, V>>,
}

impl<K: Eq + Hash, V> Shard<K, V> {
    pub(super) fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Overwrites `key`; returns whether it was already present.
    pub(super) fn set(&self, key: K, value: V) -> bool {
        self.items.write().insert(key, value).is_some()
    }

    pub(super) fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
        V: Clone,
    {
        self.items.read().get(key).cloned()
    }

    pub(super) fn read<Q, R>(&self, key: &Q, f: impl FnOnce(&V) -> R) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.items.read().get(key).map(f)
    }

    pub(super) fn exists<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.items.read().contains_key(key)
    }

    pub(super) fn delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.items.write().remove(key)
    }

    pub(super) fn len(&self) -> usize {
        self.items.read().len()
    }
}
