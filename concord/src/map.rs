//! 256-way sharded concurrent hash map.
//!
//! Keys are routed to a shard by the low byte of their [`HashCode`]. Each
//! shard is a `HashMap` behind its own `RwLock`, so:
//!
//! - operations on different shards never contend
//! - writers on the same shard are mutually exclusive
//! - readers on the same shard run concurrently with each other
//!
//! The global length is a separate atomic counter updated after the shard
//! lock is released. It is exact whenever the map is quiescent and may lag
//! briefly while writers are in flight.
//!
//! # Example
//!
//! ```
//! use concord::map::ShardedMap;
//!
//! let map = ShardedMap::new();
//! map.set("a".to_string(), 1);
//! map.set("a".to_string(), 2);
//!
//! assert_eq!(map.get("a"), Some(2));
//! assert_eq!(map.len(), 1);
//!
//! map.delete("a");
//! assert!(!map.exists("a"));
//! assert!(map.is_empty());
//! ```

mod shard;

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicIsize, Ordering};

use crate::hash::{HashCode, fold_to_byte};

use self::shard::Shard;

/// Number of shards. Fixed: the index is one byte of the key's hash code.
pub const SHARD_COUNT: usize = 256;

/// Concurrent map partitioned into [`SHARD_COUNT`] independently locked shards.
pub struct ShardedMap<K, V> {
    shards: Box<[Shard<K, V>]>,
    /// Signed: a delete may decrement before the matching set increments.
    len: AtomicIsize,
}

impl<K: Eq + Hash + HashCode, V> ShardedMap<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Shard::new()).collect(),
            len: AtomicIsize::new(0),
        }
    }

    #[inline]
    fn shard<Q: HashCode + ?Sized>(&self, key: &Q) -> &Shard<K, V> {
        &self.shards[usize::from(fold_to_byte(key.hash_code()))]
    }

    /// Inserts or overwrites `key`.
    pub fn set(&self, key: K, value: V) {
        let existed = self.shard(&key).set(key, value);
        if !existed {
            self.len.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns a clone of the value stored under `key`.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + HashCode + ?Sized,
        V: Clone,
    {
        self.shard(key).get(key)
    }

    /// Runs `f` on the value under `key` while holding the shard's read lock.
    ///
    /// Use this instead of [`ShardedMap::get`] when `V` is expensive to clone.
    /// `f` must not touch the same map, or it may deadlock against a writer.
    pub fn read<Q, R>(&self, key: &Q, f: impl FnOnce(&V) -> R) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + HashCode + ?Sized,
    {
        self.shard(key).read(key, f)
    }

    #[must_use]
    pub fn exists<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + HashCode + ?Sized,
    {
        self.shard(key).exists(key)
    }

    /// Removes `key`, returning its value if it was present.
    pub fn delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + HashCode + ?Sized,
    {
        let removed = self.shard(key).delete(key);
        if removed.is_some() {
            self.len.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// Number of entries, O(1).
    ///
    /// Eventually consistent: the shard update and the counter update are two
    /// steps, so concurrent writers can make this briefly disagree with
    /// [`ShardedMap::count`]. A delete racing ahead of its set's increment
    /// reads as zero, never as a wrapped count.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        usize::try_from(self.len.load(Ordering::Relaxed)).unwrap_or(0)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exact entry count, taking every shard's read lock in turn.
    ///
    /// O(shards). Not a snapshot: shards already counted may change before
    /// the last one is read.
    #[must_use]
    pub fn count(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }
}

impl<K: Eq + Hash + HashCode, V> Default for ShardedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + HashCode, V> fmt::Debug for ShardedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedMap")
            .field("shards", &self.shards.len())
            .field("len", &self.len())
            .finish()
    }
}
