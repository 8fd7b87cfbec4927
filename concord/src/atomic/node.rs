//! Atomically swappable pointer slot.
//!
//! A [`NodeSlot`] holds at most one heap-allocated [`Node`]. Replacing the node
//! is a single pointer store or CAS, which lets a value made of several fields
//! be swapped as one unit. Displaced nodes are retired through
//! `crossbeam-epoch` and freed only after every pinned reader has moved on, so
//! pointer identity stays meaningful for the lifetime of a guard (no ABA).

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::Ordering;

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};

/// Payload holder stored inside a [`NodeSlot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<T> {
    value: T,
}

impl<T> Node<T> {
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Borrow of the node currently installed in a slot.
///
/// Valid while both the slot and the epoch guard it was loaded under are
/// alive. Two `NodeRef`s are equal only if they point at the same allocation.
pub struct NodeRef<'g, T> {
    shared: Shared<'g, Node<T>>,
}

impl<T> Clone for NodeRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, T> {}

impl<'g, T> NodeRef<'g, T> {
    #[inline]
    pub fn node(&self) -> &'g Node<T> {
        // SAFETY: a NodeRef is only built from a non-null pointer loaded under
        // the guard 'g, and retired nodes are not freed while that guard is pinned.
        unsafe { self.shared.deref() }
    }

    #[inline]
    pub fn value(&self) -> &'g T {
        &self.node().value
    }
}

impl<T> Deref for NodeRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value()
    }
}

impl<T> PartialEq for NodeRef<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.shared == other.shared
    }
}

impl<T> Eq for NodeRef<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for NodeRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(self.value()).finish()
    }
}

/// Atomic pointer slot holding an optional [`Node`].
///
/// # Example
///
/// ```
/// use concord::atomic::{Node, NodeSlot, pin};
///
/// let slot = NodeSlot::new(Node::new(1));
///
/// let guard = &pin();
/// let current = slot.get(guard);
/// assert!(slot.cas(current, Node::new(2), guard).is_ok());
///
/// // `current` no longer matches, so this CAS hands the node back.
/// let rejected = slot.cas(current, Node::new(3), guard).unwrap_err();
/// assert_eq!(rejected.into_value(), 3);
/// assert_eq!(slot.load_cloned(), Some(2));
/// ```
pub struct NodeSlot<T> {
    ptr: Atomic<Node<T>>,
}

impl<T> NodeSlot<T> {
    #[must_use]
    pub fn new(node: Node<T>) -> Self {
        Self {
            ptr: Atomic::new(node),
        }
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self {
            ptr: Atomic::null(),
        }
    }

    /// Loads the installed node, or `None` if the slot is empty.
    #[inline]
    #[must_use]
    pub fn get<'g>(&'g self, guard: &'g Guard) -> Option<NodeRef<'g, T>> {
        let shared = self.ptr.load(Ordering::Acquire, guard);
        (!shared.is_null()).then_some(NodeRef { shared })
    }

    /// Clones the current value out under a short-lived guard.
    #[must_use]
    pub fn load_cloned(&self) -> Option<T>
    where
        T: Clone,
    {
        let guard = &epoch::pin();
        self.get(guard).map(|node| node.value().clone())
    }
}

impl<T: Send + 'static> NodeSlot<T> {
    /// Installs `node` unconditionally and retires whatever was there.
    pub fn set(&self, node: Node<T>) {
        let guard = &epoch::pin();
        let old = self.ptr.swap(Owned::new(node), Ordering::AcqRel, guard);
        if !old.is_null() {
            // SAFETY: the swap unlinked `old`; no new reader can reach it and
            // current readers are protected by their own pinned guards.
            unsafe { guard.defer_destroy(old) };
        }
    }

    /// Shorthand for `set(Node::new(value))`.
    pub fn set_value(&self, value: T) {
        self.set(Node::new(value));
    }

    /// Installs `new` only if the slot still holds `old` (`None` = empty).
    ///
    /// On success returns a reference to the freshly installed node. On
    /// failure nothing changes and `new` is handed back to the caller.
    ///
    /// # Errors
    ///
    /// Returns `Err(new)` when the slot no longer holds `old`.
    pub fn cas<'g>(
        &'g self,
        old: Option<NodeRef<'g, T>>,
        new: Node<T>,
        guard: &'g Guard,
    ) -> Result<NodeRef<'g, T>, Node<T>> {
        let current = match old {
            Some(node) => node.shared,
            None => Shared::null(),
        };

        match self.ptr.compare_exchange(
            current,
            Owned::new(new),
            Ordering::AcqRel,
            Ordering::Acquire,
            guard,
        ) {
            Ok(installed) => {
                if !current.is_null() {
                    // SAFETY: the CAS unlinked `current`; see `set`.
                    unsafe { guard.defer_destroy(current) };
                }
                Ok(NodeRef { shared: installed })
            }
            Err(err) => Err(*err.new.into_box()),
        }
    }
}

impl<T> Default for NodeSlot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = &epoch::pin();
        f.debug_tuple("NodeSlot")
            .field(&self.get(guard).map(|node| node.value()))
            .finish()
    }
}

impl<T> Drop for NodeSlot<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` proves no other thread can reach the slot, and
        // every `NodeRef` borrows the slot, so none can outlive this drop.
        unsafe {
            let guard = epoch::unprotected();
            let current = self.ptr.load(Ordering::Relaxed, guard);
            if !current.is_null() {
                drop(current.into_owned());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct User {
        id: i64,
    }

    #[test]
    fn test_cas_chain() {
        let slot = NodeSlot::empty();
        slot.set(Node::new(User { id: 1 }));

        let guard = &epoch::pin();
        let user1 = slot.get(guard).expect("slot was just set");
        let user2 = slot
            .cas(Some(user1), Node::new(User { id: 2 }), guard)
            .expect("slot still holds user1");
        assert_eq!(user2.id, 2);

        let user3 = slot
            .cas(Some(user2), Node::new(User { id: 3 }), guard)
            .expect("slot still holds user2");
        assert_eq!(user3.value(), &User { id: 3 });

        slot.set_value(User { id: 4 });
        assert_eq!(slot.load_cloned(), Some(User { id: 4 }));
    }

    #[test]
    fn test_stale_cas_returns_node() {
        let slot = NodeSlot::new(Node::new(10));
        let guard = &epoch::pin();

        let stale = slot.get(guard);
        slot.set_value(11);

        let rejected = slot.cas(stale, Node::new(12), guard).unwrap_err();
        assert_eq!(rejected.into_value(), 12);
        assert_eq!(slot.load_cloned(), Some(11));
    }

    #[test]
    fn test_cas_on_empty_slot() {
        let slot: NodeSlot<&'static str> = NodeSlot::empty();
        let guard = &epoch::pin();

        assert!(slot.get(guard).is_none());
        assert!(slot.cas(None, Node::new("first"), guard).is_ok());
        assert!(slot.cas(None, Node::new("second"), guard).is_err());
        assert_eq!(slot.load_cloned(), Some("first"));
    }

    #[test]
    fn test_node_ref_identity() {
        let slot = NodeSlot::new(Node::new(5));
        let guard = &epoch::pin();

        let a = slot.get(guard);
        let b = slot.get(guard);
        assert_eq!(a, b);

        slot.set_value(5);
        assert_ne!(slot.get(guard), a);
    }

    #[test]
    fn test_concurrent_cas_counter() {
        let slot = Arc::new(NodeSlot::new(Node::new(0u64)));
        let threads = 4;
        let per_thread = 500;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let slot = Arc::clone(&slot);
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        loop {
                            let guard = &epoch::pin();
                            let current = slot.get(guard);
                            let next = current.map_or(0, |n| *n) + 1;
                            if slot.cas(current, Node::new(next), guard).is_ok() {
                                break;
                            }
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(slot.load_cloned(), Some(threads * per_thread));
    }
}
