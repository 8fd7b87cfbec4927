//! Wait-free scalar cells.
//!
//! Numeric cells expose `add` rather than a `set` that secretly adds: `add`
//! accumulates a delta, `store` assigns an absolute value. Arithmetic wraps on
//! overflow, matching the underlying `fetch_add`.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicU32, AtomicU64, Ordering};

macro_rules! numeric_cell {
    ($(#[$meta:meta])* $name:ident, $prim:ty, $atomic:ty) => {
        $(#[$meta])*
        #[derive(Default)]
        #[repr(transparent)]
        pub struct $name {
            value: $atomic,
        }

        impl $name {
            /// Creates a cell holding `value`.
            #[must_use]
            pub const fn new(value: $prim) -> Self {
                Self {
                    value: <$atomic>::new(value),
                }
            }

            /// Loads the current value.
            #[inline]
            #[must_use]
            pub fn get(&self) -> $prim {
                self.value.load(Ordering::SeqCst)
            }

            /// Adds `delta` to the cell.
            #[inline]
            pub fn add(&self, delta: $prim) {
                self.value.fetch_add(delta, Ordering::SeqCst);
            }

            /// Adds `delta` and returns the value the cell now holds.
            #[inline]
            pub fn incr(&self, delta: $prim) -> $prim {
                self.value.fetch_add(delta, Ordering::SeqCst).wrapping_add(delta)
            }

            /// Overwrites the cell with `value`.
            #[inline]
            pub fn store(&self, value: $prim) {
                self.value.store(value, Ordering::SeqCst);
            }

            /// Replaces `old` with `new` if the cell still holds `old`.
            #[inline]
            pub fn cas(&self, old: $prim, new: $prim) -> bool {
                self.value
                    .compare_exchange(old, new, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            }
        }

        impl From<$prim> for $name {
            fn from(value: $prim) -> Self {
                Self::new(value)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.get()).finish()
            }
        }
    };
}

numeric_cell!(
    /// Atomic `i32` cell.
    Int32,
    i32,
    AtomicI32
);
numeric_cell!(
    /// Atomic `i64` cell.
    Int64,
    i64,
    AtomicI64
);
numeric_cell!(
    /// Atomic `u32` cell.
    Uint32,
    u32,
    AtomicU32
);
numeric_cell!(
    /// Atomic `u64` cell, typically a monotonically increasing counter.
    Uint64,
    u64,
    AtomicU64
);

/// Atomic boolean flag.
///
/// Unlike the numeric cells, [`Bool::set`] is a plain store.
#[derive(Default)]
#[repr(transparent)]
pub struct Bool {
    value: AtomicBool,
}

impl Bool {
    #[must_use]
    pub const fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::SeqCst);
    }
}

impl From<bool> for Bool {
    fn from(value: bool) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Bool").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_bool_set_is_a_store() {
        let run = Bool::default();
        assert!(!run.get());

        run.set(true);
        assert!(run.get());

        run.set(true);
        assert!(run.get());

        run.set(false);
        assert!(!run.get());
    }

    #[test]
    fn test_add_accumulates() {
        let cell = Uint64::new(5);
        cell.add(3);
        cell.add(2);
        assert_eq!(cell.get(), 10);
    }

    #[test]
    fn test_store_assigns() {
        let cell = Int32::new(7);
        cell.store(-4);
        assert_eq!(cell.get(), -4);
    }

    #[test]
    fn test_incr_returns_new_value() {
        let cell = Int64::default();
        assert_eq!(cell.incr(1), 1);
        assert_eq!(cell.incr(10), 11);
        assert_eq!(cell.incr(-11), 0);
    }

    #[test]
    fn test_incr_wraps() {
        let cell = Uint32::new(u32::MAX);
        assert_eq!(cell.incr(2), 1);
        assert_eq!(cell.get(), 1);
    }

    #[test]
    fn test_cas() {
        let cell = Uint32::new(1);
        assert!(cell.cas(1, 2));
        assert!(!cell.cas(1, 3));
        assert_eq!(cell.get(), 2);
    }

    #[test]
    fn test_concurrent_incr() {
        let counter = Arc::new(Uint64::default());
        let threads = 8;
        let per_thread = 10_000;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        counter.incr(1);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(counter.get(), threads * per_thread);
    }

    #[test]
    fn test_concurrent_cas_single_winner() {
        let cell = Arc::new(Int32::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || cell.cas(0, 1))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(cell.get(), 1);
    }

    #[test]
    fn test_debug_shows_value() {
        assert_eq!(format!("{:?}", Uint64::new(9)), "Uint64(9)");
        assert_eq!(format!("{:?}", Bool::new(true)), "Bool(true)");
    }
}
