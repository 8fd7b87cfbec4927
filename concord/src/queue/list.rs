//! Core Michael–Scott lock-free linked list.
//!
//! # Algorithm
//!
//! - The list always starts with a sentinel cell; logical content begins at
//!   `head.next`
//! - Producers link a new cell after the last one with a CAS on `next`, then
//!   try to swing `tail` forward; a failed swing is fine, someone else helped
//! - A thread that finds `tail` lagging (its `next` is non-null) helps move
//!   it forward before retrying
//! - Consumers CAS `head` from the sentinel to `head.next`; the winner moves
//!   the value out of the new sentinel and retires the old one
//!
//! # Safety
//!
//! Cells are retired through `crossbeam-epoch`, so any pointer loaded under a
//! pinned guard stays dereferenceable until that guard is dropped. `head`
//! never overtakes `tail`, so a cell is retired only after both have moved
//! past it. The value of a cell is read exactly once, by the thread whose CAS
//! made that cell the new sentinel.
//!
//! Every CAS failure is retried immediately with no backoff. Under extreme
//! contention that is a livelock risk; callers who care should bound their
//! own retries.

use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicIsize, Ordering};

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};

use crate::trace::trace;

/// One link of the list. The sentinel's value is always uninitialized or
/// already moved out.
struct Cell<T> {
    value: MaybeUninit<T>,
    next: Atomic<Cell<T>>,
}

impl<T> Cell<T> {
    fn sentinel() -> Self {
        Self {
            value: MaybeUninit::uninit(),
            next: Atomic::null(),
        }
    }

    fn with_value(value: T) -> Self {
        Self {
            value: MaybeUninit::new(value),
            next: Atomic::null(),
        }
    }
}

/// Consumer end, on its own cache line so producers and consumers don't
/// false-share.
#[repr(align(64))]
struct HeadState<T> {
    head: Atomic<Cell<T>>,
}

/// Producer end.
#[repr(align(64))]
struct TailState<T> {
    tail: Atomic<Cell<T>>,
}

#[repr(align(64))]
struct LengthState {
    /// Signed: a pop may decrement before the matching push increments.
    len: AtomicIsize,
}

pub(crate) struct List<T> {
    consumer: HeadState<T>,
    producer: TailState<T>,
    length: LengthState,
}

impl<T> List<T> {
    pub(crate) fn new() -> Self {
        let list = Self {
            consumer: HeadState {
                head: Atomic::null(),
            },
            producer: TailState {
                tail: Atomic::null(),
            },
            length: LengthState {
                len: AtomicIsize::new(0),
            },
        };

        // SAFETY: the list is not shared yet.
        let sentinel = Owned::new(Cell::sentinel()).into_shared(unsafe { epoch::unprotected() });
        list.consumer.head.store(sentinel, Ordering::Relaxed);
        list.producer.tail.store(sentinel, Ordering::Relaxed);
        list
    }

    /// Links `value` at the end of the list.
    pub(crate) fn push(&self, value: T, guard: &Guard) {
        let cell = Owned::new(Cell::with_value(value)).into_shared(guard);

        loop {
            let tail = self.producer.tail.load(Ordering::Acquire, guard);
            // SAFETY: tail is never null, and the cell it points to cannot be
            // freed while this guard is pinned.
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Ordering::Acquire, guard);

            if tail != self.producer.tail.load(Ordering::Acquire, guard) {
                continue;
            }

            if next.is_null() {
                if tail_ref
                    .next
                    .compare_exchange(Shared::null(), cell, Ordering::Release, Ordering::Relaxed, guard)
                    .is_ok()
                {
                    // Best effort: another thread may already have advanced it.
                    let _ = self.producer.tail.compare_exchange(
                        tail,
                        cell,
                        Ordering::Release,
                        Ordering::Relaxed,
                        guard,
                    );
                    self.length.len.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            } else {
                trace!("queue push: tail lagging, helping it forward");
                let _ = self.producer.tail.compare_exchange(
                    tail,
                    next,
                    Ordering::Release,
                    Ordering::Relaxed,
                    guard,
                );
            }
        }
    }

    /// Unlinks the first value, or returns `None` if the list is empty.
    pub(crate) fn pop(&self, guard: &Guard) -> Option<T> {
        loop {
            let head = self.consumer.head.load(Ordering::Acquire, guard);
            let tail = self.producer.tail.load(Ordering::Acquire, guard);
            // SAFETY: head is never null and is protected by the guard.
            let head_ref = unsafe { head.deref() };
            let next = head_ref.next.load(Ordering::Acquire, guard);

            if head != self.consumer.head.load(Ordering::Acquire, guard) {
                continue;
            }

            if head == tail {
                if next.is_null() {
                    return None;
                }
                trace!("queue pop: tail lagging, helping it forward");
                let _ = self.producer.tail.compare_exchange(
                    tail,
                    next,
                    Ordering::Release,
                    Ordering::Relaxed,
                    guard,
                );
                continue;
            }

            // SAFETY: protected by the guard; null only if our snapshot was torn.
            let Some(next_ref) = (unsafe { next.as_ref() }) else {
                continue;
            };

            if self
                .consumer
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed, guard)
                .is_ok()
            {
                self.length.len.fetch_sub(1, Ordering::Relaxed);
                // SAFETY: winning the CAS made `next` the sentinel; no other
                // thread reads a sentinel's value, and it was initialized by push.
                let value = unsafe { next_ref.value.assume_init_read() };
                // SAFETY: the old sentinel is unreachable from the list now.
                unsafe { guard.defer_destroy(head) };
                return Some(value);
            }
        }
    }

    /// Advisory element count, clamped at zero.
    pub(crate) fn len(&self) -> usize {
        usize::try_from(self.length.len.load(Ordering::Relaxed)).unwrap_or(0)
    }
}

impl<T> Drop for List<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no other thread holds a reference, so the
        // unprotected guard destroys retired cells immediately without races.
        unsafe {
            let guard = epoch::unprotected();
            while self.pop(guard).is_some() {}
            let sentinel = self.consumer.head.load(Ordering::Relaxed, guard);
            drop(sentinel.into_owned());
        }
    }
}

// SAFETY: values are moved in by push and out by exactly one pop, never
// shared, so `T: Send` is enough for both.
unsafe impl<T: Send> Send for List<T> {}
unsafe impl<T: Send> Sync for List<T> {}
