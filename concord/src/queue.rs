//! Unbounded lock-free MPMC FIFO queue.
//!
//! A Michael–Scott queue: producers and consumers coordinate only through CAS
//! on `head`, `tail` and each cell's `next` pointer. Memory is reclaimed with
//! epoch-based reclamation, so popped cells are freed once no thread can still
//! be reading them.
//!
//! # Example
//!
//! ```
//! use concord::queue::Queue;
//!
//! let queue = Queue::new();
//! queue.push(1);
//! queue.push(2);
//!
//! assert_eq!(queue.pop(), Some(1));
//! assert_eq!(queue.pop(), Some(2));
//! assert_eq!(queue.pop(), None);
//! ```
//!
//! # Ordering
//!
//! Values pushed by one thread are popped in the order they were pushed.
//! Pushes from different threads interleave in the order their CAS won.

mod list;

use std::fmt;
use std::time::Duration;

use crossbeam_epoch as epoch;
use minstant::Instant;

use self::list::List;

/// How long [`Queue::pop_blocking`] may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Wait indefinitely.
    Infinite,
    /// Wait for at most the specified duration.
    Duration(Duration),
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

/// Lock-free FIFO queue safe to share between any number of producers and
/// consumers.
pub struct Queue<T> {
    list: List<T>,
}

impl<T> Queue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { list: List::new() }
    }

    /// Appends `value` to the back of the queue. Never blocks, never fails.
    #[inline]
    pub fn push(&self, value: T) {
        let guard = &epoch::pin();
        self.list.push(value, guard);
    }

    /// Removes the value at the front, or returns `None` if the queue is empty.
    #[inline]
    #[must_use]
    pub fn pop(&self) -> Option<T> {
        let guard = &epoch::pin();
        self.list.pop(guard)
    }

    /// Convenience spin-wrapper over [`Queue::pop`] for callers that want to
    /// wait. The queue itself never blocks; this just retries `pop` on the
    /// calling thread until a value arrives or `timeout` passes.
    ///
    /// Returns `None` on timeout.
    #[must_use]
    pub fn pop_blocking(&self, timeout: Timeout) -> Option<T> {
        let deadline = match timeout {
            Timeout::Infinite => None,
            Timeout::Duration(d) => Some(Instant::now() + d),
        };
        loop {
            if let Some(value) = self.pop() {
                return Some(value);
            }
            if let Some(dl) = deadline
                && Instant::now() > dl
            {
                return None;
            }
            std::hint::spin_loop();
        }
    }

    /// Number of values in the queue.
    ///
    /// Advisory only: the counter is updated after the structural CAS, so
    /// under concurrent use it may briefly lag behind the true occupancy.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// `len() == 0`, with the same caveat as [`Queue::len`].
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Extend<T> for Queue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let guard = &epoch::pin();
        for value in iter {
            self.list.push(value, guard);
        }
    }
}

impl<T> FromIterator<T> for Queue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut queue = Self::new();
        queue.extend(iter);
        queue
    }
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue").field("len", &self.len()).finish_non_exhaustive()
    }
}
