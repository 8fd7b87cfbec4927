//! Non-blocking single-owner gate.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

const FREE: u32 = 0;
const HELD: u32 = 1;

/// A binary gate that at most one caller can hold at a time.
///
/// This is not a mutex: there is no wait queue and [`AcquireLock::acquire`]
/// never blocks. Typical use is an "already running" flag for a background
/// worker. Callers that want to wait must loop on `acquire` themselves.
///
/// # Example
///
/// ```
/// use concord::atomic::AcquireLock;
///
/// let lock = AcquireLock::new();
/// assert!(lock.acquire());
/// assert!(!lock.acquire());
/// lock.release();
/// assert!(lock.acquire());
/// ```
#[derive(Default)]
pub struct AcquireLock {
    state: AtomicU32,
}

impl AcquireLock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(FREE),
        }
    }

    /// Attempts to take the gate. Returns `true` if this call won it.
    ///
    /// A held gate is detected with a plain load, so losers never issue a CAS.
    #[inline]
    #[must_use]
    pub fn acquire(&self) -> bool {
        if self.state.load(Ordering::Acquire) != FREE {
            return false;
        }
        self.state
            .compare_exchange(FREE, HELD, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Frees the gate unconditionally, whoever holds it.
    #[inline]
    pub fn release(&self) {
        self.state.store(FREE, Ordering::Release);
    }

    #[inline]
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.state.load(Ordering::Acquire) == FREE
    }

    /// Scoped form of [`AcquireLock::acquire`]: the gate is released when the
    /// returned guard is dropped.
    #[must_use]
    pub fn try_guard(&self) -> Option<AcquireGuard<'_>> {
        self.acquire().then_some(AcquireGuard { lock: self })
    }
}

impl fmt::Debug for AcquireLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquireLock")
            .field("released", &self.is_released())
            .finish()
    }
}

/// Holds an [`AcquireLock`] until dropped.
#[must_use = "dropping the guard releases the gate immediately"]
pub struct AcquireGuard<'a> {
    lock: &'a AcquireLock,
}

impl Drop for AcquireGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
