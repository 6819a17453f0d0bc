/*!
 * Spinlock
 * Busy-wait exclusive lock that never suspends the thread
 */

use parking_lot::lock_api::{GuardSend, RawMutex};
use std::hint;
use std::sync::atomic::{AtomicBool, Ordering};

/// Busy-wait exclusive lock
///
/// Waiters spin on a relaxed read of the flag and only retry the atomic swap
/// once it looks clear, so contended waiters do not bounce the cache line.
/// There is no fairness: a waiter may starve under sustained contention.
/// Only worth it for critical sections shorter than a park/unpark round trip.
pub struct Spinlock {
    held: AtomicBool,
}

impl Spinlock {
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn lock(&self) {
        while self.held.swap(true, Ordering::Acquire) {
            while self.held.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
    }

    #[inline]
    pub fn try_lock(&self) -> bool {
        !self.held.swap(true, Ordering::Acquire)
    }

    #[inline]
    pub fn unlock(&self) {
        self.held.store(false, Ordering::Release);
    }

    /// Racy snapshot, for diagnostics only
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }
}

impl Default for Spinlock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Spinlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spinlock")
            .field("locked", &self.is_locked())
            .finish()
    }
}

// SAFETY: lock/try_lock only succeed on a false->true transition with Acquire
// ordering and unlock publishes with Release, so holders are exclusive.
unsafe impl RawMutex for Spinlock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = GuardSend;

    #[inline]
    fn lock(&self) {
        Spinlock::lock(self)
    }

    #[inline]
    fn try_lock(&self) -> bool {
        Spinlock::try_lock(self)
    }

    #[inline]
    unsafe fn unlock(&self) {
        Spinlock::unlock(self)
    }

    #[inline]
    fn is_locked(&self) -> bool {
        Spinlock::is_locked(self)
    }
}

/// Data-carrying lock on top of [`Spinlock`]
pub type SpinMutex<T> = parking_lot::lock_api::Mutex<Spinlock, T>;
