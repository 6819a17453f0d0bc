/*!
 * Recursive Mutex
 * Exclusive lock that its owning thread may re-acquire
 */

use crate::errors::LockResult;
use crate::sync::futex::ParkingFlag;
use crate::sync::policy::{DefaultPolicy, UnlockPolicy};
use crate::sync::thread_id::{self, NO_OWNER};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Reentrant exclusive lock
///
/// The owning thread may call `lock` again without deadlocking; it must then
/// call `unlock` the same number of times. Other threads contend on the same
/// parking flag as [`Mutex`](super::Mutex).
///
/// The owner identity is only meaningful while the depth is non-zero. It is
/// written before the Release store that makes the depth non-zero and cleared
/// after the depth returns to zero, before the flag is released.
///
/// `P` selects what an unmatched `unlock` does, see [`UnlockPolicy`].
pub struct RecursiveMutex<P: UnlockPolicy = DefaultPolicy> {
    flag: ParkingFlag,
    owner: AtomicUsize,
    depth: AtomicUsize,
    _policy: PhantomData<fn() -> P>,
}

impl<P: UnlockPolicy> RecursiveMutex<P> {
    pub const fn new() -> Self {
        Self {
            flag: ParkingFlag::new(),
            owner: AtomicUsize::new(NO_OWNER),
            depth: AtomicUsize::new(0),
            _policy: PhantomData,
        }
    }

    pub fn lock(&self) {
        if self.try_reenter() {
            return;
        }
        self.flag.acquire();
        self.take_ownership();
    }

    pub fn try_lock(&self) -> bool {
        if self.try_reenter() {
            return true;
        }
        if !self.flag.try_acquire() {
            return false;
        }
        self.take_ownership();
        true
    }

    /// Release one level of ownership
    ///
    /// The last matching call releases the lock and wakes waiters. A call from
    /// a thread that does not own the lock is handled by `P`.
    pub fn unlock(&self) -> LockResult<()> {
        let depth = self.depth.load(Ordering::Acquire);
        if depth == 0 || self.owner.load(Ordering::Relaxed) != thread_id::current().get() {
            return P::on_misuse("RecursiveMutex");
        }

        if depth == 1 {
            self.depth.store(0, Ordering::Relaxed);
            self.owner.store(NO_OWNER, Ordering::Relaxed);
            self.flag.release();
        } else {
            self.depth.store(depth - 1, Ordering::Relaxed);
        }
        Ok(())
    }

    pub fn is_owned_by_current_thread(&self) -> bool {
        self.depth.load(Ordering::Acquire) > 0
            && self.owner.load(Ordering::Relaxed) == thread_id::current().get()
    }

    /// Number of unmatched `lock` calls (exact only for the owner)
    pub fn recursion_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// Racy snapshot, for diagnostics only
    pub fn is_locked(&self) -> bool {
        self.flag.is_held()
    }

    /// Fast reentrant path
    #[inline]
    fn try_reenter(&self) -> bool {
        if !self.is_owned_by_current_thread() {
            return false;
        }
        // Only the owner writes the depth while it is non-zero
        let depth = self.depth.load(Ordering::Relaxed);
        debug_assert!(depth < usize::MAX, "recursion depth overflow");
        self.depth.store(depth + 1, Ordering::Relaxed);
        true
    }

    /// Record ownership after winning the flag
    #[inline]
    fn take_ownership(&self) {
        self.owner.store(thread_id::current().get(), Ordering::Relaxed);
        self.depth.store(1, Ordering::Release);
    }
}

impl<P: UnlockPolicy> Default for RecursiveMutex<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: UnlockPolicy> std::fmt::Debug for RecursiveMutex<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecursiveMutex")
            .field("locked", &self.is_locked())
            .field("depth", &self.recursion_depth())
            .field("policy", &P::NAME)
            .finish()
    }
}
