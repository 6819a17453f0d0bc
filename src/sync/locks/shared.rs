/*!
 * Shared Mutex
 * Reader/writer lock with a reader fast path
 *
 * # Design: Reader-Preferring
 *
 * Readers and writers contend on one exclusive flag. The first reader takes
 * the flag on behalf of all readers; while the reader count stays above zero,
 * later readers join with a single CAS on the count and never touch the flag.
 * The last reader out releases the flag.
 *
 * Consequence: a writer parked on the flag waits until the reader count drops
 * to zero, so a continuous stream of overlapping readers starves it. There is
 * no writer-priority mode.
 */

use crate::errors::LockResult;
use crate::sync::futex::ParkingFlag;
use crate::sync::policy::{DefaultPolicy, UnlockPolicy};
use parking_lot::lock_api::{GuardSend, RawRwLock};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Reader/writer lock: many readers or one writer
///
/// `P` selects what an unmatched `unlock` or `unlock_shared` does, see
/// [`UnlockPolicy`].
pub struct SharedMutex<P: UnlockPolicy = DefaultPolicy> {
    flag: ParkingFlag,
    readers: AtomicUsize,
    contentions: AtomicU64,
    _policy: PhantomData<fn() -> P>,
}

impl<P: UnlockPolicy> SharedMutex<P> {
    pub const fn new() -> Self {
        Self {
            flag: ParkingFlag::new(),
            readers: AtomicUsize::new(0),
            contentions: AtomicU64::new(0),
            _policy: PhantomData,
        }
    }

    /// Acquire exclusive (writer) access
    pub fn lock(&self) {
        self.note_contention();
        self.flag.acquire();
    }

    pub fn try_lock(&self) -> bool {
        self.note_contention();
        self.flag.try_acquire()
    }

    /// Release exclusive access
    pub fn unlock(&self) -> LockResult<()> {
        if !self.flag.is_held() || self.readers.load(Ordering::Acquire) > 0 {
            return P::on_misuse("SharedMutex");
        }
        self.flag.release();
        Ok(())
    }

    /// Acquire shared (reader) access
    pub fn lock_shared(&self) {
        if self.try_join() {
            return;
        }
        self.note_contention();
        self.flag.acquire();
        self.readers.fetch_add(1, Ordering::Release);
    }

    pub fn try_lock_shared(&self) -> bool {
        if self.try_join() {
            return true;
        }
        self.note_contention();
        if !self.flag.try_acquire() {
            return false;
        }
        self.readers.fetch_add(1, Ordering::Release);
        true
    }

    /// Release shared access; the last reader releases the flag
    pub fn unlock_shared(&self) -> LockResult<()> {
        let mut readers = self.readers.load(Ordering::Relaxed);
        loop {
            if readers == 0 {
                return P::on_misuse("SharedMutex");
            }
            match self.readers.compare_exchange_weak(
                readers,
                readers - 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => readers = actual,
            }
        }

        if readers == 1 {
            self.flag.release();
        }
        Ok(())
    }

    /// Active readers (racy snapshot)
    pub fn reader_count(&self) -> usize {
        self.readers.load(Ordering::Relaxed)
    }

    /// Whether the flag is held by a writer or on behalf of readers
    pub fn is_locked(&self) -> bool {
        self.flag.is_held()
    }

    /// How many times any caller went for the exclusive flag
    ///
    /// Readers that join an existing reader group do not count.
    pub fn flag_contentions(&self) -> u64 {
        self.contentions.load(Ordering::Relaxed)
    }

    /// Reader fast path: join only while the count is already non-zero
    #[inline]
    fn try_join(&self) -> bool {
        let mut readers = self.readers.load(Ordering::Relaxed);
        while readers > 0 {
            match self.readers.compare_exchange_weak(
                readers,
                readers + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => readers = actual,
            }
        }
        false
    }

    #[inline]
    fn note_contention(&self) {
        self.contentions.fetch_add(1, Ordering::Relaxed);
    }
}

impl<P: UnlockPolicy> Default for SharedMutex<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: UnlockPolicy> std::fmt::Debug for SharedMutex<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedMutex")
            .field("locked", &self.is_locked())
            .field("readers", &self.reader_count())
            .field("policy", &P::NAME)
            .finish()
    }
}

// SAFETY: writers hold the flag with a zero reader count; readers hold it
// collectively while the count is non-zero. Guards from lock_api always pair
// their unlocks, so the misuse branch is never reached through them.
unsafe impl<P: UnlockPolicy> RawRwLock for SharedMutex<P> {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = GuardSend;

    #[inline]
    fn lock_shared(&self) {
        SharedMutex::lock_shared(self)
    }

    #[inline]
    fn try_lock_shared(&self) -> bool {
        SharedMutex::try_lock_shared(self)
    }

    #[inline]
    unsafe fn unlock_shared(&self) {
        let _ = SharedMutex::unlock_shared(self);
    }

    #[inline]
    fn lock_exclusive(&self) {
        self.lock()
    }

    #[inline]
    fn try_lock_exclusive(&self) -> bool {
        self.try_lock()
    }

    #[inline]
    unsafe fn unlock_exclusive(&self) {
        let _ = self.unlock();
    }

    #[inline]
    fn is_locked(&self) -> bool {
        SharedMutex::is_locked(self)
    }
}

/// Data-carrying reader/writer lock on top of [`SharedMutex`]
pub type ReaderWriterLock<T> = parking_lot::lock_api::RwLock<SharedMutex, T>;
