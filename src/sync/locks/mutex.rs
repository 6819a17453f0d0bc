/*!
 * Mutex
 * Exclusive lock that parks contended waiters and wakes them all on unlock
 */

use crate::sync::futex::ParkingFlag;
use parking_lot::lock_api::{GuardSend, RawMutex};

/// Exclusive lock with kernel-assisted blocking
///
/// Uncontended `lock`/`unlock` are a single atomic operation each. A contended
/// `lock` spins briefly, then parks until the holder unlocks. Unlock wakes
/// every parked waiter; they race for the flag and the losers park again.
/// There is no FIFO ordering among waiters.
pub struct Mutex {
    flag: ParkingFlag,
}

impl Mutex {
    pub const fn new() -> Self {
        Self {
            flag: ParkingFlag::new(),
        }
    }

    #[inline]
    pub fn lock(&self) {
        self.flag.acquire();
    }

    #[inline]
    pub fn try_lock(&self) -> bool {
        self.flag.try_acquire()
    }

    #[inline]
    pub fn unlock(&self) {
        self.flag.release();
    }

    /// Racy snapshot, for diagnostics only
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.flag.is_held()
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Mutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutex")
            .field("locked", &self.is_locked())
            .finish()
    }
}

// SAFETY: the parking flag only grants one holder at a time, with
// Acquire/Release ordering on the transitions.
unsafe impl RawMutex for Mutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = GuardSend;

    #[inline]
    fn lock(&self) {
        Mutex::lock(self)
    }

    #[inline]
    fn try_lock(&self) -> bool {
        Mutex::try_lock(self)
    }

    #[inline]
    unsafe fn unlock(&self) {
        Mutex::unlock(self)
    }

    #[inline]
    fn is_locked(&self) -> bool {
        Mutex::is_locked(self)
    }
}

/// Data-carrying lock on top of [`Mutex`]
pub type FlagMutex<T> = parking_lot::lock_api::Mutex<Mutex, T>;
