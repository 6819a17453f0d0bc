/*!
 * Futex-Style Parking Flag
 *
 * Uses parking_lot_core for futex-like operations on all platforms.
 * On Linux, this maps directly to futex syscalls for minimal overhead.
 *
 * # Design
 *
 * A single byte holds the "held" flag plus a "parked" hint:
 * - Lock-free fast path (one CAS to acquire, one swap to release)
 * - The address of the byte is the parking key, so no side table is needed
 * - Release only enters the parking lot when someone announced they parked
 * - Wake-ups are notify-all: every parked thread retries, one wins
 */

use super::spinwait::SpinWait;
use parking_lot_core::{park, unpark_all, DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};
use std::sync::atomic::{AtomicU8, Ordering};

const LOCKED_BIT: u8 = 0b01;
const PARKED_BIT: u8 = 0b10;

/// Exclusive "held" flag with block/wake on contention
pub(crate) struct ParkingFlag {
    state: AtomicU8,
}

impl ParkingFlag {
    pub(crate) const fn new() -> Self {
        Self {
            state: AtomicU8::new(0),
        }
    }

    /// Single clear->set attempt
    #[inline]
    pub(crate) fn try_acquire(&self) -> bool {
        let mut state = self.state.load(Ordering::Relaxed);
        loop {
            if state & LOCKED_BIT != 0 {
                return false;
            }
            match self.state.compare_exchange_weak(
                state,
                state | LOCKED_BIT,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => state = actual,
            }
        }
    }

    /// Acquire, parking the calling thread while the flag is held
    #[inline]
    pub(crate) fn acquire(&self) {
        if self
            .state
            .compare_exchange(0, LOCKED_BIT, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.acquire_slow();
        }
    }

    /// Clear the flag and wake every parked waiter
    #[inline]
    pub(crate) fn release(&self) {
        if self.state.swap(0, Ordering::Release) & PARKED_BIT != 0 {
            self.release_slow();
        }
    }

    #[inline]
    pub(crate) fn is_held(&self) -> bool {
        self.state.load(Ordering::Relaxed) & LOCKED_BIT != 0
    }

    /// Stable parking address (same as in release)
    #[inline]
    fn key(&self) -> usize {
        &self.state as *const AtomicU8 as usize
    }

    #[cold]
    fn acquire_slow(&self) {
        let mut spin = SpinWait::new();
        let mut state = self.state.load(Ordering::Relaxed);

        loop {
            if state & LOCKED_BIT == 0 {
                match self.state.compare_exchange_weak(
                    state,
                    state | LOCKED_BIT,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return,
                    Err(actual) => state = actual,
                }
                continue;
            }

            // Nobody is parked yet: spin a little before paying for a syscall
            if state & PARKED_BIT == 0 && spin.spin() {
                state = self.state.load(Ordering::Relaxed);
                continue;
            }

            if state & PARKED_BIT == 0 {
                if let Err(actual) = self.state.compare_exchange_weak(
                    state,
                    state | PARKED_BIT,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    state = actual;
                    continue;
                }
            }

            // SAFETY: the key is the address of our own state byte, which
            // outlives the call, and the callbacks never panic or park.
            unsafe {
                park(
                    self.key(),
                    || self.state.load(Ordering::Relaxed) == LOCKED_BIT | PARKED_BIT,
                    || {},
                    |_, _| {},
                    DEFAULT_PARK_TOKEN,
                    None,
                );
            }

            // Woken or validation failed: re-check the flag from scratch
            spin.reset();
            state = self.state.load(Ordering::Relaxed);
        }
    }

    #[cold]
    fn release_slow(&self) {
        // SAFETY: same key as in acquire_slow; no callbacks involved.
        unsafe {
            unpark_all(self.key(), DEFAULT_UNPARK_TOKEN);
        }
    }
}
