/*!
 * Bounded Spin-Wait with Exponential Backoff
 *
 * Short contention windows are cheaper to spin through than to park on.
 * Spinning is bounded so contended waiters fall back to parking quickly:
 *
 * 1. **Tight spin phase**: `2^n` iterations of the `spin_loop()` hint
 * 2. **Yield phase**: `yield_now()` once per round
 * 3. **Exhausted**: caller parks
 */

use super::config::{SPIN_LIMIT, TIGHT_SPIN_ROUNDS};
use std::hint;
use std::thread;

/// Spin budget for one slow-path acquisition
pub(crate) struct SpinWait {
    counter: u32,
}

impl SpinWait {
    #[inline]
    pub(crate) const fn new() -> Self {
        Self { counter: 0 }
    }

    #[inline]
    pub(crate) fn reset(&mut self) {
        self.counter = 0;
    }

    /// Spin one round
    ///
    /// Returns false once the budget is spent and the caller should park.
    #[inline]
    pub(crate) fn spin(&mut self) -> bool {
        if self.counter >= SPIN_LIMIT {
            return false;
        }
        self.counter += 1;

        if self.counter <= TIGHT_SPIN_ROUNDS {
            for _ in 0..(1u32 << self.counter) {
                hint::spin_loop();
            }
        } else {
            thread::yield_now();
        }
        true
    }
}

/// Sleep backoff for polling with a deadline, doubling up to 1ms
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub(crate) struct SleepBackoff {
    next: std::time::Duration,
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
impl SleepBackoff {
    const MAX: std::time::Duration = std::time::Duration::from_millis(1);

    pub(crate) const fn new() -> Self {
        Self {
            next: std::time::Duration::from_micros(1),
        }
    }

    /// Sleep for the next backoff step, never past `remaining`
    pub(crate) fn sleep(&mut self, remaining: std::time::Duration) {
        thread::sleep(self.next.min(remaining));
        self.next = (self.next * 2).min(Self::MAX);
    }
}
