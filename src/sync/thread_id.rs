/*!
 * Thread Identity
 *
 * `std::thread::ThreadId` cannot be stored in an atomic, so the owner of a
 * recursive lock is recorded as the address of a thread-local. The address is
 * non-zero and unique among live threads, and 0 means "no owner".
 *
 * An exited thread's address can be handed to a thread spawned later. A
 * recursive lock still held by a thread that exited without unlocking may
 * therefore be re-entered by that later thread. Live threads never collide.
 */

use std::num::NonZeroUsize;

thread_local! {
    static ANCHOR: u8 = const { 0 };
}

/// Sentinel stored when no thread owns the lock
pub(crate) const NO_OWNER: usize = 0;

/// Identity of the calling thread
#[inline]
pub(crate) fn current() -> NonZeroUsize {
    let addr = ANCHOR.with(|anchor| anchor as *const u8 as usize);
    // A reference is never null
    NonZeroUsize::new(addr).unwrap_or(NonZeroUsize::MIN)
}
