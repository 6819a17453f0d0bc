/*!
 * In-Process Locks
 *
 * Locks built directly on atomics:
 * - Spinlock: busy-wait, never parks
 * - Mutex: parks contended waiters, wakes all on unlock
 * - RecursiveMutex: Mutex that its owner may re-acquire
 * - SharedMutex: reader-preferring reader/writer lock
 *
 * None of them allocates or needs `Drop`; each is the sole owner of its state.
 */

mod mutex;
mod recursive;
mod shared;
mod spinlock;

// Re-export public API
pub use mutex::{FlagMutex, Mutex};
pub use recursive::RecursiveMutex;
pub use shared::{ReaderWriterLock, SharedMutex};
pub use spinlock::{SpinMutex, Spinlock};
