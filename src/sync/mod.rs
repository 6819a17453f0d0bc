/*!
 * Synchronization Primitives
 *
 * Mutual-exclusion primitives built on atomics and OS wait/wake:
 * - Spinlock: pure busy-wait for very short critical sections
 * - Mutex: futex-style parking on contention
 * - RecursiveMutex: reentrant for the owning thread
 * - SharedMutex: reader-preferring reader/writer lock
 * - ProcessMutex: named semaphore shared across processes
 *
 * # Architecture
 *
 * The parking locks share one internal building block: a held flag whose
 * address doubles as the parking key (`parking_lot_core`). Each primitive
 * owns its state; there is no global registry.
 *
 * # Performance
 *
 * - Lock-free fast paths (one atomic op to lock, one to unlock)
 * - Bounded spinning before parking
 * - Unlock only enters the parking lot when a waiter announced itself
 */

mod config;
mod futex;
mod locks;
mod policy;
mod process;
mod spinwait;
mod thread_id;

pub use config::{ProcessMutexConfig, DEFAULT_SEMAPHORE_MODE, SPIN_LIMIT};
pub use locks::{
    FlagMutex, Mutex, ReaderWriterLock, RecursiveMutex, SharedMutex, SpinMutex, Spinlock,
};
pub use policy::{DefaultPolicy, Lenient, Strict, UnlockPolicy};
pub use process::{NativeHandle, ProcessMutex, ProcessMutexGuard};
