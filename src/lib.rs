/*!
 * Lockkit
 * Atomic in-process locks and a named-semaphore cross-process mutex
 */

pub mod errors;
pub mod sync;

// Re-exports
pub use errors::{LockError, LockResult};
pub use sync::{
    DefaultPolicy, FlagMutex, Lenient, Mutex, ProcessMutex, ProcessMutexConfig,
    ProcessMutexGuard, ReaderWriterLock, RecursiveMutex, SharedMutex, SpinMutex, Spinlock,
    Strict, UnlockPolicy,
};
