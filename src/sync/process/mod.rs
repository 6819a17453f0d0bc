/*!
 * Cross-Process Locking
 *
 * Named-semaphore mutex shared by every process that uses the same name.
 * Supports blocking, non-blocking and timed acquisition.
 */

mod deadline;
mod mutex;

pub use mutex::{NativeHandle, ProcessMutex, ProcessMutexGuard};
