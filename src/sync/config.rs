/*!
 * Synchronization Configuration
 *
 * Spin budgets for the in-process locks and open options for process mutexes
 */

/// Spin rounds before a contended waiter parks
pub const SPIN_LIMIT: u32 = 10;

/// Rounds of pure `spin_loop()` before switching to `yield_now()`
pub(crate) const TIGHT_SPIN_ROUNDS: u32 = 3;

/// Permission bits used when creating a named semaphore
pub const DEFAULT_SEMAPHORE_MODE: u32 = 0o666;

/// Process mutex configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMutexConfig {
    /// Permission bits for a newly created semaphore (subject to umask)
    pub mode: u32,
    /// Close the semaphore handle after every unlock
    ///
    /// The next `lock()` or `try_lock()` reopens it by name.
    pub close_on_unlock: bool,
}

impl Default for ProcessMutexConfig {
    fn default() -> Self {
        Self {
            mode: DEFAULT_SEMAPHORE_MODE,
            close_on_unlock: true,
        }
    }
}

impl ProcessMutexConfig {
    /// Keep the handle open from construction until drop
    pub const fn persistent() -> Self {
        Self {
            mode: DEFAULT_SEMAPHORE_MODE,
            close_on_unlock: false,
        }
    }

    /// Use different permission bits for creation
    pub const fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }
}
