/*!
 * Process Mutex
 *
 * Exclusive lock shared by every process that opens the same name, backed by
 * a POSIX named semaphore with an initial count of 1.
 *
 * # Handle Lifecycle
 *
 * By default the semaphore handle is closed after every unlock and reopened
 * by name on the next `lock`/`try_lock`, so a long-lived instance does not
 * keep the semaphore mapped between critical sections. Use
 * [`ProcessMutexConfig::persistent`] to keep it open until drop.
 *
 * The named semaphore itself outlives every instance; remove it with
 * [`ProcessMutex::unlink`].
 */

use super::deadline::deadline_after;
use crate::errors::{LockError, LockResult};
use crate::sync::config::ProcessMutexConfig;
use nix::errno::Errno;
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::ptr;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Raw OS semaphore handle (null while closed)
pub type NativeHandle = *mut libc::sem_t;

/// Cross-process exclusive lock identified by name
///
/// Operations take `&mut self`: one instance belongs to one thread at a time.
/// Threads or processes that want to contend each open their own instance with
/// the same name.
pub struct ProcessMutex {
    name: String,
    c_name: CString,
    handle: NativeHandle,
    locked: bool,
    config: ProcessMutexConfig,
}

// SAFETY: a sem_t handle may be used from any thread of the process; the
// instance is never shared without `&mut`.
unsafe impl Send for ProcessMutex {}

impl ProcessMutex {
    /// Open or create the named semaphore with the default configuration
    pub fn new(name: impl Into<String>) -> LockResult<Self> {
        Self::with_config(name, ProcessMutexConfig::default())
    }

    /// Open or create the named semaphore
    ///
    /// # Errors
    ///
    /// - [`LockError::EmptyName`] / [`LockError::InvalidName`] before any OS call
    /// - [`LockError::Os`] if `sem_open` fails
    pub fn with_config(name: impl Into<String>, config: ProcessMutexConfig) -> LockResult<Self> {
        let name = name.into();
        let c_name = validate_name(&name)?;
        let handle = open_semaphore(&c_name, config.mode)?;
        debug!(name = %name, mode = config.mode, "opened named semaphore");

        Ok(Self {
            name,
            c_name,
            handle,
            locked: false,
            config,
        })
    }

    /// Block until the semaphore is acquired
    ///
    /// Interrupted waits are retried. A no-op if this instance already holds
    /// the lock.
    pub fn lock(&mut self) -> LockResult<()> {
        if self.locked {
            return Ok(());
        }
        let sem = self.ensure_open()?;
        loop {
            // SAFETY: `sem` is an open handle returned by sem_open
            if unsafe { libc::sem_wait(sem) } == 0 {
                break;
            }
            match Errno::last() {
                Errno::EINTR => continue,
                errno => return Err(LockError::Os { op: "sem_wait", errno }),
            }
        }
        self.locked = true;
        trace!(name = %self.name, "process mutex acquired");
        Ok(())
    }

    /// Try to acquire without blocking, or within `timeout`
    ///
    /// - `None`: a single non-blocking attempt
    /// - `Some(d)`: wait until `now + d`; `Duration::ZERO` is one attempt
    ///   against a deadline that has already been reached
    ///
    /// Returns `Ok(false)` if the lock was not acquired. Returns `Ok(true)`
    /// without touching the semaphore if this instance already holds it.
    pub fn try_lock(&mut self, timeout: Option<Duration>) -> LockResult<bool> {
        if self.locked {
            return Ok(true);
        }
        let sem = self.ensure_open()?;
        let acquired = match timeout {
            None => try_wait(sem)?,
            Some(timeout) => timed_wait(sem, timeout)?,
        };
        if acquired {
            self.locked = true;
            trace!(name = %self.name, "process mutex acquired");
        }
        Ok(acquired)
    }

    /// Release the lock if this instance holds it
    ///
    /// Unlocking an instance that does not hold the lock is a no-op, so a
    /// double unlock cannot over-release the semaphore.
    pub fn unlock(&mut self) -> LockResult<()> {
        if !self.locked {
            return Ok(());
        }
        // SAFETY: the handle stays open while `locked` is set
        if unsafe { libc::sem_post(self.handle) } != 0 {
            return Err(LockError::last_os("sem_post"));
        }
        self.locked = false;
        trace!(name = %self.name, "process mutex released");

        if self.config.close_on_unlock {
            self.close()?;
        }
        Ok(())
    }

    /// Lock and return a guard that unlocks on drop
    pub fn lock_guard(&mut self) -> LockResult<ProcessMutexGuard<'_>> {
        self.lock()?;
        Ok(ProcessMutexGuard { mutex: self })
    }

    /// `try_lock` returning a guard on success
    pub fn try_lock_guard(
        &mut self,
        timeout: Option<Duration>,
    ) -> LockResult<Option<ProcessMutexGuard<'_>>> {
        if self.try_lock(timeout)? {
            Ok(Some(ProcessMutexGuard { mutex: self }))
        } else {
            Ok(None)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native_handle(&self) -> NativeHandle {
        self.handle
    }

    /// Whether this instance currently holds the lock
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn config(&self) -> &ProcessMutexConfig {
        &self.config
    }

    /// Remove a named semaphore from the system
    ///
    /// Open handles stay valid; later opens of the name create a new semaphore.
    pub fn unlink(name: &str) -> LockResult<()> {
        let c_name = validate_name(name)?;
        // SAFETY: c_name is a valid NUL-terminated string
        if unsafe { libc::sem_unlink(c_name.as_ptr()) } != 0 {
            return Err(LockError::last_os("sem_unlink"));
        }
        debug!(name, "unlinked named semaphore");
        Ok(())
    }

    fn ensure_open(&mut self) -> LockResult<NativeHandle> {
        if self.handle.is_null() {
            self.handle = open_semaphore(&self.c_name, self.config.mode)?;
            debug!(name = %self.name, "reopened named semaphore");
        }
        Ok(self.handle)
    }

    fn close(&mut self) -> LockResult<()> {
        let handle = std::mem::replace(&mut self.handle, ptr::null_mut());
        if handle.is_null() {
            return Ok(());
        }
        // SAFETY: handle came from sem_open and is closed exactly once
        if unsafe { libc::sem_close(handle) } != 0 {
            return Err(LockError::last_os("sem_close"));
        }
        debug!(name = %self.name, "closed named semaphore");
        Ok(())
    }
}

impl Drop for ProcessMutex {
    fn drop(&mut self) {
        if let Err(err) = self.unlock() {
            warn!(name = %self.name, error = %err, "failed to release process mutex on drop");
        }
        if let Err(err) = self.close() {
            warn!(name = %self.name, error = %err, "failed to close semaphore on drop");
        }
    }
}

impl std::fmt::Debug for ProcessMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessMutex")
            .field("name", &self.name)
            .field("locked", &self.locked)
            .field("open", &!self.handle.is_null())
            .field("config", &self.config)
            .finish()
    }
}

/// Holds a [`ProcessMutex`] locked until dropped
#[must_use = "the process mutex is released as soon as the guard is dropped"]
pub struct ProcessMutexGuard<'a> {
    mutex: &'a mut ProcessMutex,
}

impl ProcessMutexGuard<'_> {
    pub fn mutex(&self) -> &ProcessMutex {
        &*self.mutex
    }

    /// Release now and report failures instead of logging them
    pub fn unlock(self) -> LockResult<()> {
        let mut this = ManuallyDrop::new(self);
        this.mutex.unlock()
    }
}

impl Drop for ProcessMutexGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.mutex.unlock() {
            warn!(name = %self.mutex.name, error = %err, "failed to release process mutex guard");
        }
    }
}

fn validate_name(name: &str) -> LockResult<CString> {
    if name.is_empty() {
        return Err(LockError::EmptyName);
    }
    CString::new(name).map_err(|_| LockError::InvalidName(name.to_owned()))
}

fn open_semaphore(c_name: &CString, mode: u32) -> LockResult<NativeHandle> {
    // SAFETY: c_name is NUL-terminated; O_CREAT takes mode and initial value
    let handle = unsafe {
        libc::sem_open(
            c_name.as_ptr(),
            libc::O_CREAT,
            mode as libc::c_uint,
            1 as libc::c_uint,
        )
    };
    if handle == libc::SEM_FAILED {
        return Err(LockError::last_os("sem_open"));
    }
    Ok(handle)
}

/// Single non-blocking decrement
fn try_wait(sem: NativeHandle) -> LockResult<bool> {
    loop {
        // SAFETY: `sem` is an open handle
        if unsafe { libc::sem_trywait(sem) } == 0 {
            return Ok(true);
        }
        match Errno::last() {
            Errno::EAGAIN => return Ok(false),
            Errno::EINTR => continue,
            errno => return Err(LockError::Os { op: "sem_trywait", errno }),
        }
    }
}

/// Decrement before the realtime deadline `timeout` from now
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
fn timed_wait(sem: NativeHandle, timeout: Duration) -> LockResult<bool> {
    let deadline = deadline_after(timeout)?;
    loop {
        // SAFETY: `sem` is an open handle and `deadline` outlives the call
        if unsafe { libc::sem_timedwait(sem, &deadline) } == 0 {
            return Ok(true);
        }
        match Errno::last() {
            Errno::EINTR => continue,
            Errno::ETIMEDOUT => return Ok(false),
            errno => return Err(LockError::Os { op: "sem_timedwait", errno }),
        }
    }
}

/// Apple platforms lack `sem_timedwait`: poll with backoff until the deadline
#[cfg(any(target_os = "macos", target_os = "ios"))]
fn timed_wait(sem: NativeHandle, timeout: Duration) -> LockResult<bool> {
    use super::deadline::remaining_until;
    use crate::sync::spinwait::SleepBackoff;

    let deadline = deadline_after(timeout)?;
    let mut backoff = SleepBackoff::new();
    loop {
        if try_wait(sem)? {
            return Ok(true);
        }
        let remaining = remaining_until(&deadline)?;
        if remaining.is_zero() {
            return Ok(false);
        }
        backoff.sleep(remaining);
    }
}
