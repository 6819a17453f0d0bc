/*!
 * Error Types
 * Lock errors with thiserror and miette diagnostics
 */

use miette::Diagnostic;
use nix::errno::Errno;
use std::io;
use thiserror::Error;

/// Result type for lock operations
pub type LockResult<T> = Result<T, LockError>;

/// Errors surfaced by the lock primitives
///
/// Failing to acquire a lock on a non-blocking or timed attempt is not an
/// error; those calls report `Ok(false)`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum LockError {
    #[error("Name for a process mutex must be provided")]
    #[diagnostic(
        code(lock::empty_name),
        help("Pass a non-empty semaphore name such as \"/my-app-lock\".")
    )]
    EmptyName,

    #[error("Invalid process mutex name: {0:?}")]
    #[diagnostic(
        code(lock::invalid_name),
        help("Semaphore names cannot contain NUL bytes.")
    )]
    InvalidName(String),

    #[error("{op} failed: {errno}")]
    #[diagnostic(
        code(lock::os_error),
        help("The operating system rejected the semaphore operation. Check the errno.")
    )]
    Os { op: &'static str, errno: Errno },

    #[error("{primitive} unlocked without a matching lock")]
    #[diagnostic(
        code(lock::unlock_without_lock),
        help("Every unlock must pair with a successful lock by the same holder.")
    )]
    UnlockWithoutLock { primitive: &'static str },
}

impl LockError {
    /// Capture `errno` for a failed OS call
    #[inline]
    pub(crate) fn last_os(op: &'static str) -> Self {
        Self::Os {
            op,
            errno: Errno::last(),
        }
    }

    /// Underlying errno, if this is an OS error
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::Os { errno, .. } => Some(*errno),
            _ => None,
        }
    }

    /// Raw OS error code, if this is an OS error
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Os { errno, .. } => Some(*errno as i32),
            _ => None,
        }
    }

    /// Whether this is a caller mistake rather than an OS failure
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::EmptyName | Self::InvalidName(_))
    }
}

impl From<LockError> for io::Error {
    fn from(err: LockError) -> Self {
        match err.raw_os_error() {
            Some(code) => io::Error::from_raw_os_error(code),
            None if err.is_usage_error() => io::Error::new(io::ErrorKind::InvalidInput, err),
            None => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}
