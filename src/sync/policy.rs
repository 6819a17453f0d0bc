/*!
 * Unlock Misuse Policy
 *
 * Unlocking a recursive or shared lock that the caller does not hold is a
 * protocol error. How it is reported is fixed at compile time:
 *
 * - [`Strict`]: return [`LockError::UnlockWithoutLock`] (diagnostic builds)
 * - [`Lenient`]: ignore the call (production builds)
 *
 * [`DefaultPolicy`] is `Strict` with `debug_assertions` or the
 * `strict-unlock` feature, otherwise `Lenient`. Both are always available, so
 * either can be named explicitly as the lock's type parameter.
 */

use crate::errors::{LockError, LockResult};
use tracing::error;

/// Compile-time reaction to an unmatched unlock
pub trait UnlockPolicy: Send + Sync + 'static {
    /// Policy name for debugging
    const NAME: &'static str;

    /// Called instead of releasing when the caller holds nothing
    fn on_misuse(primitive: &'static str) -> LockResult<()>;
}

/// Report misuse as an error
#[derive(Debug, Clone, Copy, Default)]
pub struct Strict;

impl UnlockPolicy for Strict {
    const NAME: &'static str = "strict";

    #[cold]
    fn on_misuse(primitive: &'static str) -> LockResult<()> {
        error!(primitive, "unlock called without a matching lock");
        Err(LockError::UnlockWithoutLock { primitive })
    }
}

/// Ignore misuse
#[derive(Debug, Clone, Copy, Default)]
pub struct Lenient;

impl UnlockPolicy for Lenient {
    const NAME: &'static str = "lenient";

    #[inline]
    fn on_misuse(_primitive: &'static str) -> LockResult<()> {
        Ok(())
    }
}

/// Policy used when none is named
#[cfg(any(debug_assertions, feature = "strict-unlock"))]
pub type DefaultPolicy = Strict;

/// Policy used when none is named
#[cfg(not(any(debug_assertions, feature = "strict-unlock")))]
pub type DefaultPolicy = Lenient;
