/*!
 * Timeout to Deadline Conversion
 *
 * `sem_timedwait` takes an absolute `CLOCK_REALTIME` timestamp. The timeout
 * is added to "now" with full nanosecond precision; the result is normalized
 * so `0 <= tv_nsec < 1_000_000_000` and saturates instead of overflowing.
 */

use crate::errors::{LockError, LockResult};
use nix::time::{clock_gettime, ClockId};
use std::time::Duration;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Absolute realtime deadline `timeout` from now
pub(crate) fn deadline_after(timeout: Duration) -> LockResult<libc::timespec> {
    let now = clock_gettime(ClockId::CLOCK_REALTIME).map_err(|errno| LockError::Os {
        op: "clock_gettime",
        errno,
    })?;
    Ok(add_timeout(now.tv_sec() as i64, now.tv_nsec() as i64, timeout))
}

/// `now + timeout` as a normalized `timespec`
pub(crate) fn add_timeout(now_sec: i64, now_nsec: i64, timeout: Duration) -> libc::timespec {
    let max_sec = libc::time_t::MAX as i64;
    let timeout_sec = i64::try_from(timeout.as_secs()).unwrap_or(i64::MAX);

    let mut sec = now_sec.saturating_add(timeout_sec);
    let mut nsec = now_nsec + i64::from(timeout.subsec_nanos());
    if nsec >= NANOS_PER_SEC {
        nsec -= NANOS_PER_SEC;
        sec = sec.saturating_add(1);
    }

    if sec >= max_sec {
        // Far enough in the future to be "forever"
        sec = max_sec;
        nsec = NANOS_PER_SEC - 1;
    }

    libc::timespec {
        tv_sec: sec as libc::time_t,
        tv_nsec: nsec as _,
    }
}

/// Time left until `deadline`, zero once it has passed
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub(crate) fn remaining_until(deadline: &libc::timespec) -> LockResult<Duration> {
    let now = clock_gettime(ClockId::CLOCK_REALTIME).map_err(|errno| LockError::Os {
        op: "clock_gettime",
        errno,
    })?;
    let deadline_ns = i128::from(deadline.tv_sec as i64) * i128::from(NANOS_PER_SEC)
        + i128::from(deadline.tv_nsec as i64);
    let now_ns = i128::from(now.tv_sec() as i64) * i128::from(NANOS_PER_SEC)
        + i128::from(now.tv_nsec() as i64);
    let left = (deadline_ns - now_ns).max(0);
    Ok(Duration::from_nanos(u64::try_from(left).unwrap_or(u64::MAX)))
}
