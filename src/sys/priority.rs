//! Best-effort scheduling priority for lane threads.
//!
//! Lane priorities live in a small signed range and map onto the host
//! scheduler's nice values. Application can fail (raising priority usually
//! needs privilege) and the lane must keep running unchanged when it does.

use std::io;

/// Lowest accepted lane priority.
pub const PRIORITY_MIN: i32 = -3;

/// Highest accepted lane priority.
pub const PRIORITY_MAX: i32 = 3;

/// Whether a priority lies in the accepted range.
pub fn in_range(priority: i32) -> bool {
    (PRIORITY_MIN..=PRIORITY_MAX).contains(&priority)
}

/// Apply a lane priority to the calling thread.
///
/// Higher lane priority maps to a lower nice value. On Linux, nice is a
/// per-thread attribute and `who = 0` targets the calling thread, so each
/// lane applies its own value right after it starts.
#[cfg(target_os = "linux")]
pub fn apply_to_current_thread(priority: i32) -> io::Result<()> {
    let nice = -priority;
    // SAFETY: setpriority with PRIO_PROCESS/0 only touches the calling
    // thread's nice value; returns 0 on success, -1 with errno on failure.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS as _, 0, nice) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn apply_to_current_thread(_priority: i32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "thread priority is not supported on this platform",
    ))
}
