//! Core affinity restriction for the measured run.
//!
//! The mask binds the thread that applies it and threads spawned afterwards
//! inherit it, so the dispatcher restricts itself once before any lane is
//! spawned. Container and taskset limits are respected by restricting within
//! the currently *allowed* set instead of assuming CPUs 0..n exist.

use std::io;

/// Maximum core index the affinity mask can describe.
///
/// `cpu_set_t` is a fixed-size bitmask; indices must stay below this to keep
/// the `CPU_SET` macro in bounds.
#[cfg(target_os = "linux")]
pub const CPU_SET_CAPACITY: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;

#[cfg(not(target_os = "linux"))]
pub const CPU_SET_CAPACITY: usize = 1024;

/// Number of CPUs usable for parallelism, respecting cgroup and mask limits.
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Core indices the process is currently allowed to run on, ascending.
#[cfg(target_os = "linux")]
pub fn allowed_cores() -> io::Result<Vec<usize>> {
    // SAFETY: a zeroed cpu_set_t is a valid (empty) mask for the kernel to
    // fill; pid 0 queries the calling thread.
    let mut set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    let rc =
        unsafe { libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &mut set) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    let mut cores = Vec::new();
    for core in 0..CPU_SET_CAPACITY {
        // SAFETY: core is below CPU_SET_CAPACITY, so CPU_ISSET stays in
        // bounds of the mask.
        if unsafe { libc::CPU_ISSET(core, &set) } {
            cores.push(core);
        }
    }
    Ok(cores)
}

#[cfg(not(target_os = "linux"))]
pub fn allowed_cores() -> io::Result<Vec<usize>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "CPU affinity is not supported on this platform",
    ))
}

/// Restrict the calling thread (and every thread it spawns afterwards) to the
/// first `limit` cores of the allowed set.
///
/// Returns the number of cores actually kept, which is smaller than `limit`
/// when fewer cores are allowed.
#[cfg(target_os = "linux")]
pub fn restrict_to_cores(limit: usize) -> io::Result<usize> {
    if limit == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "core limit must be at least 1",
        ));
    }

    let keep: Vec<usize> = allowed_cores()?.into_iter().take(limit).collect();
    if keep.is_empty() {
        return Err(io::Error::other("the allowed CPU set is empty"));
    }

    // SAFETY: a zeroed cpu_set_t is valid and every index in `keep` came from
    // the kernel-reported mask, so it is below CPU_SET_CAPACITY. pid 0
    // targets the calling thread; lanes spawned later inherit the new mask.
    let mut set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    unsafe { libc::CPU_ZERO(&mut set) };
    for &core in &keep {
        unsafe { libc::CPU_SET(core, &mut set) };
    }
    let rc = unsafe { libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(keep.len())
}

#[cfg(not(target_os = "linux"))]
pub fn restrict_to_cores(_limit: usize) -> io::Result<usize> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "CPU affinity is not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_cores_is_positive() {
        assert!(available_cores() >= 1);
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let err = restrict_to_cores(0).unwrap_err();
        #[cfg(target_os = "linux")]
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        #[cfg(not(target_os = "linux"))]
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_allowed_cores_nonempty_and_ascending() {
        let cores = allowed_cores().unwrap();
        assert!(!cores.is_empty());
        assert!(cores.windows(2).all(|w| w[0] < w[1]));
        assert!(cores.iter().all(|&c| c < CPU_SET_CAPACITY));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_restrict_caps_at_allowed_count() {
        // Restricting to far more cores than exist keeps the full allowed
        // set, so this thread's mask does not actually shrink. Both calls
        // address the calling thread only, so parallel tests cannot
        // interleave with the read-then-restrict pair.
        let allowed = allowed_cores().unwrap().len();
        let kept = restrict_to_cores(usize::MAX).unwrap();
        assert_eq!(kept, allowed);
    }

    #[test]
    #[cfg(not(target_os = "linux"))]
    fn test_unsupported_off_linux() {
        assert_eq!(
            allowed_cores().unwrap_err().kind(),
            io::ErrorKind::Unsupported
        );
        assert_eq!(
            restrict_to_cores(1).unwrap_err().kind(),
            io::ErrorKind::Unsupported
        );
    }
}
