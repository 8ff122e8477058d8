//! Platform integration: core affinity and lane scheduling priority.
//!
//! Both knobs are scheduling hints, applied best-effort. Non-Linux platforms
//! report `Unsupported` rather than silently succeeding, so callers can log
//! that the measurement ran without them.

pub mod affinity;
pub mod priority;
