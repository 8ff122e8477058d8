/*!
 * lanebench - lane dispatch overhead micro-benchmark
 *
 * Runs many short-lived prime-sieve tasks either sequentially or as
 * independently scheduled worker lanes split across two priority classes,
 * validates every result against a pinned checkpoint, and reports through
 * the error stream:
 * - Lazy producer/filter sieve pipeline with explicit iterator state
 * - Capability-whitelisted lane factories with bounded priorities
 * - Copy-in/copy-out worker isolation over bounded channels
 * - Submission-order joins, one-time core affinity, optional wall timing
 */

pub mod config;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod harness;
pub mod lane;
pub mod logging;
pub mod sieve;
pub mod sys;

// Re-export commonly used types
pub use config::{ExecutionConfig, ParsedArgs, PriorityPair, RunMode};
pub use console::{Console, ConsoleCaps};
pub use dispatch::{join_all, run_sequential, Dispatcher};
pub use error::{BenchError, Result};
pub use harness::{Harness, RunSummary};
pub use lane::{Capability, CapabilitySet, LaneFactory, LaneHandle, LaneState, Task, TaskError};
pub use sieve::{sieve, Checkpoint, PrimeSet, CHECKPOINT_1000};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
