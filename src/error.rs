/*!
 * Error types for lanebench
 */

use std::fmt;
use std::io;

use crate::lane::TaskError;
use crate::sieve::CheckpointFailure;

pub type Result<T> = std::result::Result<T, BenchError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_INTEGRITY: i32 = 3;

#[derive(Debug)]
pub enum BenchError {
    /// Invalid configuration rejected before the run starts
    Config(String),

    /// A joined result does not match the pinned checkpoint
    Checkpoint {
        task_id: usize,
        failure: CheckpointFailure,
    },

    /// A joined result violates the structural prime-sequence invariant
    Malformed { task_id: usize },

    /// A lane failed while computing its task
    Task { task_id: usize, source: TaskError },

    /// The OS refused to start a lane thread
    Spawn { task_id: usize, source: io::Error },

    /// I/O error
    Io(io::Error),
}

impl BenchError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            BenchError::Config(_) => EXIT_CONFIG,
            BenchError::Checkpoint { .. }
            | BenchError::Malformed { .. }
            | BenchError::Task { .. } => EXIT_INTEGRITY,
            BenchError::Spawn { .. } | BenchError::Io(_) => EXIT_FAILURE,
        }
    }

    /// Get error category for logging and instrumentation
    pub fn category(&self) -> ErrorCategory {
        match self {
            BenchError::Config(_) => ErrorCategory::Configuration,
            BenchError::Checkpoint { .. }
            | BenchError::Malformed { .. }
            | BenchError::Task { .. } => ErrorCategory::Integrity,
            BenchError::Spawn { .. } | BenchError::Io(_) => ErrorCategory::IoError,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration errors
    Configuration,
    /// Result integrity errors (checkpoint, failed lanes)
    Integrity,
    /// I/O and OS-level errors
    IoError,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Integrity => write!(f, "integrity"),
            ErrorCategory::IoError => write!(f, "io"),
        }
    }
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchError::Config(msg) => {
                write!(f, "configuration error: {}", msg)
            }
            BenchError::Checkpoint { task_id, failure } => {
                write!(f, "task {}: checkpoint failed: {}", task_id, failure)
            }
            BenchError::Malformed { task_id } => {
                write!(
                    f,
                    "task {}: result is not a well-formed prime sequence",
                    task_id
                )
            }
            BenchError::Task { task_id, source } => {
                write!(f, "task {}: {}", task_id, source)
            }
            BenchError::Spawn { task_id, source } => {
                write!(f, "task {}: failed to start lane: {}", task_id, source)
            }
            BenchError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
        }
    }
}

impl std::error::Error for BenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BenchError::Task { source, .. } => Some(source),
            BenchError::Spawn { source, .. } => Some(source),
            BenchError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for BenchError {
    fn from(err: io::Error) -> Self {
        BenchError::Io(err)
    }
}
