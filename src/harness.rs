//! Run orchestration: mode selection, validation, timing, and the summary
//! lines on the status channel.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::{ExecutionConfig, RunMode};
use crate::console::{Console, ConsoleCaps};
use crate::dispatch::{self, Dispatcher};
use crate::error::{BenchError, Result};
use crate::lane::Task;
use crate::sieve::{checkpoint_for, PrimeSet};

/// Orchestrates one benchmark run over a validated configuration.
pub struct Harness {
    config: ExecutionConfig,
    console: Console,
}

/// What a finished run reports back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub mode: RunMode,
    pub tasks_run: usize,
    pub elapsed: Option<Duration>,
}

impl Harness {
    /// Harness over the process error stream; platform console capabilities
    /// are resolved here, exactly once per run.
    pub fn new(config: ExecutionConfig) -> Self {
        Self::with_console(config, Console::stderr(ConsoleCaps::detect()))
    }

    /// Harness over an arbitrary console. Tests run over a capture sink.
    pub fn with_console(config: ExecutionConfig, console: Console) -> Self {
        Self { config, console }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Run the whole batch.
    ///
    /// Emits the banner and mode line, executes N tasks in the configured
    /// mode, validates every result in join order, then writes the separator
    /// and the optional elapsed line. The clock brackets the batch only;
    /// validation is not timed.
    pub fn run(&self) -> Result<RunSummary> {
        let config = &self.config;
        self.console.line(&format!(
            "sieve bound {}, {} iterations",
            config.bound, config.iterations
        ));
        self.console.line(&self.mode_line());

        let tasks: Vec<Task> = (1..=config.iterations)
            .map(|id| Task::new(id, config.bound))
            .collect();

        let clock = config.timing.then(Instant::now);
        let results = match config.mode {
            RunMode::Plain => dispatch::run_sequential(&tasks, &self.console),
            RunMode::Concurrent => {
                let dispatcher = Dispatcher::new(config, &self.console)?;
                let handles = dispatcher.dispatch(&tasks)?;
                dispatch::join_all(handles)?
            }
        };
        let elapsed = clock.map(|started| started.elapsed());

        self.validate(&results)?;

        self.console.separator();
        if let Some(elapsed) = elapsed {
            self.console
                .line(&format!("elapsed: {:.3} s", elapsed.as_secs_f64()));
        }

        debug!(tasks = results.len(), mode = ?config.mode, "run complete");

        Ok(RunSummary {
            mode: config.mode,
            tasks_run: results.len(),
            elapsed,
        })
    }

    /// One line describing what is about to run, written before any dispatch.
    fn mode_line(&self) -> String {
        match self.config.mode {
            RunMode::Plain => "mode: sequential baseline".to_string(),
            RunMode::Concurrent => {
                let cores = match self.config.core_limit {
                    Some(limit) => limit.to_string(),
                    None => "all".to_string(),
                };
                let priorities = self.config.priorities;
                format!(
                    "mode: concurrent, cores: {}, prio: odd {:+}, even {:+} ({})",
                    cores,
                    priorities.odd,
                    priorities.even,
                    priorities.relationship()
                )
            }
        }
    }

    /// Every result must match the pinned checkpoint for the bound; bounds
    /// without one fall back to the structural invariant. The first failure
    /// aborts the run, with no partial report.
    fn validate(&self, results: &[PrimeSet]) -> Result<()> {
        let checkpoint = checkpoint_for(self.config.bound);
        for (index, set) in results.iter().enumerate() {
            let task_id = index + 1;
            match checkpoint {
                Some(checkpoint) => checkpoint
                    .verify(set)
                    .map_err(|failure| BenchError::Checkpoint { task_id, failure })?,
                None => {
                    if !set.is_well_formed() {
                        return Err(BenchError::Malformed { task_id });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PriorityPair;
    use crate::console::CaptureHandle;
    use crate::sieve::sieve;

    fn run_captured(config: ExecutionConfig) -> (Result<RunSummary>, CaptureHandle) {
        crate::logging::init_test_logging();
        let (console, capture) = Console::capture();
        let harness = Harness::with_console(config, console);
        (harness.run(), capture)
    }

    #[test]
    fn test_plain_run_output_shape() {
        let config = ExecutionConfig {
            iterations: 5,
            mode: RunMode::Plain,
            ..ExecutionConfig::default()
        };
        let (summary, capture) = run_captured(config);

        let summary = summary.unwrap();
        assert_eq!(summary.mode, RunMode::Plain);
        assert_eq!(summary.tasks_run, 5);
        assert_eq!(summary.elapsed, None);

        assert_eq!(
            capture.contents(),
            "sieve bound 1000, 5 iterations\nmode: sequential baseline\noeoeo\n\n"
        );
    }

    #[test]
    fn test_concurrent_run_output_shape() {
        let config = ExecutionConfig {
            iterations: 10,
            priorities: PriorityPair { odd: 2, even: -2 },
            timing: true,
            ..ExecutionConfig::default()
        };
        let (summary, capture) = run_captured(config);

        let summary = summary.unwrap();
        assert_eq!(summary.tasks_run, 10);
        assert!(summary.elapsed.is_some());

        let output = capture.contents();
        let lines: Vec<&str> = output.split('\n').collect();
        assert_eq!(lines[0], "sieve bound 1000, 10 iterations");
        assert_eq!(
            lines[1],
            "mode: concurrent, cores: all, prio: odd +2, even -2 (ODD lanes should come first)"
        );
        // Markers land in completion order; the separator leaves one blank
        // line before the elapsed report.
        assert_eq!(lines[2].len(), 10);
        assert_eq!(lines[2].chars().filter(|&c| c == 'o').count(), 5);
        assert_eq!(lines[2].chars().filter(|&c| c == 'e').count(), 5);
        assert_eq!(lines[3], "");
        assert!(lines[4].starts_with("elapsed: "));
        assert!(lines[4].ends_with(" s"));
    }

    #[test]
    fn test_mode_line_is_emitted_before_any_marker() {
        let config = ExecutionConfig {
            iterations: 4,
            ..ExecutionConfig::default()
        };
        let (summary, capture) = run_captured(config);
        summary.unwrap();

        // A marker written before the mode line would prefix it, since tokens
        // carry no newline of their own.
        let output = capture.contents();
        let lines: Vec<&str> = output.split('\n').collect();
        assert!(lines[0].starts_with("sieve bound"));
        assert!(lines[1].starts_with("mode: concurrent"));
        assert!(lines[2].chars().all(|c| c == 'o' || c == 'e'));
    }

    #[test]
    fn test_zero_iterations_is_a_clean_run() {
        let config = ExecutionConfig {
            iterations: 0,
            ..ExecutionConfig::default()
        };
        let (summary, capture) = run_captured(config);
        assert_eq!(summary.unwrap().tasks_run, 0);
        assert!(capture.contents().ends_with("\n\n"));
    }

    #[test]
    fn test_single_value_priority_mode_line() {
        let config = ExecutionConfig {
            iterations: 2,
            priorities: PriorityPair { odd: 3, even: 0 },
            core_limit: Some(2),
            ..ExecutionConfig::default()
        };
        let (summary, capture) = run_captured(config);
        summary.unwrap();
        assert!(capture.contents().contains(
            "mode: concurrent, cores: 2, prio: odd +3, even +0 (ODD lanes should come first)"
        ));
    }

    #[test]
    fn test_validation_accepts_non_checkpoint_bounds() {
        let config = ExecutionConfig {
            iterations: 3,
            bound: 100,
            mode: RunMode::Plain,
            ..ExecutionConfig::default()
        };
        let (summary, _capture) = run_captured(config);
        assert_eq!(summary.unwrap().tasks_run, 3);
    }

    #[test]
    fn test_validate_flags_the_failing_task() {
        let config = ExecutionConfig::default();
        let (console, _capture) = Console::capture();
        let harness = Harness::with_console(config, console);

        let results = vec![sieve(1000), sieve(1000), sieve(900)];
        let err = harness.validate(&results).unwrap_err();
        match err {
            BenchError::Checkpoint { task_id, .. } => assert_eq!(task_id, 3),
            other => panic!("expected checkpoint failure, got {other}"),
        }
    }

    #[test]
    fn test_timing_line_only_when_requested() {
        let config = ExecutionConfig {
            iterations: 2,
            mode: RunMode::Plain,
            ..ExecutionConfig::default()
        };
        let (_, capture) = run_captured(config);
        assert!(!capture.contents().contains("elapsed:"));
    }
}
