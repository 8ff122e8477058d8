/*!
 * Execution configuration and the command-line grammar
 */

use std::cmp::Ordering;

use crate::error::{BenchError, Result};
use crate::sys::priority;

/// Tasks run when no count is given
pub const DEFAULT_ITERATIONS: usize = 1000;

/// Upper bound every sieve task computes to
pub const SIEVE_BOUND: u32 = 1000;

/// Priorities selected by a bare `-prio`
pub const BARE_PRIO_ODD: i32 = 2;
pub const BARE_PRIO_EVEN: i32 = -2;

/// How the batch is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Sequential baseline, no factories or workers
    Plain,
    /// One lane per task across the two priority classes
    Concurrent,
}

/// Scheduling priorities for the two task classes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityPair {
    pub odd: i32,
    pub even: i32,
}

impl PriorityPair {
    /// Plain-language reading of the pair, used in the mode line.
    pub fn relationship(&self) -> &'static str {
        match self.odd.cmp(&self.even) {
            Ordering::Greater => "ODD lanes should come first",
            Ordering::Less => "EVEN lanes should come first",
            Ordering::Equal => "no lane class is favored",
        }
    }
}

/// Validated run parameters, built once before the run starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Number of tasks to run (N)
    pub iterations: usize,
    /// Sieve bound for every task (M)
    pub bound: u32,
    pub mode: RunMode,
    /// Restrict the process to this many cores, `None` for unrestricted
    pub core_limit: Option<usize>,
    pub priorities: PriorityPair,
    /// Report wall time for the whole batch
    pub timing: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            bound: SIEVE_BOUND,
            mode: RunMode::Concurrent,
            core_limit: None,
            priorities: PriorityPair::default(),
            timing: false,
        }
    }
}

/// Parse outcome: the config plus any non-fatal usage hints to print
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArgs {
    pub config: ExecutionConfig,
    pub warnings: Vec<String>,
}

pub fn usage() -> &'static str {
    "usage: lanebench [N] [-plain] [-single[=cores]] [-time] [-prio[=odd[,even]]]"
}

fn hint(problem: &str) -> String {
    format!("lanebench: {} ({})", problem, usage())
}

/// Scan argv left to right.
///
/// Unknown flags and a non-numeric count produce a one-line hint and are
/// ignored; a malformed `-prio` value is fatal because it would silently
/// change what the run measures. The last numeric positional wins.
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<ParsedArgs> {
    let mut config = ExecutionConfig::default();
    let mut warnings = Vec::new();

    for arg in args {
        let arg = arg.as_ref();
        if let Some(flag) = arg.strip_prefix('-') {
            let (name, value) = match flag.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (flag, None),
            };
            match (name, value) {
                ("plain", None) => config.mode = RunMode::Plain,
                ("time", None) => config.timing = true,
                ("single", value) => match parse_core_limit(value) {
                    Some(limit) => config.core_limit = Some(limit),
                    None => warnings.push(hint(&format!(
                        "-single needs a positive core count, ignoring \"{}\"",
                        arg
                    ))),
                },
                ("prio", value) => config.priorities = parse_priorities(value)?,
                _ => warnings.push(hint(&format!("unknown flag \"{}\"", arg))),
            }
        } else {
            match arg.parse::<usize>() {
                Ok(count) => config.iterations = count,
                Err(_) => warnings.push(hint(&format!(
                    "iteration count must be a number, ignoring \"{}\"",
                    arg
                ))),
            }
        }
    }

    Ok(ParsedArgs { config, warnings })
}

fn parse_core_limit(value: Option<&str>) -> Option<usize> {
    match value {
        None => Some(1),
        Some(text) => match text.parse::<usize>() {
            Ok(limit) if limit >= 1 => Some(limit),
            _ => None,
        },
    }
}

/// The `-prio` grammar: bare sets odd +2 / even -2, one value sets only the
/// odd class and leaves even at 0 (asymmetric on purpose, see README), two
/// comma-separated values set both.
fn parse_priorities(value: Option<&str>) -> Result<PriorityPair> {
    let Some(text) = value else {
        return Ok(PriorityPair {
            odd: BARE_PRIO_ODD,
            even: BARE_PRIO_EVEN,
        });
    };

    let fields: Vec<&str> = text.split(',').collect();
    match fields.as_slice() {
        [odd] => Ok(PriorityPair {
            odd: parse_priority_field(odd)?,
            even: 0,
        }),
        [odd, even] => Ok(PriorityPair {
            odd: parse_priority_field(odd)?,
            even: parse_priority_field(even)?,
        }),
        _ => Err(BenchError::Config(format!(
            "-prio takes at most two values, got \"{}\"",
            text
        ))),
    }
}

fn parse_priority_field(text: &str) -> Result<i32> {
    let value = text
        .trim()
        .parse::<i32>()
        .map_err(|_| BenchError::Config(format!("invalid -prio value \"{}\"", text)))?;
    if !priority::in_range(value) {
        return Err(BenchError::Config(format!(
            "priority {} is outside {}..={}",
            value,
            priority::PRIORITY_MIN,
            priority::PRIORITY_MAX
        )));
    }
    Ok(value)
}
