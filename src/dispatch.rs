//! Task dispatch across the two priority classes.
//!
//! The dispatcher owns one factory per class and fans tasks out without
//! waiting between spawns. Joining is a separate, strictly ordered step, so
//! results always line up with submission order no matter when each lane
//! finishes.

use tracing::{debug, warn};

use crate::config::ExecutionConfig;
use crate::console::Console;
use crate::error::{BenchError, Result};
use crate::lane::{
    run_task, CapabilitySet, LaneClass, LaneContext, LaneFactory, LaneHandle, Task,
};
use crate::sieve::PrimeSet;
use crate::sys::affinity;

/// Routes each task to the factory of its class.
#[derive(Debug)]
pub struct Dispatcher {
    odd: LaneFactory,
    even: LaneFactory,
}

impl Dispatcher {
    /// Build both class factories and apply the one-time core restriction.
    ///
    /// The affinity mask binds the dispatching thread and every lane spawned
    /// afterwards inherits it, so it is set here, before the first dispatch,
    /// and never touched again.
    pub fn new(config: &ExecutionConfig, console: &Console) -> Result<Self> {
        if let Some(limit) = config.core_limit {
            apply_core_limit(limit);
        }
        let caps = CapabilitySet::standard();
        Ok(Self {
            odd: LaneFactory::new(caps, config.priorities.odd, console)?,
            even: LaneFactory::new(caps, config.priorities.even, console)?,
        })
    }

    /// Spawn one lane per task, in input order, without waiting in between.
    ///
    /// Handles come back in submission order; completion order is up to the
    /// scheduler.
    pub fn dispatch(&self, tasks: &[Task]) -> Result<Vec<LaneHandle>> {
        let mut handles = Vec::with_capacity(tasks.len());
        for &task in tasks {
            let factory = match task.class {
                LaneClass::Odd => &self.odd,
                LaneClass::Even => &self.even,
            };
            handles.push(factory.spawn(task)?);
        }
        Ok(handles)
    }
}

/// Join every handle in submission order and collect the results.
///
/// A lane that finishes early parks its result in its channel until its turn
/// comes. The first failure aborts the batch.
pub fn join_all(handles: Vec<LaneHandle>) -> Result<Vec<PrimeSet>> {
    let mut results = Vec::with_capacity(handles.len());
    for mut handle in handles {
        let task_id = handle.task().id;
        match handle.join() {
            Ok(set) => results.push(set),
            Err(source) => return Err(BenchError::Task { task_id, source }),
        }
    }
    Ok(results)
}

/// Sequential baseline: run every task's payload inline.
///
/// No factories and no worker threads, but the same payload and the same
/// observable marker stream as the dispatched path.
pub fn run_sequential(tasks: &[Task], console: &Console) -> Vec<PrimeSet> {
    let ctx = LaneContext::full(console);
    tasks.iter().map(|&task| run_task(&ctx, task)).collect()
}

/// Best-effort core restriction; failure downgrades the measurement setup,
/// never the results.
fn apply_core_limit(limit: usize) {
    let available = affinity::available_cores();
    match affinity::restrict_to_cores(limit) {
        Ok(kept) => debug!(limit, kept, available, "core affinity restricted"),
        Err(err) => warn!(limit, available, %err, "core limit not applied"),
    }
}
