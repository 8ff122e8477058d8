//! Worker lanes: isolated threads running one pipeline task each.
//!
//! A lane is spawned from a factory that fixes the worker's capability grants
//! and scheduling priority up front. Arguments cross into the lane by copy and
//! the result crosses back by value over a channel; the only shared resource a
//! lane can reach is the status channel its grant covers.

use std::thread;

use crossbeam_channel::{bounded, Receiver};
use thiserror::Error;
use tracing::debug;

use crate::console::Console;
use crate::error::{BenchError, Result};
use crate::sieve::{sieve, PrimeSet};
use crate::sys::priority;

/// One facility a lane body may be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Run the sieve pipeline.
    Compute,
    /// Emit single-token ready markers on the status channel.
    StatusToken,
    /// Read the monotonic clock.
    Clock,
}

impl Capability {
    const fn bit(self) -> u8 {
        match self {
            Capability::Compute => 1 << 0,
            Capability::StatusToken => 1 << 1,
            Capability::Clock => 1 << 2,
        }
    }
}

/// Explicit whitelist of facilities granted to a lane body.
///
/// Checked once, at factory construction; a running lane never re-validates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The grants the fixed sieve payload needs: compute plus status markers.
    pub const fn standard() -> Self {
        Self(Capability::Compute.bit() | Capability::StatusToken.bit())
    }

    #[must_use]
    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn covers(self, required: &[Capability]) -> bool {
        required.iter().all(|&capability| self.contains(capability))
    }
}

/// Facilities the sieve payload uses; factories must grant at least these.
pub const REQUIRED_CAPABILITIES: &[Capability] =
    &[Capability::Compute, Capability::StatusToken];

/// Priority class of a task, derived from its 1-based index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneClass {
    Odd,
    Even,
}

impl LaneClass {
    pub fn of_index(index: usize) -> Self {
        if index % 2 == 1 {
            LaneClass::Odd
        } else {
            LaneClass::Even
        }
    }

    /// Ready marker written when a task of this class completes.
    pub fn marker(self) -> char {
        match self {
            LaneClass::Odd => 'o',
            LaneClass::Even => 'e',
        }
    }
}

/// One unit of work: sieve all primes up to `bound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub id: usize,
    pub bound: u32,
    pub class: LaneClass,
}

impl Task {
    pub fn new(id: usize, bound: u32) -> Self {
        Self {
            id,
            bound,
            class: LaneClass::of_index(id),
        }
    }
}

/// Failure inside a lane, surfaced when the handle is joined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("worker panicked: {reason}")]
    Panicked { reason: String },

    #[error("lane ended without delivering a result")]
    Disconnected,
}

/// Handles a lane body may use, assembled from the factory's grants.
///
/// A facility the whitelist does not cover is simply absent here, so the body
/// has no way to reach it.
#[derive(Debug, Clone)]
pub struct LaneContext {
    status: Option<Console>,
}

impl LaneContext {
    fn from_grants(caps: CapabilitySet, console: &Console) -> Self {
        Self {
            status: caps
                .contains(Capability::StatusToken)
                .then(|| console.clone()),
        }
    }

    /// Context with every grant, for code running outside any lane (the
    /// sequential baseline drives the same payload directly).
    pub(crate) fn full(console: &Console) -> Self {
        Self {
            status: Some(console.clone()),
        }
    }

    fn emit_marker(&self, class: LaneClass) {
        if let Some(console) = &self.status {
            console.token(class.marker());
        }
    }
}

/// The fixed lane payload: sieve the task's bound, then report readiness.
///
/// The marker goes out before the result is delivered, so a joined handle
/// implies its marker is already on the status channel.
pub(crate) fn run_task(ctx: &LaneContext, task: Task) -> PrimeSet {
    let set = sieve(task.bound);
    ctx.emit_marker(task.class);
    set
}

/// Validated template for spawning lanes of one priority class.
#[derive(Debug)]
pub struct LaneFactory {
    caps: CapabilitySet,
    priority: i32,
    context: LaneContext,
}

impl LaneFactory {
    /// Validate grants and priority once; spawned lanes reuse them unchecked.
    pub fn new(caps: CapabilitySet, lane_priority: i32, console: &Console) -> Result<Self> {
        if !priority::in_range(lane_priority) {
            return Err(BenchError::Config(format!(
                "lane priority {} is outside {}..={}",
                lane_priority,
                priority::PRIORITY_MIN,
                priority::PRIORITY_MAX
            )));
        }
        if !caps.covers(REQUIRED_CAPABILITIES) {
            return Err(BenchError::Config(
                "capability set does not cover the sieve payload".to_string(),
            ));
        }
        Ok(Self {
            caps,
            priority: lane_priority,
            context: LaneContext::from_grants(caps, console),
        })
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn caps(&self) -> CapabilitySet {
        self.caps
    }

    /// Start one lane for `task` and return immediately with a running handle.
    pub fn spawn(&self, task: Task) -> Result<LaneHandle> {
        let (sender, receiver) = bounded(1);
        let ctx = self.context.clone();
        let lane_priority = self.priority;
        let worker = thread::Builder::new()
            .name(format!("lane-{}", task.id))
            .spawn(move || {
                apply_priority(task.id, lane_priority);
                let result = run_task(&ctx, task);
                // The send only fails if the handle was dropped unjoined, and
                // then nothing is waiting for the result.
                let _ = sender.send(result);
            })
            .map_err(|source| BenchError::Spawn {
                task_id: task.id,
                source,
            })?;

        debug!(task_id = task.id, class = ?task.class, "lane dispatched");

        Ok(LaneHandle {
            task,
            receiver,
            worker: Some(worker),
            outcome: None,
        })
    }
}

/// Apply the lane's priority hint on the worker thread itself.
fn apply_priority(task_id: usize, lane_priority: i32) {
    if lane_priority == 0 {
        return;
    }
    if let Err(err) = priority::apply_to_current_thread(lane_priority) {
        debug!(task_id, lane_priority, %err, "priority hint not applied");
    }
}

/// Observable lifecycle of a lane, as seen by the handle's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneState {
    Running,
    Completed,
    Failed,
}

/// Owner-side future for one spawned lane.
///
/// The factory hands the handle back already running. The first `join` blocks
/// for the result and caches it; the state is terminal from then on. Dropping
/// an unjoined handle detaches the lane, which still runs to completion.
pub struct LaneHandle {
    task: Task,
    receiver: Receiver<PrimeSet>,
    worker: Option<thread::JoinHandle<()>>,
    outcome: Option<std::result::Result<PrimeSet, TaskError>>,
}

impl LaneHandle {
    pub fn task(&self) -> Task {
        self.task
    }

    /// Lifecycle as observed through joins; a lane that finished but has not
    /// been joined yet still reads as running.
    pub fn state(&self) -> LaneState {
        match &self.outcome {
            None => LaneState::Running,
            Some(Ok(_)) => LaneState::Completed,
            Some(Err(_)) => LaneState::Failed,
        }
    }

    /// Block until the lane delivers, then return its result.
    ///
    /// Idempotent: later calls return the cached outcome. A panicking worker
    /// surfaces here as `TaskError::Panicked`, not at the panic site.
    pub fn join(&mut self) -> std::result::Result<PrimeSet, TaskError> {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let received = self.receiver.recv();
        let panicked = self.reap_worker();
        let outcome = match received {
            Ok(set) => Ok(set),
            Err(_) => Err(panicked.unwrap_or(TaskError::Disconnected)),
        };
        self.outcome = Some(outcome.clone());
        outcome
    }

    /// Join the worker thread, translating a panic payload if there was one.
    fn reap_worker(&mut self) -> Option<TaskError> {
        let worker = self.worker.take()?;
        match worker.join() {
            Ok(()) => None,
            Err(payload) => Some(TaskError::Panicked {
                reason: panic_reason(payload.as_ref()),
            }),
        }
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
