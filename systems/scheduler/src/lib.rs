#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Concurrent driver that runs one worker thread per adventurer.
//!
//! Workers only interact through [`Simulation::step`], so the locking rules of
//! the simulation are the only synchronisation between adventurers. In
//! [`ScheduleMode::FreeRunning`] every worker keeps its own fixed-rate cadence.
//! In [`ScheduleMode::LockStep`] all workers step once per round and meet on a
//! barrier; the barrier leader decides whether another round follows. Lock-step
//! workers only enter the first round once every worker has been spawned.

use std::{
    any::Any,
    io,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Barrier, Condvar, Mutex, PoisonError,
    },
    thread,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use treasure_map_core::{AdventurerId, SimulationError, StepOutcome};
use treasure_map_system_simulation::Simulation;

const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Strategy used to pace the worker threads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleMode {
    /// Every adventurer steps on its own timer.
    #[default]
    FreeRunning,
    /// Adventurers step once per shared round.
    LockStep,
}

/// Pacing parameters of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    cadence: Duration,
    mode: ScheduleMode,
}

impl SchedulerConfig {
    /// Creates a configuration with the provided cadence and mode.
    #[must_use]
    pub const fn new(cadence: Duration, mode: ScheduleMode) -> Self {
        Self { cadence, mode }
    }

    /// Delay between two consecutive steps of one adventurer.
    #[must_use]
    pub const fn cadence(&self) -> Duration {
        self.cadence
    }

    /// Pacing strategy.
    #[must_use]
    pub const fn mode(&self) -> ScheduleMode {
        self.mode
    }

    /// Returns a copy using the provided cadence.
    #[must_use]
    pub const fn with_cadence(self, cadence: Duration) -> Self {
        Self { cadence, ..self }
    }

    /// Returns a copy using the provided mode.
    #[must_use]
    pub const fn with_mode(self, mode: ScheduleMode) -> Self {
        Self { mode, ..self }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), ScheduleMode::FreeRunning)
    }
}

/// Shared flag asking every worker to stop before its next step.
///
/// Cancellation never interrupts a step that is already executing.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Every clone observes the request.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Reports whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Summary of a completed or cancelled run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Steps that consumed a path symbol.
    pub steps: u64,
    /// Advances that changed cell.
    pub moves: u64,
    /// Advances refused by an edge, a blocked cell or another adventurer.
    pub bounces: u64,
    /// Rotations in either direction.
    pub turns: u64,
    /// Malformed symbols that were skipped.
    pub rejected: u64,
    /// Rewards picked up while moving.
    pub collected: u64,
    /// Lock-step rounds, or the longest per-adventurer step count when
    /// free-running.
    pub rounds: u64,
    /// Whether cancellation was requested before every path completed.
    pub cancelled: bool,
    /// Whether every adventurer completed its path.
    pub finished: bool,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl RunReport {
    fn record(&mut self, outcome: &StepOutcome) {
        match outcome {
            StepOutcome::Idle { .. } => return,
            StepOutcome::Moved { collected, .. } => {
                self.moves += 1;
                self.collected += u64::from(*collected);
            }
            StepOutcome::Bounced { .. } => self.bounces += 1,
            StepOutcome::Turned { .. } => self.turns += 1,
            StepOutcome::Rejected { .. } => self.rejected += 1,
        }
        self.steps += 1;
    }

    fn absorb(&mut self, worker: &Self) {
        self.steps += worker.steps;
        self.moves += worker.moves;
        self.bounces += worker.bounces;
        self.turns += worker.turns;
        self.rejected += worker.rejected;
        self.collected += worker.collected;
        self.rounds = self.rounds.max(worker.rounds);
    }
}

/// Errors raised while driving a run.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The operating system refused to start a worker thread.
    #[error("failed to spawn the worker of {adventurer}")]
    Spawn {
        /// Adventurer the worker was meant to drive.
        adventurer: AdventurerId,
        /// Underlying spawn failure.
        #[source]
        source: io::Error,
    },
    /// A worker observed a simulation failure.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    /// A worker thread panicked.
    #[error("the worker of {adventurer} panicked")]
    WorkerPanicked {
        /// Adventurer the worker was driving.
        adventurer: AdventurerId,
    },
}

/// Drives a [`Simulation`] to completion on one thread per adventurer.
#[derive(Clone, Copy, Debug, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    /// Creates a scheduler using the provided configuration.
    #[must_use]
    pub const fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Configuration used by the scheduler.
    #[must_use]
    pub const fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Runs every adventurer until all paths complete or the token is
    /// cancelled, blocking the calling thread until every worker exits.
    pub fn run(
        &self,
        simulation: &Simulation,
        token: &CancellationToken,
    ) -> Result<RunReport, SchedulerError> {
        let started = Instant::now();
        info!(
            mode = ?self.config.mode,
            cadence = ?self.config.cadence,
            adventurers = simulation.adventurer_count(),
            "scheduler starting"
        );

        let mut report = if simulation.is_finished()? {
            RunReport::default()
        } else {
            match self.config.mode {
                ScheduleMode::FreeRunning => self.run_free(simulation, token)?,
                ScheduleMode::LockStep => self.run_lock_step(simulation, token)?,
            }
        };

        report.finished = simulation.is_finished()?;
        report.cancelled = token.is_cancelled() && !report.finished;
        report.elapsed = started.elapsed();

        if report.cancelled {
            warn!(steps = report.steps, "run cancelled before every path completed");
        }
        info!(
            steps = report.steps,
            moves = report.moves,
            bounces = report.bounces,
            collected = report.collected,
            rounds = report.rounds,
            elapsed = ?report.elapsed,
            "scheduler finished"
        );
        Ok(report)
    }

    fn run_free(
        &self,
        simulation: &Simulation,
        token: &CancellationToken,
    ) -> Result<RunReport, SchedulerError> {
        let cadence = self.config.cadence;
        thread::scope(|scope| {
            let mut workers = Vec::with_capacity(simulation.adventurer_count());
            for id in simulation.adventurer_ids() {
                let handle = thread::Builder::new()
                    .name(format!("adventurer-{}", id.get()))
                    .spawn_scoped(scope, move || {
                        free_running_worker(simulation, id, cadence, token)
                    })
                    .map_err(|source| {
                        token.cancel();
                        SchedulerError::Spawn {
                            adventurer: id,
                            source,
                        }
                    })?;
                workers.push((id, handle));
            }
            collect(workers)
        })
    }

    fn run_lock_step(
        &self,
        simulation: &Simulation,
        token: &CancellationToken,
    ) -> Result<RunReport, SchedulerError> {
        let cadence = self.config.cadence;
        let shared = RoundState::new(simulation.adventurer_count());
        let shared = &shared;
        let started = Instant::now();
        thread::scope(|scope| {
            let mut workers = Vec::with_capacity(simulation.adventurer_count());
            for id in simulation.adventurer_ids() {
                let spawned = thread::Builder::new()
                    .name(format!("adventurer-{}", id.get()))
                    .spawn_scoped(scope, move || {
                        lock_step_worker(simulation, id, shared, cadence, started, token)
                    });
                match spawned {
                    Ok(handle) => workers.push((id, handle)),
                    Err(source) => {
                        shared.gate.release(GateState::Aborted);
                        token.cancel();
                        let _ = collect(workers);
                        return Err(SchedulerError::Spawn {
                            adventurer: id,
                            source,
                        });
                    }
                }
            }
            shared.gate.release(GateState::Open);
            let mut report = collect(workers)?;
            report.rounds = shared.rounds.load(Ordering::SeqCst);
            Ok(report)
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GateState {
    Closed,
    Open,
    Aborted,
}

/// One-shot gate holding lock-step workers until the roster is complete.
struct StartGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl StartGate {
    fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Closed),
            changed: Condvar::new(),
        }
    }

    fn release(&self, state: GateState) {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = state;
        self.changed.notify_all();
    }

    /// Blocks until the gate is released; `true` when the rounds may start.
    fn wait(&self) -> bool {
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let guard = self
            .changed
            .wait_while(guard, |state| *state == GateState::Closed)
            .unwrap_or_else(PoisonError::into_inner);
        *guard == GateState::Open
    }
}

struct RoundState {
    gate: StartGate,
    barrier: Barrier,
    halt: AtomicBool,
    faulted: AtomicBool,
    rounds: AtomicU64,
}

impl RoundState {
    fn new(participants: usize) -> Self {
        Self {
            gate: StartGate::new(),
            barrier: Barrier::new(participants),
            halt: AtomicBool::new(false),
            faulted: AtomicBool::new(false),
            rounds: AtomicU64::new(0),
        }
    }
}

fn free_running_worker(
    simulation: &Simulation,
    id: AdventurerId,
    cadence: Duration,
    token: &CancellationToken,
) -> Result<RunReport, SimulationError> {
    let mut report = RunReport::default();
    let mut deadline = Instant::now();

    while !token.is_cancelled() && !simulation.is_complete(id)? {
        let outcome = simulation.step(id)?;
        report.record(&outcome);
        if simulation.is_complete(id)? {
            break;
        }
        if let Some(next) = deadline.checked_add(cadence) {
            deadline = next;
        }
        sleep_until(deadline, token);
    }

    report.rounds = report.steps;
    debug!(adventurer = id.get(), steps = report.steps, "worker exiting");
    Ok(report)
}

fn lock_step_worker(
    simulation: &Simulation,
    id: AdventurerId,
    shared: &RoundState,
    cadence: Duration,
    started: Instant,
    token: &CancellationToken,
) -> Result<RunReport, SimulationError> {
    let mut report = RunReport::default();
    if !shared.gate.wait() {
        debug!(adventurer = id.get(), "start aborted");
        return Ok(report);
    }

    let mut failure = None;
    let mut panicked: Option<Box<dyn Any + Send>> = None;
    let mut deadline = started;

    loop {
        if failure.is_none() && panicked.is_none() && !token.is_cancelled() {
            match panic::catch_unwind(AssertUnwindSafe(|| simulation.step(id))) {
                Ok(Ok(outcome)) => report.record(&outcome),
                Ok(Err(error)) => {
                    shared.faulted.store(true, Ordering::SeqCst);
                    failure = Some(error);
                }
                Err(payload) => {
                    shared.faulted.store(true, Ordering::SeqCst);
                    panicked = Some(payload);
                }
            }
        }

        if shared.barrier.wait().is_leader() {
            let _ = shared.rounds.fetch_add(1, Ordering::SeqCst);
            let finished = match simulation.is_finished() {
                Ok(finished) => finished,
                Err(error) => {
                    shared.faulted.store(true, Ordering::SeqCst);
                    failure = Some(error);
                    true
                }
            };
            let halt = finished || token.is_cancelled() || shared.faulted.load(Ordering::SeqCst);
            shared.halt.store(halt, Ordering::SeqCst);
        }
        let _ = shared.barrier.wait();

        if shared.halt.load(Ordering::SeqCst) {
            break;
        }
        if let Some(next) = deadline.checked_add(cadence) {
            deadline = next;
        }
        sleep_until(deadline, token);
    }

    debug!(adventurer = id.get(), steps = report.steps, "worker exiting");
    if let Some(payload) = panicked {
        panic::resume_unwind(payload);
    }
    match failure {
        Some(error) => Err(error),
        None => Ok(report),
    }
}

fn collect(
    workers: Vec<(
        AdventurerId,
        thread::ScopedJoinHandle<'_, Result<RunReport, SimulationError>>,
    )>,
) -> Result<RunReport, SchedulerError> {
    let mut report = RunReport::default();
    let mut first_error = None;
    for (adventurer, handle) in workers {
        let result = match handle.join() {
            Ok(Ok(worker)) => {
                report.absorb(&worker);
                continue;
            }
            Ok(Err(error)) => SchedulerError::from(error),
            Err(_) => SchedulerError::WorkerPanicked { adventurer },
        };
        if first_error.is_none() {
            first_error = Some(result);
        }
    }
    match first_error {
        Some(error) => Err(error),
        None => Ok(report),
    }
}

fn sleep_until(deadline: Instant, token: &CancellationToken) {
    while !token.is_cancelled() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        thread::sleep(remaining.min(SLEEP_SLICE));
    }
}
