#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Step state machine that advances adventurers against a shared grid.
//!
//! A [`Simulation`] owns the grid behind one coarse mutex and every adventurer
//! behind its own mutex. Locks are always taken in the same order: adventurers
//! in ascending identifier order, then the grid. [`Simulation::step`] only ever
//! holds the lock of the adventurer it steps plus, for `Advance`, the grid, so
//! the occupancy check, the placement, the vacate and the position update all
//! happen inside a single critical section. Rotations never touch the grid.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};
use treasure_map_core::{
    AdventurerId, AdventurerSpec, Instruction, Scenario, SetupError, SimulationError,
    SimulationSnapshot, StepOutcome,
};
use treasure_map_world::{query, Adventurer, Cell, Grid};

/// Grid and adventurers of a single run, safe to share across threads.
#[derive(Debug)]
pub struct Simulation {
    grid: Mutex<Grid>,
    adventurers: Vec<Mutex<Adventurer>>,
}

impl Simulation {
    /// Places the provided adventurers on the grid in setup order.
    ///
    /// Identifiers are assigned from the position in `adventurers`. A starting
    /// cell that is outside the grid, blocked, or taken by an earlier
    /// adventurer aborts construction.
    pub fn new(mut grid: Grid, adventurers: &[AdventurerSpec]) -> Result<Self, SetupError> {
        let mut placed = Vec::with_capacity(adventurers.len());
        for (index, spec) in adventurers.iter().enumerate() {
            let raw_id = u32::try_from(index).map_err(|_| SetupError::TooManyAdventurers {
                count: adventurers.len(),
            })?;
            let mut adventurer = Adventurer::from_spec(AdventurerId::new(raw_id), spec);
            grid.place_adventurer(&mut adventurer)
                .map_err(|_| SetupError::StartUnavailable {
                    name: spec.name.clone(),
                    cell: spec.start,
                })?;
            placed.push(Mutex::new(adventurer));
        }

        Ok(Self {
            grid: Mutex::new(grid),
            adventurers: placed,
        })
    }

    /// Builds the grid described by the scenario and places its adventurers.
    pub fn from_scenario(scenario: &Scenario) -> Result<Self, SetupError> {
        let mut grid = Grid::new(scenario.width, scenario.height)?;
        for cell in &scenario.blocked {
            grid.block(*cell)?;
        }
        for reward in &scenario.rewards {
            grid.set_reward(reward.cell, reward.count)?;
        }

        let simulation = Self::new(grid, &scenario.adventurers)?;
        info!(
            width = scenario.width,
            height = scenario.height,
            blocked = scenario.blocked.len(),
            rewards = scenario.rewards.len(),
            adventurers = simulation.adventurer_count(),
            "simulation ready"
        );
        Ok(simulation)
    }

    /// Number of adventurers taking part in the run.
    #[must_use]
    pub fn adventurer_count(&self) -> usize {
        self.adventurers.len()
    }

    /// Identifiers of every adventurer, in ascending order.
    pub fn adventurer_ids(&self) -> impl Iterator<Item = AdventurerId> {
        (0..self.adventurers.len())
            .filter_map(|index| u32::try_from(index).ok())
            .map(AdventurerId::new)
    }

    /// Executes the next instruction of one adventurer.
    ///
    /// Completed adventurers report [`StepOutcome::Idle`] and are left
    /// untouched. Any other call consumes exactly one path symbol, including
    /// an `Advance` that bounces and a malformed symbol, which is reported as
    /// [`StepOutcome::Rejected`].
    pub fn step(&self, id: AdventurerId) -> Result<StepOutcome, SimulationError> {
        let slot = self
            .adventurers
            .get(id.index())
            .ok_or(SimulationError::UnknownAdventurer { id })?;
        let mut adventurer = lock(slot, "adventurer")?;

        let Some(symbol) = adventurer.current_instruction() else {
            return Ok(StepOutcome::Idle { adventurer: id });
        };
        let index = adventurer.cursor();

        let outcome = match Instruction::from_symbol(symbol) {
            Ok(Instruction::Advance) => self.advance(&mut adventurer)?,
            Ok(Instruction::TurnRight) => {
                adventurer.turn_right();
                StepOutcome::Turned {
                    adventurer: id,
                    orientation: adventurer.orientation(),
                }
            }
            Ok(Instruction::TurnLeft) => {
                adventurer.turn_left();
                StepOutcome::Turned {
                    adventurer: id,
                    orientation: adventurer.orientation(),
                }
            }
            Err(error) => {
                warn!(
                    adventurer = id.get(),
                    name = adventurer.name(),
                    index,
                    %error,
                    "skipping malformed instruction"
                );
                StepOutcome::Rejected {
                    adventurer: id,
                    symbol,
                    index,
                }
            }
        };

        let advanced = adventurer.advance_cursor();
        debug_assert!(advanced.is_ok(), "cursor checked before executing");
        debug!(adventurer = id.get(), cursor = adventurer.cursor(), ?outcome, "step executed");
        Ok(outcome)
    }

    /// Steps every adventurer once, in identifier order.
    pub fn step_round(&self) -> Result<Vec<StepOutcome>, SimulationError> {
        self.adventurer_ids().map(|id| self.step(id)).collect()
    }

    /// Steps rounds on the calling thread until every adventurer is complete.
    ///
    /// Returns the number of rounds that consumed at least one instruction.
    pub fn run_sequential(&self) -> Result<usize, SimulationError> {
        let mut rounds = 0;
        while !self.is_finished()? {
            let outcomes = self.step_round()?;
            if outcomes.iter().any(StepOutcome::consumed_instruction) {
                rounds += 1;
            }
        }
        Ok(rounds)
    }

    /// Reports whether every adventurer completed its path.
    ///
    /// All adventurer locks are held while the answer is computed.
    pub fn is_finished(&self) -> Result<bool, SimulationError> {
        let adventurers = self.lock_adventurers()?;
        Ok(adventurers
            .iter()
            .all(|adventurer| adventurer.has_completed_path()))
    }

    /// Reports whether a single adventurer completed its path.
    pub fn is_complete(&self, id: AdventurerId) -> Result<bool, SimulationError> {
        let slot = self
            .adventurers
            .get(id.index())
            .ok_or(SimulationError::UnknownAdventurer { id })?;
        Ok(lock(slot, "adventurer")?.has_completed_path())
    }

    /// Captures a consistent copy of the grid and every adventurer.
    pub fn snapshot(&self) -> Result<SimulationSnapshot, SimulationError> {
        let adventurers = self.lock_adventurers()?;
        let grid = lock(&self.grid, "grid")?;
        Ok(query::simulation_snapshot(
            &grid,
            adventurers.iter().map(|adventurer| &**adventurer),
        ))
    }

    /// Adventurers standing on the grid, in row-major cell order.
    pub fn occupants(&self) -> Result<Vec<AdventurerId>, SimulationError> {
        Ok(lock(&self.grid, "grid")?.occupants())
    }

    fn advance(&self, adventurer: &mut Adventurer) -> Result<StepOutcome, SimulationError> {
        let mut grid = lock(&self.grid, "grid")?;
        let id = adventurer.id();
        let from = adventurer.position();
        let waiting = grid
            .forward_target(adventurer)
            .and_then(|target| grid.cell(target))
            .map_or(0, Cell::reward);

        if grid.try_move_forward(adventurer) {
            Ok(StepOutcome::Moved {
                adventurer: id,
                from,
                to: adventurer.position(),
                collected: waiting,
            })
        } else {
            Ok(StepOutcome::Bounced {
                adventurer: id,
                at: from,
                target: grid.forward_target(adventurer),
            })
        }
    }

    fn lock_adventurers(&self) -> Result<Vec<MutexGuard<'_, Adventurer>>, SimulationError> {
        self.adventurers
            .iter()
            .map(|slot| lock(slot, "adventurer"))
            .collect()
    }
}

fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    resource: &'static str,
) -> Result<MutexGuard<'a, T>, SimulationError> {
    mutex
        .lock()
        .map_err(|_| SimulationError::Poisoned { resource })
}
