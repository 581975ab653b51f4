#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Treasure Map.
//!
//! The world is made of a [`Grid`] of [`Cell`] values and the [`Adventurer`]
//! actors walking on it. Occupancy is recorded twice: the cell stores the
//! identifier of its occupant and the adventurer caches its own position. Only
//! [`Grid::place_adventurer`] and [`Grid::try_move_forward`] write either side,
//! and they always write both.

mod adventurer;
mod cell;
mod grid;

pub use adventurer::{Adventurer, PathCompleted};
pub use cell::Cell;
pub use grid::{Grid, MAX_CELLS};

/// Query functions that provide read-only copies of the world state.
pub mod query {
    use treasure_map_core::{AdventurerSnapshot, GridSnapshot, SimulationSnapshot};

    use super::{Adventurer, Grid};

    /// Captures an immutable copy of a single adventurer.
    #[must_use]
    pub fn adventurer_snapshot(adventurer: &Adventurer) -> AdventurerSnapshot {
        AdventurerSnapshot {
            id: adventurer.id(),
            name: adventurer.name().to_owned(),
            position: adventurer.position(),
            orientation: adventurer.orientation(),
            reward_tally: adventurer.reward_tally(),
            path: adventurer.path().clone(),
            cursor: adventurer.cursor(),
            complete: adventurer.has_completed_path(),
        }
    }

    /// Captures an immutable copy of the grid.
    #[must_use]
    pub fn grid_snapshot(grid: &Grid) -> GridSnapshot {
        grid.snapshot()
    }

    /// Combines the grid and the provided adventurers into one snapshot.
    ///
    /// Callers are responsible for reading every input under the same
    /// critical section so the snapshot is consistent.
    #[must_use]
    pub fn simulation_snapshot<'a>(
        grid: &Grid,
        adventurers: impl IntoIterator<Item = &'a Adventurer>,
    ) -> SimulationSnapshot {
        SimulationSnapshot::new(
            grid_snapshot(grid),
            adventurers.into_iter().map(adventurer_snapshot).collect(),
        )
    }
}
