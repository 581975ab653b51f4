//! Adventurer state and its pure state transitions.

use treasure_map_core::{AdventurerId, AdventurerSpec, CellCoord, InstructionPath, Orientation};

/// Raised when the cursor of a completed adventurer is advanced again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{adventurer} already completed its path")]
pub struct PathCompleted {
    /// Adventurer whose path is exhausted.
    pub adventurer: AdventurerId,
}

/// Actor following a fixed instruction path across the grid.
///
/// `position` caches the cell whose occupant points back at this adventurer.
/// Only the grid updates it, in the same call that moves the occupant.
#[derive(Clone, Debug)]
pub struct Adventurer {
    id: AdventurerId,
    name: String,
    orientation: Orientation,
    position: CellCoord,
    reward_tally: u64,
    path: InstructionPath,
    cursor: usize,
}

impl Adventurer {
    /// Creates an adventurer that will start on `start` once placed on a grid.
    #[must_use]
    pub fn new(
        id: AdventurerId,
        name: impl Into<String>,
        start: CellCoord,
        orientation: Orientation,
        path: InstructionPath,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            orientation,
            position: start,
            reward_tally: 0,
            path,
            cursor: 0,
        }
    }

    /// Creates an adventurer from its scenario definition.
    #[must_use]
    pub fn from_spec(id: AdventurerId, spec: &AdventurerSpec) -> Self {
        Self::new(
            id,
            spec.name.clone(),
            spec.start,
            spec.orientation,
            spec.path.clone(),
        )
    }

    /// Unique identifier of the adventurer.
    #[must_use]
    pub const fn id(&self) -> AdventurerId {
        self.id
    }

    /// Display name of the adventurer.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Orientation the adventurer faces.
    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Cell the adventurer stands on.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        self.position
    }

    /// Rewards collected so far.
    #[must_use]
    pub const fn reward_tally(&self) -> u64 {
        self.reward_tally
    }

    /// Instructions followed by the adventurer.
    #[must_use]
    pub const fn path(&self) -> &InstructionPath {
        &self.path
    }

    /// Index of the next instruction to execute.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Rotates a quarter turn clockwise.
    pub fn turn_right(&mut self) {
        self.orientation = self.orientation.rotated_right();
    }

    /// Rotates a quarter turn counter-clockwise.
    pub fn turn_left(&mut self) {
        self.orientation = self.orientation.rotated_left();
    }

    /// Symbol under the cursor, `None` once the path is complete.
    #[must_use]
    pub fn current_instruction(&self) -> Option<char> {
        self.path.symbol(self.cursor)
    }

    /// Moves the cursor past the current instruction.
    pub fn advance_cursor(&mut self) -> Result<(), PathCompleted> {
        if self.has_completed_path() {
            return Err(PathCompleted {
                adventurer: self.id,
            });
        }
        self.cursor += 1;
        Ok(())
    }

    /// Reports whether every instruction has been executed.
    #[must_use]
    pub fn has_completed_path(&self) -> bool {
        self.cursor >= self.path.len()
    }

    pub(crate) fn relocate(&mut self, cell: CellCoord) {
        self.position = cell;
    }

    pub(crate) fn collect_reward(&mut self, amount: u32) {
        self.reward_tally += u64::from(amount);
    }
}
