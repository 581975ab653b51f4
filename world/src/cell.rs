//! Single grid position.

use treasure_map_core::{AdventurerId, CellCoord, CellSnapshot, GridError, Terrain};

use crate::Adventurer;

/// One grid position: terrain, reward and at most one occupant.
///
/// A cell is only ever occupied while its terrain is [`Terrain::Open`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    coord: CellCoord,
    terrain: Terrain,
    reward: u32,
    occupant: Option<AdventurerId>,
}

impl Cell {
    pub(crate) const fn new(coord: CellCoord) -> Self {
        Self {
            coord,
            terrain: Terrain::Open,
            reward: 0,
            occupant: None,
        }
    }

    /// Coordinate assigned to the cell when the grid was built.
    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// Terrain of the cell.
    #[must_use]
    pub const fn terrain(&self) -> Terrain {
        self.terrain
    }

    /// Reward lying on the cell.
    #[must_use]
    pub const fn reward(&self) -> u32 {
        self.reward
    }

    /// Adventurer standing on the cell, if any.
    #[must_use]
    pub const fn occupant(&self) -> Option<AdventurerId> {
        self.occupant
    }

    /// Reports whether the cell cannot be entered at all.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.terrain == Terrain::Blocked
    }

    /// Reports whether a reward lies on the cell.
    #[must_use]
    pub const fn has_reward(&self) -> bool {
        self.reward > 0
    }

    /// Reports whether an adventurer stands on the cell.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    /// Puts the adventurer on the cell and hands it the whole reward.
    ///
    /// Returns `false` without touching anything when the cell is blocked or
    /// already occupied. Occupancy and reward transfer happen in this single
    /// call, so no observer sees the occupant without the reward transferred.
    pub fn place(&mut self, adventurer: &mut Adventurer) -> bool {
        if self.is_blocked() || self.is_occupied() {
            return false;
        }

        self.occupant = Some(adventurer.id());
        if self.has_reward() {
            adventurer.collect_reward(self.reward);
            self.reward = 0;
        }
        true
    }

    /// Clears the occupant.
    pub fn vacate(&mut self) {
        self.occupant = None;
    }

    /// Replaces the reward lying on the cell.
    ///
    /// Negative or oversized counts and rewards on blocked cells are refused
    /// and the previous count is kept.
    pub fn set_reward(&mut self, count: i64) -> Result<(), GridError> {
        if count < 0 {
            return Err(GridError::NegativeReward {
                cell: self.coord,
                count,
            });
        }
        let reward = u32::try_from(count).map_err(|_| GridError::RewardOverflow {
            cell: self.coord,
            count,
        })?;
        if self.is_blocked() && reward > 0 {
            return Err(GridError::RewardOnBlocked { cell: self.coord });
        }

        self.reward = reward;
        Ok(())
    }

    /// Turns the cell into impassable terrain.
    pub fn block(&mut self) -> Result<(), GridError> {
        if self.is_occupied() {
            return Err(GridError::BlockOccupied { cell: self.coord });
        }
        if self.has_reward() {
            return Err(GridError::BlockRewarded { cell: self.coord });
        }

        self.terrain = Terrain::Blocked;
        Ok(())
    }

    /// Captures an immutable copy of the cell.
    #[must_use]
    pub const fn snapshot(&self) -> CellSnapshot {
        CellSnapshot {
            coord: self.coord,
            terrain: self.terrain,
            reward: self.reward,
            occupant: self.occupant,
        }
    }
}
