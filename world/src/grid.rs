//! Dense row-major grid of cells.

use treasure_map_core::{AdventurerId, CellCoord, GridError, GridSnapshot};

use crate::{Adventurer, Cell};

/// Largest number of cells a grid may hold.
pub const MAX_CELLS: u64 = 1 << 24;

/// Rectangular grid of cells with exclusive occupancy.
///
/// Every coordinate in `[0, width) x [0, height)` owns exactly one [`Cell`],
/// allocated by [`Grid::new`] and never replaced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Allocates every cell of a `width x height` grid, all open and empty.
    pub fn new(width: u32, height: u32) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::InvalidDimensions { width, height });
        }

        let count = u64::from(width) * u64::from(height);
        let too_large = GridError::TooLarge {
            width,
            height,
            max: MAX_CELLS,
        };
        if count > MAX_CELLS {
            return Err(too_large);
        }
        let capacity = usize::try_from(count).map_err(|_| too_large)?;
        let mut cells = Vec::with_capacity(capacity);
        for row in 0..height {
            for column in 0..width {
                cells.push(Cell::new(CellCoord::new(column, row)));
            }
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub const fn within_bounds(&self, coord: CellCoord) -> bool {
        coord.column() < self.width && coord.row() < self.height
    }

    /// Cell stored at the provided coordinate.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.index(coord).and_then(|index| self.cells.get(index))
    }

    /// Iterator over every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Reports whether an adventurer could step onto the coordinate right now.
    ///
    /// Rewards never prevent entry.
    #[must_use]
    pub fn can_enter(&self, coord: CellCoord) -> bool {
        self.cell(coord)
            .map_or(false, |cell| !cell.is_blocked() && !cell.is_occupied())
    }

    /// Cell in front of the adventurer, `None` past the grid edge.
    #[must_use]
    pub fn forward_target(&self, adventurer: &Adventurer) -> Option<CellCoord> {
        adventurer
            .position()
            .neighbor(adventurer.orientation())
            .filter(|target| self.within_bounds(*target))
    }

    /// Moves the adventurer one cell forward if the target can be entered.
    ///
    /// On success the target cell is occupied (collecting its reward), the
    /// source cell is vacated and the adventurer's cached position updated,
    /// all within this call. Returns `false` and leaves everything untouched
    /// when the adventurer bounces off an edge, a blocked cell, another
    /// adventurer, or when it is not standing on the grid.
    pub fn try_move_forward(&mut self, adventurer: &mut Adventurer) -> bool {
        let from = adventurer.position();
        if self.cell(from).and_then(Cell::occupant) != Some(adventurer.id()) {
            return false;
        }

        let Some(target) = self.forward_target(adventurer) else {
            return false;
        };
        let (Some(from_index), Some(target_index)) = (self.index(from), self.index(target)) else {
            return false;
        };

        if !self.cells[target_index].place(adventurer) {
            return false;
        }
        self.cells[from_index].vacate();
        adventurer.relocate(target);
        true
    }

    /// Puts the adventurer on its starting cell.
    ///
    /// A reward lying on the starting cell is collected immediately.
    pub fn place_adventurer(&mut self, adventurer: &mut Adventurer) -> Result<(), GridError> {
        let start = adventurer.position();
        let unavailable = GridError::StartUnavailable {
            adventurer: adventurer.id(),
            cell: start,
        };

        let index = self.index(start).ok_or(unavailable)?;
        if self.cells[index].place(adventurer) {
            Ok(())
        } else {
            Err(unavailable)
        }
    }

    /// Replaces the reward lying on the provided cell.
    pub fn set_reward(&mut self, coord: CellCoord, count: i64) -> Result<(), GridError> {
        self.cell_mut(coord)?.set_reward(count)
    }

    /// Turns the provided cell into impassable terrain.
    pub fn block(&mut self, coord: CellCoord) -> Result<(), GridError> {
        self.cell_mut(coord)?.block()
    }

    /// Adventurers standing on the grid, in row-major cell order.
    #[must_use]
    pub fn occupants(&self) -> Vec<AdventurerId> {
        self.cells.iter().filter_map(Cell::occupant).collect()
    }

    /// Captures an immutable copy of every cell.
    #[must_use]
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot::new(
            self.width,
            self.height,
            self.cells.iter().map(Cell::snapshot).collect(),
        )
    }

    fn cell_mut(&mut self, coord: CellCoord) -> Result<&mut Cell, GridError> {
        let out_of_bounds = GridError::OutOfBounds {
            cell: coord,
            width: self.width,
            height: self.height,
        };
        let index = self.index(coord).ok_or(out_of_bounds)?;
        self.cells.get_mut(index).ok_or(out_of_bounds)
    }

    fn index(&self, coord: CellCoord) -> Option<usize> {
        if !self.within_bounds(coord) {
            return None;
        }
        let row = usize::try_from(coord.row()).ok()?;
        let column = usize::try_from(coord.column()).ok()?;
        let width = usize::try_from(self.width).ok()?;
        Some(row * width + column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treasure_map_core::{InstructionPath, Orientation, Terrain};

    fn adventurer(id: u32, start: CellCoord, orientation: Orientation) -> Adventurer {
        Adventurer::new(
            AdventurerId::new(id),
            format!("A{id}"),
            start,
            orientation,
            InstructionPath::default(),
        )
    }

    fn placed(grid: &mut Grid, id: u32, start: CellCoord, orientation: Orientation) -> Adventurer {
        let mut adventurer = adventurer(id, start, orientation);
        grid.place_adventurer(&mut adventurer).expect("start cell free");
        adventurer
    }

    #[test]
    fn every_coordinate_maps_to_its_own_cell() {
        let grid = Grid::new(4, 3).expect("valid dimensions");
        assert_eq!(grid.cells().count(), 12);
        for row in 0..3 {
            for column in 0..4 {
                let coord = CellCoord::new(column, row);
                let cell = grid.cell(coord).expect("cell in bounds");
                assert_eq!(cell.coord(), coord);
                assert_eq!(cell.terrain(), Terrain::Open);
                assert_eq!(cell.reward(), 0);
                assert!(!cell.is_occupied());
            }
        }
        assert!(grid.cell(CellCoord::new(4, 0)).is_none());
        assert!(grid.cell(CellCoord::new(0, 3)).is_none());
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert_eq!(
            Grid::new(0, 3),
            Err(GridError::InvalidDimensions {
                width: 0,
                height: 3
            })
        );
        assert!(Grid::new(3, 0).is_err());
    }

    #[test]
    fn oversized_dimensions_are_rejected_before_allocating() {
        assert_eq!(
            Grid::new(100_000, 100_000),
            Err(GridError::TooLarge {
                width: 100_000,
                height: 100_000,
                max: MAX_CELLS
            })
        );
        assert!(Grid::new(u32::MAX, u32::MAX).is_err());
        let overflowing_row = u32::try_from(MAX_CELLS + 1).expect("limit fits u32");
        assert!(Grid::new(overflowing_row, 1).is_err());
    }

    #[test]
    fn can_enter_ignores_reward_but_not_terrain_or_occupant() {
        let mut grid = Grid::new(3, 1).expect("valid dimensions");
        grid.set_reward(CellCoord::new(0, 0), 2).expect("reward");
        grid.block(CellCoord::new(1, 0)).expect("block");
        let _occupant = placed(&mut grid, 0, CellCoord::new(2, 0), Orientation::West);

        assert!(grid.can_enter(CellCoord::new(0, 0)));
        assert!(!grid.can_enter(CellCoord::new(1, 0)));
        assert!(!grid.can_enter(CellCoord::new(2, 0)));
        assert!(!grid.can_enter(CellCoord::new(3, 0)));
    }

    #[test]
    fn move_forward_updates_both_sides_of_the_occupancy() {
        let mut grid = Grid::new(3, 3).expect("valid dimensions");
        grid.set_reward(CellCoord::new(1, 0), 3).expect("reward");
        let mut mover = placed(&mut grid, 0, CellCoord::new(0, 0), Orientation::East);

        assert!(grid.try_move_forward(&mut mover));
        assert_eq!(mover.position(), CellCoord::new(1, 0));
        assert_eq!(mover.reward_tally(), 3);
        assert_eq!(grid.cell(CellCoord::new(0, 0)).and_then(Cell::occupant), None);
        assert_eq!(
            grid.cell(CellCoord::new(1, 0)).and_then(Cell::occupant),
            Some(AdventurerId::new(0))
        );
        assert_eq!(grid.cell(CellCoord::new(1, 0)).map(Cell::reward), Some(0));
    }

    #[test]
    fn move_forward_bounces_off_edges() {
        let mut grid = Grid::new(2, 2).expect("valid dimensions");
        let mut north = placed(&mut grid, 0, CellCoord::new(0, 0), Orientation::North);
        let mut east = placed(&mut grid, 1, CellCoord::new(1, 1), Orientation::East);

        assert_eq!(grid.forward_target(&north), None);
        assert!(!grid.try_move_forward(&mut north));
        assert!(!grid.try_move_forward(&mut east));
        assert_eq!(north.position(), CellCoord::new(0, 0));
        assert_eq!(east.position(), CellCoord::new(1, 1));
    }

    #[test]
    fn move_forward_bounces_off_mountains_and_adventurers() {
        let mut grid = Grid::new(3, 1).expect("valid dimensions");
        grid.block(CellCoord::new(1, 0)).expect("block");
        let mut blocked = placed(&mut grid, 0, CellCoord::new(0, 0), Orientation::East);
        let mut crowded = placed(&mut grid, 1, CellCoord::new(2, 0), Orientation::West);

        assert!(!grid.try_move_forward(&mut blocked));
        assert!(!grid.try_move_forward(&mut crowded));

        let mut grid = Grid::new(2, 1).expect("valid dimensions");
        let mut first = placed(&mut grid, 0, CellCoord::new(0, 0), Orientation::East);
        let _second = placed(&mut grid, 1, CellCoord::new(1, 0), Orientation::East);
        assert!(!grid.try_move_forward(&mut first));
        assert_eq!(grid.occupants(), vec![AdventurerId::new(0), AdventurerId::new(1)]);
    }

    #[test]
    fn unplaced_adventurers_cannot_move() {
        let mut grid = Grid::new(2, 1).expect("valid dimensions");
        let _resident = placed(&mut grid, 0, CellCoord::new(0, 0), Orientation::East);
        let mut ghost = adventurer(1, CellCoord::new(0, 0), Orientation::East);

        assert!(!grid.try_move_forward(&mut ghost));
        assert_eq!(grid.occupants(), vec![AdventurerId::new(0)]);
    }

    #[test]
    fn placement_collects_start_reward_and_rejects_taken_cells() {
        let mut grid = Grid::new(2, 2).expect("valid dimensions");
        grid.set_reward(CellCoord::new(1, 1), 2).expect("reward");
        let collector = placed(&mut grid, 0, CellCoord::new(1, 1), Orientation::North);
        assert_eq!(collector.reward_tally(), 2);

        let mut late = adventurer(1, CellCoord::new(1, 1), Orientation::North);
        assert_eq!(
            grid.place_adventurer(&mut late),
            Err(GridError::StartUnavailable {
                adventurer: AdventurerId::new(1),
                cell: CellCoord::new(1, 1)
            })
        );

        let mut outside = adventurer(2, CellCoord::new(5, 5), Orientation::North);
        assert!(grid.place_adventurer(&mut outside).is_err());
    }

    #[test]
    fn setup_helpers_report_out_of_bounds() {
        let mut grid = Grid::new(2, 2).expect("valid dimensions");
        assert_eq!(
            grid.block(CellCoord::new(2, 0)),
            Err(GridError::OutOfBounds {
                cell: CellCoord::new(2, 0),
                width: 2,
                height: 2
            })
        );
        assert!(grid.set_reward(CellCoord::new(0, 2), 1).is_err());
    }

    #[test]
    fn snapshot_mirrors_cells() {
        let mut grid = Grid::new(2, 2).expect("valid dimensions");
        grid.set_reward(CellCoord::new(1, 0), 4).expect("reward");
        grid.block(CellCoord::new(0, 1)).expect("block");
        let _resident = placed(&mut grid, 0, CellCoord::new(1, 1), Orientation::North);

        let snapshot = grid.snapshot();
        assert_eq!((snapshot.width(), snapshot.height()), (2, 2));
        for cell in grid.cells() {
            assert_eq!(snapshot.cell(cell.coord()), Some(&cell.snapshot()));
        }
        assert_eq!(snapshot.remaining_rewards(), 4);
    }
}
