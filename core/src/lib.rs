#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Treasure Map engine.
//!
//! This crate defines the data surface that connects adapters, the
//! authoritative world, and the simulation systems. Adapters describe a run as
//! a [`Scenario`], the simulation executes adventurer instructions against the
//! world and reports each executed instruction as a [`StepOutcome`], and
//! reporting adapters observe the run exclusively through
//! [`SimulationSnapshot`] values.
//!
//! Coordinates follow a single convention everywhere: the column grows East,
//! the row grows South, and `(0, 0)` is the north-west corner of the grid.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Treasure Map.";

/// Unique identifier assigned to an adventurer.
///
/// Identifiers are allocated densely in setup order, starting at zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdventurerId(u32);

impl AdventurerId {
    /// Creates a new adventurer identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Position of the adventurer within setup order.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AdventurerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "adventurer #{}", self.0)
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell (the `x` axis).
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell (the `y` axis).
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Returns the adjacent cell in the provided direction.
    ///
    /// `None` is returned when the neighbour would have a negative coordinate.
    /// Upper bounds are not checked here; the grid owns its dimensions.
    #[must_use]
    pub fn neighbor(self, orientation: Orientation) -> Option<CellCoord> {
        match orientation {
            Orientation::North => self.row.checked_sub(1).map(|row| Self::new(self.column, row)),
            Orientation::South => self.row.checked_add(1).map(|row| Self::new(self.column, row)),
            Orientation::East => self
                .column
                .checked_add(1)
                .map(|column| Self::new(column, self.row)),
            Orientation::West => self
                .column
                .checked_sub(1)
                .map(|column| Self::new(column, self.row)),
        }
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.column, self.row)
    }
}

/// Cardinal orientation an adventurer may face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Facing decreasing row indices.
    North,
    /// Facing increasing column indices.
    East,
    /// Facing increasing row indices.
    South,
    /// Facing decreasing column indices.
    West,
}

impl Orientation {
    /// Orientation reached after a quarter turn clockwise.
    #[must_use]
    pub const fn rotated_right(self) -> Self {
        match self {
            Self::North => Self::East,
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
        }
    }

    /// Orientation reached after a quarter turn counter-clockwise.
    #[must_use]
    pub const fn rotated_left(self) -> Self {
        match self {
            Self::North => Self::West,
            Self::West => Self::South,
            Self::South => Self::East,
            Self::East => Self::North,
        }
    }

    /// Decodes the single-letter orientation used by scenario files.
    ///
    /// Both `O` (ouest) and `W` are accepted for West.
    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'N' => Some(Self::North),
            'E' => Some(Self::East),
            'S' => Some(Self::South),
            'O' | 'W' => Some(Self::West),
            _ => None,
        }
    }

    /// Upper-case name used by reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::North => "NORTH",
            Self::East => "EAST",
            Self::South => "SOUTH",
            Self::West => "WEST",
        }
    }
}

/// Instructions an adventurer can execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    /// Step one cell forward in the facing direction.
    Advance,
    /// Rotate a quarter turn clockwise.
    TurnRight,
    /// Rotate a quarter turn counter-clockwise.
    TurnLeft,
}

impl Instruction {
    /// Decodes a path symbol into an instruction.
    pub const fn from_symbol(symbol: char) -> Result<Self, MalformedInstruction> {
        match symbol {
            'A' => Ok(Self::Advance),
            'D' => Ok(Self::TurnRight),
            'G' => Ok(Self::TurnLeft),
            _ => Err(MalformedInstruction { symbol }),
        }
    }

    /// Symbol encoding the instruction inside a path.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Advance => 'A',
            Self::TurnRight => 'D',
            Self::TurnLeft => 'G',
        }
    }
}

/// Reports a path symbol outside the instruction alphabet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("symbol '{symbol}' is not a known instruction")]
pub struct MalformedInstruction {
    /// Offending symbol.
    pub symbol: char,
}

/// Ordered instruction symbols followed by a single adventurer.
///
/// Symbols are stored verbatim; malformed symbols are only detected when the
/// cursor reaches them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstructionPath {
    symbols: Vec<char>,
}

impl InstructionPath {
    /// Captures the provided symbols as a path.
    #[must_use]
    pub fn new(symbols: &str) -> Self {
        Self {
            symbols: symbols.chars().collect(),
        }
    }

    /// Builds a path made exclusively of well-formed instructions.
    #[must_use]
    pub fn from_instructions(instructions: &[Instruction]) -> Self {
        Self {
            symbols: instructions.iter().map(|instruction| instruction.symbol()).collect(),
        }
    }

    /// Number of symbols in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Reports whether the path contains no symbols.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbol stored at the provided index, if any.
    #[must_use]
    pub fn symbol(&self, index: usize) -> Option<char> {
        self.symbols.get(index).copied()
    }

    /// Iterator over the stored symbols in execution order.
    pub fn symbols(&self) -> impl Iterator<Item = char> + '_ {
        self.symbols.iter().copied()
    }
}

impl fmt::Display for InstructionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in &self.symbols {
            write!(f, "{symbol}")?;
        }
        Ok(())
    }
}

/// Terrain kinds a cell can hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    /// Walkable ground (a prairie).
    #[default]
    Open,
    /// Impassable ground (a mountain).
    Blocked,
}

/// Reward count requested for a cell during setup.
///
/// The count is signed so that invalid input reaches the world unchanged and
/// is rejected there rather than silently clamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPlacement {
    /// Cell receiving the reward.
    pub cell: CellCoord,
    /// Requested reward count.
    pub count: i64,
}

/// Initial definition of a single adventurer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdventurerSpec {
    /// Display name of the adventurer.
    pub name: String,
    /// Cell the adventurer starts on.
    pub start: CellCoord,
    /// Orientation the adventurer starts with.
    pub orientation: Orientation,
    /// Instructions the adventurer follows.
    pub path: InstructionPath,
}

impl AdventurerSpec {
    /// Creates a new adventurer definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        start: CellCoord,
        orientation: Orientation,
        path: InstructionPath,
    ) -> Self {
        Self {
            name: name.into(),
            start,
            orientation,
            path,
        }
    }
}

/// Everything required to construct a simulation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Number of columns in the grid.
    pub width: u32,
    /// Number of rows in the grid.
    pub height: u32,
    /// Cells that cannot be entered.
    pub blocked: Vec<CellCoord>,
    /// Rewards laid out before the run starts.
    pub rewards: Vec<RewardPlacement>,
    /// Adventurers in setup order.
    pub adventurers: Vec<AdventurerSpec>,
}

impl Scenario {
    /// Creates an empty scenario for a grid with the provided dimensions.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            blocked: Vec::new(),
            rewards: Vec::new(),
            adventurers: Vec::new(),
        }
    }

    /// Marks the provided cell as blocked.
    #[must_use]
    pub fn with_blocked(mut self, cell: CellCoord) -> Self {
        self.blocked.push(cell);
        self
    }

    /// Places a reward on the provided cell.
    #[must_use]
    pub fn with_reward(mut self, cell: CellCoord, count: i64) -> Self {
        self.rewards.push(RewardPlacement { cell, count });
        self
    }

    /// Appends an adventurer to the setup order.
    #[must_use]
    pub fn with_adventurer(mut self, adventurer: AdventurerSpec) -> Self {
        self.adventurers.push(adventurer);
        self
    }
}

/// Immutable representation of a single cell used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// Coordinate of the cell.
    pub coord: CellCoord,
    /// Terrain of the cell.
    pub terrain: Terrain,
    /// Reward still lying on the cell.
    pub reward: u32,
    /// Adventurer standing on the cell, if any.
    pub occupant: Option<AdventurerId>,
}

/// Read-only copy of the whole grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    width: u32,
    height: u32,
    cells: Vec<CellSnapshot>,
}

impl GridSnapshot {
    /// Creates a grid snapshot from row-major cell snapshots.
    #[must_use]
    pub fn new(width: u32, height: u32, cells: Vec<CellSnapshot>) -> Self {
        Self {
            width,
            height,
            cells,
        }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Snapshot of the cell at the provided coordinate, if in bounds.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&CellSnapshot> {
        if coord.column() >= self.width || coord.row() >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let row = usize::try_from(coord.row()).ok()?;
        let column = usize::try_from(coord.column()).ok()?;
        self.cells.get(row * width + column)
    }

    /// Adventurer standing on the provided cell, if any.
    #[must_use]
    pub fn occupant(&self, coord: CellCoord) -> Option<AdventurerId> {
        self.cell(coord).and_then(|cell| cell.occupant)
    }

    /// Iterator over all cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &CellSnapshot> {
        self.cells.iter()
    }

    /// Iterator over a single row of cells, west to east.
    pub fn row(&self, row: u32) -> impl Iterator<Item = &CellSnapshot> {
        self.cells.iter().filter(move |cell| cell.coord.row() == row)
    }

    /// Sum of the rewards still lying on the grid.
    #[must_use]
    pub fn remaining_rewards(&self) -> u64 {
        self.cells.iter().map(|cell| u64::from(cell.reward)).sum()
    }
}

/// Immutable representation of a single adventurer's state used for queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdventurerSnapshot {
    /// Unique identifier assigned to the adventurer.
    pub id: AdventurerId,
    /// Display name of the adventurer.
    pub name: String,
    /// Grid cell currently occupied by the adventurer.
    pub position: CellCoord,
    /// Orientation the adventurer faces.
    pub orientation: Orientation,
    /// Rewards collected so far.
    pub reward_tally: u64,
    /// Instructions followed by the adventurer.
    pub path: InstructionPath,
    /// Index of the next instruction to execute.
    pub cursor: usize,
    /// Indicates whether the whole path has been executed.
    pub complete: bool,
}

/// Consistent read-only copy of a whole simulation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    grid: GridSnapshot,
    adventurers: Vec<AdventurerSnapshot>,
    finished: bool,
}

impl SimulationSnapshot {
    /// Creates a snapshot, ordering adventurers deterministically by id.
    #[must_use]
    pub fn new(grid: GridSnapshot, mut adventurers: Vec<AdventurerSnapshot>) -> Self {
        adventurers.sort_by_key(|adventurer| adventurer.id);
        let finished = adventurers.iter().all(|adventurer| adventurer.complete);
        Self {
            grid,
            adventurers,
            finished,
        }
    }

    /// Grid captured by the snapshot.
    #[must_use]
    pub const fn grid(&self) -> &GridSnapshot {
        &self.grid
    }

    /// Iterator over the captured adventurers in id order.
    pub fn adventurers(&self) -> impl Iterator<Item = &AdventurerSnapshot> {
        self.adventurers.iter()
    }

    /// Snapshot of a single adventurer.
    #[must_use]
    pub fn adventurer(&self, id: AdventurerId) -> Option<&AdventurerSnapshot> {
        self.adventurers.iter().find(|adventurer| adventurer.id == id)
    }

    /// Reports whether every adventurer completed its path.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Sum of the rewards held by adventurers.
    #[must_use]
    pub fn collected_rewards(&self) -> u64 {
        self.adventurers
            .iter()
            .map(|adventurer| adventurer.reward_tally)
            .sum()
    }
}

/// Result of asking a single adventurer to execute its next instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The adventurer already completed its path; nothing changed.
    Idle {
        /// Adventurer that was stepped.
        adventurer: AdventurerId,
    },
    /// The adventurer advanced into a neighbouring cell.
    Moved {
        /// Adventurer that moved.
        adventurer: AdventurerId,
        /// Cell occupied before the move.
        from: CellCoord,
        /// Cell occupied after the move.
        to: CellCoord,
        /// Rewards picked up on arrival.
        collected: u32,
    },
    /// The adventurer tried to advance but the target could not be entered.
    Bounced {
        /// Adventurer that stayed in place.
        adventurer: AdventurerId,
        /// Cell the adventurer still occupies.
        at: CellCoord,
        /// Cell that was refused, `None` when it lies beyond the grid edge.
        target: Option<CellCoord>,
    },
    /// The adventurer rotated in place.
    Turned {
        /// Adventurer that rotated.
        adventurer: AdventurerId,
        /// Orientation after the rotation.
        orientation: Orientation,
    },
    /// The next symbol was not a known instruction and was skipped.
    Rejected {
        /// Adventurer whose path holds the malformed symbol.
        adventurer: AdventurerId,
        /// Offending symbol.
        symbol: char,
        /// Position of the symbol inside the path.
        index: usize,
    },
}

impl StepOutcome {
    /// Adventurer the outcome belongs to.
    #[must_use]
    pub const fn adventurer(&self) -> AdventurerId {
        match *self {
            Self::Idle { adventurer }
            | Self::Moved { adventurer, .. }
            | Self::Bounced { adventurer, .. }
            | Self::Turned { adventurer, .. }
            | Self::Rejected { adventurer, .. } => adventurer,
        }
    }

    /// Reports whether the step consumed a path symbol.
    #[must_use]
    pub const fn consumed_instruction(&self) -> bool {
        !matches!(self, Self::Idle { .. })
    }
}

/// Reasons a grid construction or mutation is refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// A grid needs at least one column and one row.
    #[error("grid dimensions must be positive, got {width}x{height}")]
    InvalidDimensions {
        /// Requested column count.
        width: u32,
        /// Requested row count.
        height: u32,
    },
    /// The grid would hold more cells than a single run supports.
    #[error("grid dimensions {width}x{height} exceed the limit of {max} cells")]
    TooLarge {
        /// Requested column count.
        width: u32,
        /// Requested row count.
        height: u32,
        /// Largest supported cell count.
        max: u64,
    },
    /// The coordinate lies outside the grid.
    #[error("cell {cell} lies outside the {width}x{height} grid")]
    OutOfBounds {
        /// Offending coordinate.
        cell: CellCoord,
        /// Column count of the grid.
        width: u32,
        /// Row count of the grid.
        height: u32,
    },
    /// Reward counts cannot be negative.
    #[error("reward count {count} for cell {cell} is negative")]
    NegativeReward {
        /// Cell targeted by the assignment.
        cell: CellCoord,
        /// Rejected count.
        count: i64,
    },
    /// Reward counts must fit the cell's counter.
    #[error("reward count {count} for cell {cell} exceeds {max}", max = u32::MAX)]
    RewardOverflow {
        /// Cell targeted by the assignment.
        cell: CellCoord,
        /// Rejected count.
        count: i64,
    },
    /// Blocked cells cannot hold rewards.
    #[error("cell {cell} is blocked and cannot hold a reward")]
    RewardOnBlocked {
        /// Cell targeted by the assignment.
        cell: CellCoord,
    },
    /// An occupied cell cannot become blocked.
    #[error("cell {cell} is occupied and cannot be blocked")]
    BlockOccupied {
        /// Cell targeted by the mutation.
        cell: CellCoord,
    },
    /// A cell holding a reward cannot become blocked.
    #[error("cell {cell} holds a reward and cannot be blocked")]
    BlockRewarded {
        /// Cell targeted by the mutation.
        cell: CellCoord,
    },
    /// The starting cell of an adventurer cannot be entered.
    #[error("{adventurer} cannot start on cell {cell}")]
    StartUnavailable {
        /// Adventurer being placed.
        adventurer: AdventurerId,
        /// Requested starting cell.
        cell: CellCoord,
    },
}

/// Reasons a scenario cannot be turned into a simulation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    /// The grid rejected part of the scenario.
    #[error("invalid grid setup: {0}")]
    Grid(#[from] GridError),
    /// An adventurer could not be placed on its starting cell.
    #[error("adventurer `{name}` cannot start on cell {cell}: blocked, occupied or outside the grid")]
    StartUnavailable {
        /// Name of the adventurer.
        name: String,
        /// Requested starting cell.
        cell: CellCoord,
    },
    /// More adventurers than identifiers available.
    #[error("scenario defines {count} adventurers, more than can be identified")]
    TooManyAdventurers {
        /// Number of adventurers requested.
        count: usize,
    },
}

/// Failures raised while stepping or observing a running simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    /// The identifier does not belong to this simulation.
    #[error("{id} is not part of this simulation")]
    UnknownAdventurer {
        /// Offending identifier.
        id: AdventurerId,
    },
    /// A thread panicked while holding one of the simulation locks.
    #[error("the {resource} lock was poisoned by a panicking thread")]
    Poisoned {
        /// Name of the poisoned resource.
        resource: &'static str,
    },
}
