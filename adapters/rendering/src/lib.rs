#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Treasure Map adapters.

use std::{
    fmt::Write as _,
    fs::OpenOptions,
    io::Write,
    path::Path,
    time::Duration,
};

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};
use treasure_map_core::{AdventurerSnapshot, CellSnapshot, SimulationSnapshot, Terrain};

/// ANSI sequence that clears the terminal and moves the cursor home.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Marker printed above the most recently executed path symbol.
pub const CURSOR_MARKER: char = '↓';

/// Returns the sequence that clears the terminal before a new frame.
#[must_use]
pub const fn clear_screen() -> &'static str {
    CLEAR_SCREEN
}

/// Encoding used for the final result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportFormat {
    /// Human readable report, as shown on the console.
    #[default]
    Text,
    /// Pretty printed JSON snapshot.
    Json,
}

impl ReportFormat {
    /// Renders the snapshot in this format.
    pub fn render(self, snapshot: &SimulationSnapshot, elapsed: Duration) -> AnyResult<String> {
        match self {
            Self::Text => Ok(render_report(snapshot, elapsed)),
            Self::Json => render_json(snapshot),
        }
    }
}

/// Renders the human readable report of a run.
///
/// The report lists the elapsed seconds and the run status, draws the grid
/// with 1-based column and row labels, then lists adventurers, mountains and
/// treasures. Coordinates are printed 1-based.
#[must_use]
pub fn render_report(snapshot: &SimulationSnapshot, elapsed: Duration) -> String {
    let mut report = String::new();
    let status = if snapshot.is_finished() {
        "finished"
    } else {
        "ongoing"
    };

    let _ = writeln!(report, "Duration: {}s", elapsed.as_secs());
    let _ = writeln!(report, "Game: {status}");
    report.push('\n');
    report.push_str(&render_grid(snapshot));
    report.push_str("\n\n");
    report.push_str(&render_adventurers(snapshot));
    report.push('\n');
    report.push_str(&render_mountains(snapshot));
    report.push('\n');
    report.push_str(&render_treasures(snapshot));
    report.push('\n');
    report
}

/// Renders the snapshot as pretty printed JSON.
pub fn render_json(snapshot: &SimulationSnapshot) -> AnyResult<String> {
    serde_json::to_string_pretty(snapshot).context("failed to serialise simulation snapshot")
}

/// Appends the rendered result to the file at `path`, creating it if needed.
pub fn write_result(path: &Path, contents: &str) -> AnyResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open result file {}", path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write result file {}", path.display()))
}

/// Draws the grid, one text row per grid row.
#[must_use]
pub fn render_grid(snapshot: &SimulationSnapshot) -> String {
    let grid = snapshot.grid();
    let mut text = String::from("   ");
    for column in 0..grid.width() {
        let _ = write!(text, "{} ", column + 1);
    }
    text.push('\n');

    for row in 0..grid.height() {
        let _ = write!(text, "{} ", row + 1);
        for cell in grid.row(row) {
            text.push('|');
            text.push_str(&glyph(snapshot, cell));
        }
        text.push_str("|\n");
    }
    text
}

fn glyph(snapshot: &SimulationSnapshot, cell: &CellSnapshot) -> String {
    if cell.reward > 0 {
        return cell.reward.to_string();
    }
    if let Some(initial) = cell
        .occupant
        .and_then(|id| snapshot.adventurer(id))
        .and_then(|adventurer| adventurer.name.chars().next())
    {
        return initial.to_string();
    }
    match cell.terrain {
        Terrain::Blocked => "x".to_owned(),
        Terrain::Open => " ".to_owned(),
    }
}

fn render_adventurers(snapshot: &SimulationSnapshot) -> String {
    let mut text = String::from("[ Adventurers ]\n");
    let mut any = false;
    for adventurer in snapshot.adventurers() {
        any = true;
        text.push_str(&describe_adventurer(adventurer));
        text.push('\n');
    }
    if !any {
        text.push_str("No adventurers");
    }
    text
}

/// Describes one adventurer on two lines: the cursor marker, then its state.
#[must_use]
pub fn describe_adventurer(adventurer: &AdventurerSnapshot) -> String {
    let prefix = format!(
        "{}: ({},{}), treasures={}, path=",
        adventurer.name,
        adventurer.position.column() + 1,
        adventurer.position.row() + 1,
        adventurer.reward_tally
    );
    let offset = (prefix.chars().count() + adventurer.cursor).saturating_sub(1);

    format!(
        "{}{CURSOR_MARKER}\n{prefix}{}, orientation={}",
        " ".repeat(offset),
        adventurer.path,
        adventurer.orientation.name()
    )
}

fn render_mountains(snapshot: &SimulationSnapshot) -> String {
    let mut text = String::from("[ Mountains ]\n");
    let mut any = false;
    for cell in snapshot
        .grid()
        .cells()
        .filter(|cell| cell.terrain == Terrain::Blocked)
    {
        any = true;
        let _ = writeln!(
            text,
            "({},{})",
            cell.coord.column() + 1,
            cell.coord.row() + 1
        );
    }
    if !any {
        text.push_str("No mountains\n");
    }
    text
}

fn render_treasures(snapshot: &SimulationSnapshot) -> String {
    let mut text = String::from("[ Treasures ]\n");
    let mut any = false;
    for cell in snapshot.grid().cells().filter(|cell| cell.reward > 0) {
        any = true;
        let _ = writeln!(
            text,
            "({},{}), quantity={}",
            cell.coord.column() + 1,
            cell.coord.row() + 1,
            cell.reward
        );
    }
    if !any {
        text.push_str("No treasures\n");
    }
    text
}

/// Destination for the frames of a live run.
pub trait RenderingBackend {
    /// Presents the state of the run at the provided elapsed time.
    fn present(&mut self, snapshot: &SimulationSnapshot, elapsed: Duration) -> AnyResult<()>;
}

/// Backend that prints text reports to a writer, typically standard output.
#[derive(Debug)]
pub struct ConsoleBackend<W> {
    sink: W,
    clear: bool,
}

impl<W: Write> ConsoleBackend<W> {
    /// Creates a backend that clears the screen before every frame.
    pub const fn new(sink: W) -> Self {
        Self { sink, clear: true }
    }

    /// Returns a backend that appends frames without clearing the screen.
    #[must_use]
    pub fn without_clearing(self) -> Self {
        Self {
            clear: false,
            ..self
        }
    }

    /// Consumes the backend and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> RenderingBackend for ConsoleBackend<W> {
    fn present(&mut self, snapshot: &SimulationSnapshot, elapsed: Duration) -> AnyResult<()> {
        if self.clear {
            self.sink
                .write_all(clear_screen().as_bytes())
                .context("failed to clear the console")?;
        }
        self.sink
            .write_all(render_report(snapshot, elapsed).as_bytes())
            .context("failed to print the report")?;
        self.sink.flush().context("failed to flush the console")
    }
}
