#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Treasure Map hunt.

mod config;

use std::{
    io,
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use treasure_map_core::{
    AdventurerSpec, CellCoord, InstructionPath, Orientation, Scenario, WELCOME_BANNER,
};
use treasure_map_parsing::scenario_from_files;
use treasure_map_rendering::{write_result, ConsoleBackend, RenderingBackend, ReportFormat};
use treasure_map_system_scheduler::{CancellationToken, RunReport, ScheduleMode, Scheduler};
use treasure_map_system_simulation::Simulation;

use crate::config::{FileConfig, Overrides, Settings};

const MONITOR_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Parser)]
#[command(name = "treasure-map")]
#[command(about = "Runs adventurers across a treasure map, one thread per adventurer")]
struct Cli {
    /// Adventurer file, one `NAME X-Y O PATH` record per line
    #[arg(requires = "map")]
    adventurers: Option<PathBuf>,

    /// Map file starting with `C <width> <height>`
    #[arg(requires = "adventurers")]
    map: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scheduling mode
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Delay between two steps of one adventurer, in milliseconds
    #[arg(long)]
    cadence_ms: Option<u64>,

    /// Cancel the run after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Disable the live console view
    #[arg(long)]
    no_render: bool,

    /// Delay between two frames of the live view, in milliseconds
    #[arg(long)]
    render_interval_ms: Option<u64>,

    /// File the final report is appended to
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Encoding of the final report
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    FreeRunning,
    LockStep,
}

impl From<ModeArg> for ScheduleMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::FreeRunning => Self::FreeRunning,
            ModeArg::LockStep => Self::LockStep,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(file.into_settings(Overrides {
            mode: self.mode.map(ScheduleMode::from),
            cadence_ms: self.cadence_ms,
            timeout_ms: self.timeout_ms,
            no_render: self.no_render,
            render_interval_ms: self.render_interval_ms,
            output: self.output.clone(),
            format: self.format.map(ReportFormat::from),
        }))
    }

    fn scenario(&self) -> Result<Scenario> {
        match (&self.adventurers, &self.map) {
            (Some(adventurers), Some(map)) => {
                info!(
                    adventurers = %adventurers.display(),
                    map = %map.display(),
                    "loading scenario"
                );
                scenario_from_files(map, adventurers).context("failed to load scenario files")
            }
            _ => {
                info!("no scenario files given, running the demo");
                Ok(demo_scenario())
            }
        }
    }
}

/// Lone adventurer crossing a 3x3 map towards a pile of treasures.
fn demo_scenario() -> Scenario {
    Scenario::new(3, 3)
        .with_reward(CellCoord::new(1, 2), 7)
        .with_adventurer(AdventurerSpec::new(
            "John",
            CellCoord::new(0, 0),
            Orientation::East,
            InstructionPath::new("AADADAGA"),
        ))
}

/// Entry point for the Treasure Map command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let settings = cli.settings()?;
    let scenario = cli.scenario()?;
    let simulation = Simulation::from_scenario(&scenario).context("invalid scenario")?;
    println!("{WELCOME_BANNER}");

    let token = CancellationToken::new();
    let scheduler = Scheduler::new(settings.scheduler);
    let started = Instant::now();

    let report = thread::scope(|scope| {
        let driver = thread::Builder::new()
            .name("scheduler".to_owned())
            .spawn_scoped(scope, || scheduler.run(&simulation, &token))
            .context("failed to start the scheduler thread")?;

        if let Err(error) = monitor(&simulation, &token, &settings, started, &driver) {
            token.cancel();
            let _ = driver.join();
            return Err(error);
        }

        driver
            .join()
            .map_err(|_| anyhow!("scheduler thread panicked"))?
            .context("scheduler failed")
    })?;

    finish(&simulation, &settings, &report, started.elapsed())
}

fn monitor<T>(
    simulation: &Simulation,
    token: &CancellationToken,
    settings: &Settings,
    started: Instant,
    driver: &thread::ScopedJoinHandle<'_, T>,
) -> Result<()> {
    let mut backend = ConsoleBackend::new(io::stdout());
    let mut next_frame = started;

    while !driver.is_finished() && !simulation.is_finished()? {
        let now = Instant::now();
        let elapsed = now.duration_since(started);

        if let Some(timeout) = settings.timeout {
            if elapsed >= timeout && !token.is_cancelled() {
                warn!(timeout = ?timeout, "timeout reached, cancelling the run");
                token.cancel();
            }
        }

        if settings.render && now >= next_frame {
            backend.present(&simulation.snapshot()?, elapsed)?;
            next_frame += settings.render_interval;
        }

        thread::sleep(MONITOR_TICK);
    }
    Ok(())
}

fn finish(
    simulation: &Simulation,
    settings: &Settings,
    report: &RunReport,
    elapsed: Duration,
) -> Result<()> {
    let snapshot = simulation.snapshot()?;
    if settings.render {
        ConsoleBackend::new(io::stdout()).present(&snapshot, elapsed)?;
    }

    info!(
        finished = report.finished,
        cancelled = report.cancelled,
        steps = report.steps,
        moves = report.moves,
        bounces = report.bounces,
        rejected = report.rejected,
        collected = report.collected,
        "hunt over"
    );

    let contents = settings.format.render(&snapshot, elapsed)?;
    write_result(&settings.output, &contents)?;
    println!("Result written to file '{}'", settings.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_places_john_and_the_treasure() {
        let scenario = demo_scenario();
        assert_eq!(scenario.width, 3);
        assert_eq!(scenario.height, 3);
        assert_eq!(scenario.adventurers.len(), 1);
        assert_eq!(scenario.adventurers[0].name, "John");
        assert_eq!(scenario.rewards[0].cell, CellCoord::new(1, 2));
        assert_eq!(scenario.rewards[0].count, 7);
    }

    #[test]
    fn positional_files_come_in_pairs() {
        assert!(Cli::try_parse_from(["treasure-map", "adventurers.txt"]).is_err());
        let cli = Cli::try_parse_from(["treasure-map", "adventurers.txt", "map.txt"])
            .expect("both files given");
        assert_eq!(cli.map, Some(PathBuf::from("map.txt")));
    }

    #[test]
    fn flags_map_onto_settings() {
        let cli = Cli::try_parse_from([
            "treasure-map",
            "--mode",
            "lock-step",
            "--cadence-ms",
            "0",
            "--format",
            "json",
            "--no-render",
        ])
        .expect("valid flags");
        let settings = cli.settings().expect("no config file");
        assert_eq!(settings.scheduler.mode(), ScheduleMode::LockStep);
        assert_eq!(settings.scheduler.cadence(), Duration::ZERO);
        assert_eq!(settings.format, ReportFormat::Json);
        assert!(!settings.render);
    }
}
