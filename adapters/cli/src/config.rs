//! Optional TOML configuration and its merge with command-line overrides.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;
use treasure_map_rendering::ReportFormat;
use treasure_map_system_scheduler::{ScheduleMode, SchedulerConfig};

const DEFAULT_CADENCE_MS: u64 = 1_000;
const DEFAULT_RENDER_INTERVAL_MS: u64 = 1_000;
const DEFAULT_OUTPUT: &str = "result.txt";

/// Contents of a configuration file. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileConfig {
    scheduler: SchedulerSection,
    render: RenderSection,
    output: OutputSection,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
struct SchedulerSection {
    mode: ScheduleMode,
    cadence_ms: u64,
    timeout_ms: Option<u64>,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            mode: ScheduleMode::default(),
            cadence_ms: DEFAULT_CADENCE_MS,
            timeout_ms: None,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
struct RenderSection {
    enabled: bool,
    interval_ms: u64,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: DEFAULT_RENDER_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
struct OutputSection {
    path: PathBuf,
    format: ReportFormat,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT),
            format: ReportFormat::default(),
        }
    }
}

impl FileConfig {
    /// Reads the configuration file at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse config toml contents")
    }

    /// Applies command-line overrides on top of the file values.
    pub(crate) fn into_settings(self, overrides: Overrides) -> Settings {
        let cadence_ms = overrides.cadence_ms.unwrap_or(self.scheduler.cadence_ms);
        let mode = overrides.mode.unwrap_or(self.scheduler.mode);
        let timeout_ms = overrides.timeout_ms.or(self.scheduler.timeout_ms);
        let interval_ms = overrides
            .render_interval_ms
            .unwrap_or(self.render.interval_ms);

        Settings {
            scheduler: SchedulerConfig::new(Duration::from_millis(cadence_ms), mode),
            timeout: timeout_ms.map(Duration::from_millis),
            render: self.render.enabled && !overrides.no_render,
            render_interval: Duration::from_millis(interval_ms),
            output: overrides.output.unwrap_or(self.output.path),
            format: overrides.format.unwrap_or(self.output.format),
        }
    }
}

/// Values given on the command line, taking precedence over the file.
#[derive(Debug, Default)]
pub(crate) struct Overrides {
    pub(crate) mode: Option<ScheduleMode>,
    pub(crate) cadence_ms: Option<u64>,
    pub(crate) timeout_ms: Option<u64>,
    pub(crate) no_render: bool,
    pub(crate) render_interval_ms: Option<u64>,
    pub(crate) output: Option<PathBuf>,
    pub(crate) format: Option<ReportFormat>,
}

/// Fully resolved run settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) scheduler: SchedulerConfig,
    pub(crate) timeout: Option<Duration>,
    pub(crate) render: bool,
    pub(crate) render_interval: Duration,
    pub(crate) output: PathBuf,
    pub(crate) format: ReportFormat,
}
