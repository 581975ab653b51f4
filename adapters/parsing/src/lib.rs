#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Text adapters that turn map and adventurer files into a [`Scenario`].
//!
//! Both formats are line based. Fields are separated by whitespace, blank lines
//! and lines starting with `#` are ignored, and coordinates are written as
//! 1-based `column-row` pairs (`1-1` is the north-west corner). The parsed
//! values are converted to the 0-based [`CellCoord`] used everywhere else.
//!
//! Map files start with `C <width> <height>` followed by `M X-Y` (mountain)
//! and `T X-Y N` (N treasures) records. Adventurer files hold one
//! `NAME X-Y O PATH` record per line, where `O` is one of `N`, `E`, `S`, `O`
//! or `W` and a path of `-` stands for an empty path.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;
use treasure_map_core::{AdventurerSpec, CellCoord, InstructionPath, Orientation, Scenario};

/// Path token that stands for an adventurer without instructions.
pub const EMPTY_PATH: &str = "-";

/// Errors raised while reading scenario files.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The file could not be read.
    #[error("failed to read {}", path.display())]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The map contains no `C <width> <height>` record.
    #[error("map has no `C <width> <height>` record")]
    MissingDimensions,
    /// The first map record is not the dimensions record.
    #[error("line {line}: expected `C <width> <height>`, found `{token}`")]
    ExpectedDimensions {
        /// 1-based line number.
        line: usize,
        /// Offending record tag.
        token: String,
    },
    /// A second dimensions record was found.
    #[error("line {line}: map dimensions were already declared")]
    DuplicateDimensions {
        /// 1-based line number.
        line: usize,
    },
    /// The record tag is not one of `C`, `M` or `T`.
    #[error("line {line}: unknown record `{token}`")]
    UnknownRecord {
        /// 1-based line number.
        line: usize,
        /// Offending record tag.
        token: String,
    },
    /// A required field is absent.
    #[error("line {line}: missing {field}")]
    MissingField {
        /// 1-based line number.
        line: usize,
        /// Name of the absent field.
        field: &'static str,
    },
    /// The record carries more fields than its format allows.
    #[error("line {line}: unexpected field `{token}`")]
    UnexpectedField {
        /// 1-based line number.
        line: usize,
        /// First surplus field.
        token: String,
    },
    /// A numeric field could not be parsed.
    #[error("line {line}: `{token}` is not a valid number")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// Offending field.
        token: String,
    },
    /// A coordinate is not a pair of positive `column-row` integers.
    #[error("line {line}: `{token}` is not a 1-based `column-row` coordinate")]
    InvalidCoordinate {
        /// 1-based line number.
        line: usize,
        /// Offending field.
        token: String,
    },
    /// An orientation code is not one of `N`, `E`, `S`, `O` or `W`.
    #[error("line {line}: `{token}` is not an orientation (N, E, S, O or W)")]
    InvalidOrientation {
        /// 1-based line number.
        line: usize,
        /// Offending field.
        token: String,
    },
}

/// Parses the contents of a map file into a scenario without adventurers.
///
/// Only the syntax is checked here. Dimensions of zero, negative rewards and
/// coordinates outside the grid are reported when the scenario is turned into
/// a simulation.
pub fn parse_map_str(contents: &str) -> Result<Scenario, ParseError> {
    let mut scenario: Option<Scenario> = None;

    for (line, fields) in records(contents) {
        let mut fields = Fields::new(line, fields);
        let tag = fields.next("record tag")?;

        let Some(current) = scenario.take() else {
            if tag != "C" {
                return Err(ParseError::ExpectedDimensions {
                    line,
                    token: tag.to_owned(),
                });
            }
            let width = parse_number(line, fields.next("map width")?)?;
            let height = parse_number(line, fields.next("map height")?)?;
            fields.finish()?;
            scenario = Some(Scenario::new(width, height));
            continue;
        };

        let updated = match tag {
            "C" => return Err(ParseError::DuplicateDimensions { line }),
            "M" => {
                let cell = parse_coordinate(line, fields.next("mountain coordinate")?)?;
                current.with_blocked(cell)
            }
            "T" => {
                let cell = parse_coordinate(line, fields.next("treasure coordinate")?)?;
                let count = parse_number(line, fields.next("treasure count")?)?;
                current.with_reward(cell, count)
            }
            other => {
                return Err(ParseError::UnknownRecord {
                    line,
                    token: other.to_owned(),
                })
            }
        };
        fields.finish()?;
        scenario = Some(updated);
    }

    let scenario = scenario.ok_or(ParseError::MissingDimensions)?;
    debug!(
        width = scenario.width,
        height = scenario.height,
        mountains = scenario.blocked.len(),
        treasures = scenario.rewards.len(),
        "parsed map"
    );
    Ok(scenario)
}

/// Parses the contents of an adventurer file, preserving declaration order.
///
/// Paths are kept verbatim, including symbols that are not instructions.
pub fn parse_adventurers_str(contents: &str) -> Result<Vec<AdventurerSpec>, ParseError> {
    let mut adventurers = Vec::new();

    for (line, fields) in records(contents) {
        let mut fields = Fields::new(line, fields);
        let name = fields.next("adventurer name")?;
        let start = parse_coordinate(line, fields.next("starting coordinate")?)?;
        let orientation = parse_orientation(line, fields.next("orientation")?)?;
        let path = match fields.next("instruction path")? {
            EMPTY_PATH => InstructionPath::default(),
            symbols => InstructionPath::new(symbols),
        };
        fields.finish()?;

        adventurers.push(AdventurerSpec::new(name, start, orientation, path));
    }

    debug!(adventurers = adventurers.len(), "parsed adventurers");
    Ok(adventurers)
}

/// Reads and parses a map file.
pub fn parse_map_file(path: impl AsRef<Path>) -> Result<Scenario, ParseError> {
    parse_map_str(&read(path.as_ref())?)
}

/// Reads and parses an adventurer file.
pub fn parse_adventurers_file(path: impl AsRef<Path>) -> Result<Vec<AdventurerSpec>, ParseError> {
    parse_adventurers_str(&read(path.as_ref())?)
}

/// Reads both files and combines them into one scenario.
pub fn scenario_from_files(
    map: impl AsRef<Path>,
    adventurers: impl AsRef<Path>,
) -> Result<Scenario, ParseError> {
    let scenario = parse_map_file(map)?;
    Ok(parse_adventurers_file(adventurers)?
        .into_iter()
        .fold(scenario, Scenario::with_adventurer))
}

fn read(path: &Path) -> Result<String, ParseError> {
    fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn records(contents: &str) -> impl Iterator<Item = (usize, std::str::SplitWhitespace<'_>)> {
    contents
        .lines()
        .enumerate()
        .map(|(index, text)| (index + 1, text.trim()))
        .filter(|(_, text)| !text.is_empty() && !text.starts_with('#'))
        .map(|(line, text)| (line, text.split_whitespace()))
}

struct Fields<'a> {
    line: usize,
    inner: std::str::SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn new(line: usize, inner: std::str::SplitWhitespace<'a>) -> Self {
        Self { line, inner }
    }

    fn next(&mut self, field: &'static str) -> Result<&'a str, ParseError> {
        self.inner.next().ok_or(ParseError::MissingField {
            line: self.line,
            field,
        })
    }

    fn finish(mut self) -> Result<(), ParseError> {
        match self.inner.next() {
            Some(token) => Err(ParseError::UnexpectedField {
                line: self.line,
                token: token.to_owned(),
            }),
            None => Ok(()),
        }
    }
}

fn parse_number<T: std::str::FromStr>(line: usize, token: &str) -> Result<T, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidNumber {
        line,
        token: token.to_owned(),
    })
}

fn parse_coordinate(line: usize, token: &str) -> Result<CellCoord, ParseError> {
    let invalid = || ParseError::InvalidCoordinate {
        line,
        token: token.to_owned(),
    };
    let (column, row) = token.split_once('-').ok_or_else(invalid)?;
    let column: u32 = column.parse().map_err(|_| invalid())?;
    let row: u32 = row.parse().map_err(|_| invalid())?;
    match (column.checked_sub(1), row.checked_sub(1)) {
        (Some(column), Some(row)) => Ok(CellCoord::new(column, row)),
        _ => Err(invalid()),
    }
}

fn parse_orientation(line: usize, token: &str) -> Result<Orientation, ParseError> {
    let mut chars = token.chars();
    let orientation = match (chars.next(), chars.next()) {
        (Some(code), None) => Orientation::from_code(code),
        _ => None,
    };
    orientation.ok_or_else(|| ParseError::InvalidOrientation {
        line,
        token: token.to_owned(),
    })
}
