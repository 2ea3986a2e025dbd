//! # Modes
//!
//! Each stage of the pipeline is a mode: a record that is populated from its
//! defaults, then an optional TOML file, then command-line flags, and is then
//! run against the global configuration and the activated backends.
//!
//! ## Modules
//!
//! - **`id`**: selects halos by ID or mass rank. Reads nothing from stdin.
//! - **`tree`**: follows main-progenitor branches through the merger trees.
//! - **`coord`**: looks up positions and radii for `ID Snap` rows.
//! - **`analysis`**: the `prof`, `shell` and `stats` stages.

pub mod analysis;
pub mod coord;
pub mod id;
pub mod tree;

use crate::backend::{BackendError, Environment};
use crate::core::config_loader::{self, ConfigError};
use crate::models::GlobalConfig;
use clap::Parser;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid flags for mode '{mode}': {source}")]
    Flags {
        mode: &'static str,
        #[source]
        source: clap::Error,
    },
    #[error("Invalid configuration for mode '{mode}': {reason}")]
    Invalid { mode: &'static str, reason: String },
    #[error("Line {line} of the input catalog: {reason}")]
    Input { line: usize, reason: String },
    #[error("Halo {id} is not in the halo catalog of snapshot {snap}.")]
    UnknownHalo { id: i64, snap: i64 },
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Could not access memo file '{path}': {source}")]
    Memo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Memo file '{path}' is corrupt at line {line}. Delete it to have it rebuilt.")]
    CorruptMemo { path: String, line: usize },
    #[error("Memo file '{path}' loops back to halo {id}. Delete it to have it rebuilt.")]
    ProgenitorCycle { path: String, id: i64 },
    #[error(
        "Mode '{mode}' accepted {rows} input row(s), but its numerical kernel is not available in this build."
    )]
    KernelUnavailable { mode: &'static str, rows: usize },
}

pub type ModeResult<T> = Result<T, ModeError>;

/// A fully configured stage, ready to run.
pub trait Mode: fmt::Debug {
    /// Consumes the input catalog and returns the output catalog, line by line.
    fn run(
        &self,
        global: &GlobalConfig,
        env: &Environment,
        lines: &[String],
    ) -> ModeResult<Vec<String>>;
}

/// The configuration record of one mode.
///
/// `Default` supplies the built-in values, serde reads the TOML file on top of
/// them and `Flags` carries the command-line overrides.
pub trait ModeConfig: Mode + Default + DeserializeOwned + Serialize + 'static {
    const NAME: &'static str;

    /// Command-line flags; every field is optional.
    type Flags: Parser;

    /// Overwrites every field for which a flag was given.
    fn apply_flags(&mut self, flags: Self::Flags);

    fn validate(&self) -> Result<(), String>;
}

/// Builds a mode record in three passes: defaults, then `file`, then `flags`.
/// A value given as a flag always wins over the same value in the file.
pub fn configure<C: ModeConfig>(file: Option<&Path>, flags: &[String]) -> ModeResult<Box<dyn Mode>> {
    let mut config = match file {
        Some(path) => {
            log::debug!("Reading {} config from '{}'", C::NAME, path.display());
            config_loader::read_toml::<C>(path)?
        }
        None => {
            log::debug!("No {} config file given; using defaults", C::NAME);
            C::default()
        }
    };

    let parsed = C::Flags::try_parse_from(flags).map_err(|source| ModeError::Flags {
        mode: C::NAME,
        source,
    })?;
    config.apply_flags(parsed);

    config.validate().map_err(|reason| ModeError::Invalid {
        mode: C::NAME,
        reason,
    })?;
    log::debug!("Resolved {} config: {:?}", C::NAME, config);
    Ok(Box::new(config))
}

/// The default configuration of a mode, rendered as a TOML file.
pub fn example_config<C: ModeConfig>() -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&C::default())
}

/// One data row of an input catalog.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Row {
    /// 1-based line number in the input.
    pub line: usize,
    pub id: i64,
    pub snap: i64,
    /// Every column after `Snap`.
    pub values: Vec<f64>,
}

/// Parses a catalog whose rows start with `ID Snap` and hold at least
/// `columns` columns. Blank lines and `#` comments are skipped.
pub(crate) fn parse_catalog(lines: &[String], columns: usize) -> ModeResult<Vec<Row>> {
    let mut rows = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let bad_line = |reason: String| ModeError::Input {
            line: index + 1,
            reason,
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < columns {
            return Err(bad_line(format!(
                "expected {columns} columns, found {}",
                fields.len()
            )));
        }
        let (id, snap, rest) = match fields.as_slice() {
            [id, snap, rest @ ..] => (*id, *snap, rest),
            _ => return Err(bad_line("expected ID and Snap columns".to_string())),
        };
        let id = id
            .parse::<i64>()
            .map_err(|e| bad_line(format!("ID '{id}' is not an integer: {e}")))?;
        let snap = snap
            .parse::<i64>()
            .map_err(|e| bad_line(format!("Snap '{snap}' is not an integer: {e}")))?;
        let values = rest
            .iter()
            .map(|raw| {
                raw.parse::<f64>()
                    .map_err(|e| bad_line(format!("'{raw}' is not a number: {e}")))
            })
            .collect::<ModeResult<Vec<f64>>>()?;

        rows.push(Row {
            line: index + 1,
            id,
            snap,
            values,
        });
    }
    Ok(rows)
}

/// Integer list items from flags such as `--IDs "0, 1, 2"`.
pub(crate) fn trimmed_int(raw: &str) -> Result<i64, std::num::ParseIntError> {
    raw.trim().parse()
}

/// String list items from flags such as `--Values "X, Y"`.
pub(crate) fn trimmed_string(raw: &str) -> Result<String, std::convert::Infallible> {
    Ok(raw.trim().to_string())
}
