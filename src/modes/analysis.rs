//! The `prof`, `shell` and `stats` stages.
//!
//! These stages consume the `ID Snap X Y Z R200m` catalogs produced by
//! `coord`. Their configuration and input are fully checked here; the
//! numerical kernels behind them live outside this crate, so `run` reports
//! [`ModeError::KernelUnavailable`] once the input has been accepted.

use crate::backend::Environment;
use crate::models::GlobalConfig;
use crate::modes::{Mode, ModeConfig, ModeError, ModeResult, parse_catalog, trimmed_string};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

/// Columns every analysis input row must carry: `ID Snap X Y Z R200m`.
const COORD_COLUMNS: usize = 6;

/// Checks an analysis input catalog and counts its rows.
fn validate_input(lines: &[String]) -> ModeResult<usize> {
    let rows = parse_catalog(lines, COORD_COLUMNS)?;
    for row in &rows {
        if let Some(r200m) = row.values.get(3)
            && *r200m <= 0.0
        {
            return Err(ModeError::Input {
                line: row.line,
                reason: format!("halo {} has a non-positive R200m ({r200m})", row.id),
            });
        }
    }
    Ok(rows.len())
}

fn check_radii(min_mult: f64, max_mult: f64) -> Result<(), String> {
    if !(min_mult > 0.0 && min_mult < max_mult) {
        return Err(format!(
            "RMinMult ({min_mult}) and RMaxMult ({max_mult}) must satisfy 0 < RMinMult < RMaxMult."
        ));
    }
    Ok(())
}

// --- prof ---

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProfileType {
    #[default]
    #[serde(rename = "density")]
    #[value(name = "density")]
    Density,
    #[serde(rename = "mass")]
    #[value(name = "mass")]
    Mass,
}

/// Spherically averaged profiles around each halo.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct ProfMode {
    pub profile_type: ProfileType,
    pub bins: i64,
    pub r_min_mult: f64,
    pub r_max_mult: f64,
}

impl Default for ProfMode {
    fn default() -> Self {
        Self {
            profile_type: ProfileType::Density,
            bins: 150,
            r_min_mult: 0.03,
            r_max_mult: 3.0,
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct ProfFlags {
    #[arg(long = "ProfileType", value_enum)]
    profile_type: Option<ProfileType>,
    #[arg(long = "Bins")]
    bins: Option<i64>,
    #[arg(long = "RMinMult")]
    r_min_mult: Option<f64>,
    #[arg(long = "RMaxMult")]
    r_max_mult: Option<f64>,
}

impl ModeConfig for ProfMode {
    const NAME: &'static str = "prof";
    type Flags = ProfFlags;

    fn apply_flags(&mut self, flags: ProfFlags) {
        if let Some(profile_type) = flags.profile_type {
            self.profile_type = profile_type;
        }
        if let Some(bins) = flags.bins {
            self.bins = bins;
        }
        if let Some(r_min_mult) = flags.r_min_mult {
            self.r_min_mult = r_min_mult;
        }
        if let Some(r_max_mult) = flags.r_max_mult {
            self.r_max_mult = r_max_mult;
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.bins <= 0 {
            return Err(format!("Bins must be positive, got {}.", self.bins));
        }
        check_radii(self.r_min_mult, self.r_max_mult)
    }
}

impl Mode for ProfMode {
    fn run(&self, _: &GlobalConfig, _: &Environment, lines: &[String]) -> ModeResult<Vec<String>> {
        let rows = validate_input(lines)?;
        Err(ModeError::KernelUnavailable {
            mode: Self::NAME,
            rows,
        })
    }
}

// --- shell ---

/// Splashback shell fitting along lines of sight.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct ShellMode {
    /// Lines of sight per ring.
    pub los: i64,
    pub rings: i64,
    /// Order of the Penna-Dines shell expansion.
    pub order: i64,
    pub bins: i64,
    pub r_min_mult: f64,
    pub r_max_mult: f64,
}

impl Default for ShellMode {
    fn default() -> Self {
        Self {
            los: 100,
            rings: 10,
            order: 3,
            bins: 256,
            r_min_mult: 0.5,
            r_max_mult: 3.0,
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct ShellFlags {
    #[arg(long = "Los")]
    los: Option<i64>,
    #[arg(long = "Rings")]
    rings: Option<i64>,
    #[arg(long = "Order")]
    order: Option<i64>,
    #[arg(long = "Bins")]
    bins: Option<i64>,
    #[arg(long = "RMinMult")]
    r_min_mult: Option<f64>,
    #[arg(long = "RMaxMult")]
    r_max_mult: Option<f64>,
}

impl ModeConfig for ShellMode {
    const NAME: &'static str = "shell";
    type Flags = ShellFlags;

    fn apply_flags(&mut self, flags: ShellFlags) {
        if let Some(los) = flags.los {
            self.los = los;
        }
        if let Some(rings) = flags.rings {
            self.rings = rings;
        }
        if let Some(order) = flags.order {
            self.order = order;
        }
        if let Some(bins) = flags.bins {
            self.bins = bins;
        }
        if let Some(r_min_mult) = flags.r_min_mult {
            self.r_min_mult = r_min_mult;
        }
        if let Some(r_max_mult) = flags.r_max_mult {
            self.r_max_mult = r_max_mult;
        }
    }

    fn validate(&self) -> Result<(), String> {
        for (key, value) in [("Los", self.los), ("Rings", self.rings), ("Bins", self.bins)] {
            if value <= 0 {
                return Err(format!("{key} must be positive, got {value}."));
            }
        }
        if self.order < 0 {
            return Err(format!("Order must be non-negative, got {}.", self.order));
        }
        check_radii(self.r_min_mult, self.r_max_mult)
    }
}

impl Mode for ShellMode {
    fn run(&self, _: &GlobalConfig, _: &Environment, lines: &[String]) -> ModeResult<Vec<String>> {
        let rows = validate_input(lines)?;
        Err(ModeError::KernelUnavailable {
            mode: Self::NAME,
            rows,
        })
    }
}

// --- stats ---

/// Quantities `stats` knows how to report.
pub const STATS_VALUES: &[&str] = &["RSp", "MSp", "VSp", "RSpMin", "RSpMax", "Axes"];

/// Summary statistics of fitted shells.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct StatsMode {
    pub values: Vec<String>,
    pub samples: i64,
}

impl Default for StatsMode {
    fn default() -> Self {
        Self {
            values: vec!["RSp".to_string(), "MSp".to_string()],
            samples: 10_000,
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct StatsFlags {
    #[arg(long = "Values", value_delimiter = ',', value_parser = trimmed_string)]
    values: Option<Vec<String>>,
    #[arg(long = "Samples")]
    samples: Option<i64>,
}

impl ModeConfig for StatsMode {
    const NAME: &'static str = "stats";
    type Flags = StatsFlags;

    fn apply_flags(&mut self, flags: StatsFlags) {
        if let Some(values) = flags.values {
            self.values = values;
        }
        if let Some(samples) = flags.samples {
            self.samples = samples;
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.values.is_empty() {
            return Err("Values must name at least one quantity.".to_string());
        }
        if let Some(unknown) = self
            .values
            .iter()
            .find(|value| !STATS_VALUES.contains(&value.as_str()))
        {
            return Err(format!(
                "Unknown value '{unknown}'. Valid values are: {}.",
                STATS_VALUES.join(", ")
            ));
        }
        if self.samples <= 0 {
            return Err(format!("Samples must be positive, got {}.", self.samples));
        }
        Ok(())
    }
}

impl Mode for StatsMode {
    fn run(&self, _: &GlobalConfig, _: &Environment, lines: &[String]) -> ModeResult<Vec<String>> {
        let rows = validate_input(lines)?;
        Err(ModeError::KernelUnavailable {
            mode: Self::NAME,
            rows,
        })
    }
}
