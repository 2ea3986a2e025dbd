// src/models.rs

use serde::{Deserialize, Serialize};
use std::fmt;

// --- BACKEND TYPE TAGS ---
// Each tag is drawn from a closed set. An unknown spelling fails at parse time,
// which surfaces as a configuration-load error naming the offending file.

/// The on-disk particle snapshot format.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotType {
    #[serde(rename = "gotetra")]
    Gotetra,
    #[serde(rename = "LGadget-2")]
    LGadget2,
    #[serde(rename = "ARTIO")]
    Artio,
    #[default]
    #[serde(rename = "nil", alias = "none")]
    Nil,
}

/// The on-disk halo catalog format.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HaloType {
    Text,
    #[default]
    #[serde(rename = "nil", alias = "none")]
    Nil,
}

/// The on-disk merger tree format.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeType {
    #[serde(rename = "consistent-trees")]
    ConsistentTrees,
    #[default]
    #[serde(rename = "nil", alias = "none")]
    Nil,
}

/// What a single verb in `SnapshotFormat` is filled with.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMeaning {
    Snapshot,
    Block,
    Ignore,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionUnits {
    #[default]
    #[serde(rename = "Mpc/h")]
    MpcPerH,
    #[serde(rename = "kpc/h")]
    KpcPerH,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MassUnits {
    #[default]
    #[serde(rename = "Msun/h")]
    MsunPerH,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    SystemOrder,
    LittleEndian,
    BigEndian,
}

impl fmt::Display for SnapshotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gotetra => "gotetra",
            Self::LGadget2 => "LGadget-2",
            Self::Artio => "ARTIO",
            Self::Nil => "nil",
        })
    }
}

impl fmt::Display for HaloType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "Text",
            Self::Nil => "nil",
        })
    }
}

impl fmt::Display for TreeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ConsistentTrees => "consistent-trees",
            Self::Nil => "nil",
        })
    }
}

// --- GLOBAL CONFIGURATION ---

/// The process-wide configuration shared by every mode.
///
/// Read from a TOML file with PascalCase keys. Every key is optional and falls
/// back to the value produced by `Default`. Unknown keys are rejected so that a
/// typo can never silently change what ends up in the memoization directory.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct GlobalConfig {
    pub version: String,

    pub snapshot_type: SnapshotType,
    pub snapshot_format: String,
    pub snapshot_format_meanings: Vec<FormatMeaning>,
    pub block_mins: Vec<i64>,
    pub block_maxes: Vec<i64>,
    pub snap_min: i64,
    pub snap_max: i64,

    pub halo_type: HaloType,
    pub halo_dir: String,
    pub halo_position_units: PositionUnits,
    pub halo_mass_units: MassUnits,
    pub halo_value_columns: Vec<i64>,
    pub halo_value_names: Vec<String>,
    pub h_snap_offset: i64,

    pub tree_type: TreeType,
    pub tree_dir: String,

    pub memo_dir: String,

    pub endianness: Endianness,
    pub validate_formats: bool,
    pub threads: i64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            snapshot_type: SnapshotType::Nil,
            snapshot_format: String::new(),
            snapshot_format_meanings: Vec::new(),
            block_mins: Vec::new(),
            block_maxes: Vec::new(),
            snap_min: 0,
            snap_max: 0,
            halo_type: HaloType::Nil,
            halo_dir: String::new(),
            halo_position_units: PositionUnits::MpcPerH,
            halo_mass_units: MassUnits::MsunPerH,
            halo_value_columns: Vec::new(),
            halo_value_names: Vec::new(),
            h_snap_offset: 0,
            tree_type: TreeType::Nil,
            tree_dir: String::new(),
            memo_dir: String::new(),
            endianness: Endianness::SystemOrder,
            validate_formats: false,
            threads: -1,
        }
    }
}

/// Declares which fields decide whether a memoization directory can be reused.
///
/// `MemoDir`, `Threads`, `ValidateFormats`, `HSnapOffset` and `TreeType` are
/// not listed and may change freely between invocations sharing a directory.
macro_rules! cache_fields {
    ($($field:ident => $key:literal),* $(,)?) => {
        /// Keys of the global configuration that must match the memo snapshot.
        pub const CACHE_FIELDS: &[&str] = &[$($key),*];

        impl GlobalConfig {
            /// Returns the keys in `CACHE_FIELDS` whose values differ between
            /// `self` and `other`. An empty result means the two configs may
            /// share a memoization directory.
            pub fn cache_mismatches(&self, other: &Self) -> Vec<&'static str> {
                let mut mismatches = Vec::new();
                $(
                    if self.$field != other.$field {
                        mismatches.push($key);
                    }
                )*
                mismatches
            }
        }
    };
}

cache_fields! {
    version => "Version",
    snapshot_format => "SnapshotFormat",
    snapshot_type => "SnapshotType",
    halo_dir => "HaloDir",
    halo_type => "HaloType",
    tree_dir => "TreeDir",
    block_mins => "BlockMins",
    block_maxes => "BlockMaxes",
    snap_min => "SnapMin",
    snap_max => "SnapMax",
    snapshot_format_meanings => "SnapshotFormatMeanings",
    halo_position_units => "HaloPositionUnits",
    halo_mass_units => "HaloMassUnits",
    halo_value_columns => "HaloValueColumns",
    halo_value_names => "HaloValueNames",
    endianness => "Endianness",
}
